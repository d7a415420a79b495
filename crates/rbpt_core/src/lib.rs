//! RBPT Core - scene description and render settings.
//!
//! This crate provides:
//!
//! - **Scene description types**: `SceneDescription`, `CameraDescription`,
//!   `MaterialDescription`, `ShapeDescription`
//! - **Render settings**: `RenderSettings`, the knobs of the progressive
//!   estimator (`M`, `Nc`, thread count, MIS threshold, seed)
//! - **Loading**: JSON scene files with validation
//!
//! # Example
//!
//! ```ignore
//! use rbpt_core::load_scene;
//!
//! let scene = load_scene("cornell_box.json")?;
//! println!("Loaded {} shapes, {} materials",
//!     scene.shapes.len(),
//!     scene.materials.len());
//! ```

pub mod loader;
pub mod scene;
pub mod settings;

// Re-export commonly used types
pub use loader::{load_scene, load_scene_from_str, LoadError, LoadResult};
pub use scene::{CameraDescription, MaterialDescription, SceneDescription, ShapeDescription};
pub use settings::RenderSettings;
