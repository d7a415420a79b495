//! RBPT Renderer - progressive resampled bidirectional path tracing
//!
//! Every iteration traces one eye sub-path and one light sub-path per
//! pixel. Eye vertices on a coarse auxiliary grid become cache points;
//! each cache resamples light vertices from a shared candidate pool in
//! proportion to their contribution, and camera vertices connect through
//! their nearest caches. Path tracing, light tracing and the resampled
//! connections are combined with the balance heuristic.
//!
//! ```ignore
//! use rbpt_renderer::{Camera, ImageBuffer, Renderer, Scene};
//!
//! let desc = rbpt_core::load_scene("cornell_box.json")?;
//! let scene = Scene::from_description(&desc)?;
//! let camera = Camera::from_description(&desc.camera);
//! let mut renderer = Renderer::new(&camera, &desc.settings)?;
//! let image = renderer.render(&scene, &camera)?;
//! ```

mod bvh;
mod cache;
mod camera;
mod contribution;
mod error;
mod hittable;
mod image;
mod kd_tree;
mod material;
mod parallel;
mod path;
mod renderer;
mod sampling;
mod scene;
mod sphere;
mod triangle;

#[cfg(test)]
mod test_scenes;

pub use bvh::BvhNode;
pub use cache::{collect_candidates, CacheIndex, CachePoint, Candidate, ResamplingDistribution};
pub use camera::Camera;
pub use contribution::{Estimator, PixelSample, ResamplingOrigin, Splat};
pub use error::{RenderError, RenderResult};
pub use hittable::{HitRecord, Hittable, Shape, SurfaceSample};
pub use image::{color_to_rgba, linear_to_gamma, ImageBuffer};
pub use kd_tree::KdTree;
pub use material::{luminance, Color, DiffuseLight, Intersection, Lambertian, Material, MaterialId};
pub use parallel::Executor;
pub use path::{Brdf, CameraPath, Connection, LightPath, MisParams, PathVertex};
pub use renderer::{aux_resolution, compose_image, IterationStats, Renderer};
pub use sampling::{stream_seed, Phase};
pub use scene::{LightSample, Scene, SceneBuilder};
pub use sphere::Sphere;
pub use triangle::{quad, Triangle};

/// Re-export Vec3 and common math types from rbpt_math
pub use rbpt_math::{Aabb, Direction, Ray, Vec2, Vec3};
