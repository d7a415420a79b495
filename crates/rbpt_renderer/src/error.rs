//! Renderer errors.

use thiserror::Error;

/// Errors raised while building a scene or running an iteration.
///
/// Rejected samples (occluded connections, off-screen projections, empty
/// caches) are not errors; they contribute zero.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("light sub-path count {m} must be between 1 and the pixel count {pixels}")]
    InvalidLightSubpaths { m: usize, pixels: usize },

    #[error("thread count must be at least 1")]
    InvalidThreadCount,

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("camera resolution {actual:?} does not match renderer resolution {expected:?}")]
    ResolutionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("Unknown material: {0}")]
    UnknownMaterial(String),
}

/// Result type for renderer operations.
pub type RenderResult<T> = Result<T, RenderError>;
