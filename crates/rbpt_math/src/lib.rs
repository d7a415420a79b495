// Re-export glam for convenience
pub use glam::*;

mod aabb;
mod direction;
mod frame;
mod ray;

pub use aabb::Aabb;
pub use direction::Direction;
pub use frame::Frame;
pub use ray::{Ray, RAY_EPSILON};

/// Squared distance and unit direction from `from` to `to`.
///
/// Returns `(dir, dist, dist2)`. A zero-length segment yields a NaN
/// direction, which `Direction::is_invalid` rejects downstream.
#[inline]
pub fn segment(from: Vec3, to: Vec3) -> (Vec3, f32, f32) {
    let d = to - from;
    let dist2 = d.length_squared();
    let dist = dist2.sqrt();
    (d / dist, dist, dist2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment() {
        let (dir, dist, dist2) = segment(Vec3::ZERO, Vec3::new(0.0, 3.0, 4.0));
        assert!((dist - 5.0).abs() < 1e-6);
        assert!((dist2 - 25.0).abs() < 1e-5);
        assert!((dir - Vec3::new(0.0, 0.6, 0.8)).length() < 1e-6);
    }

    #[test]
    fn test_degenerate_segment_is_invalid() {
        let (dir, _, _) = segment(Vec3::ONE, Vec3::ONE);
        assert!(Direction::new(dir, Vec3::Y).is_invalid());
    }
}
