use crate::Vec3;

/// Offset applied to ray parameters to avoid re-hitting the surface a ray
/// starts from.
pub const RAY_EPSILON: f32 = 1e-4;

/// A ray in 3D space with origin and direction.
///
/// The valid parameter range is passed alongside the ray to intersection
/// queries, so the same ray can be used for closest-hit and shadow tests.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    /// Create a new ray.
    #[inline]
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    #[inline]
    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    #[inline]
    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    /// Get the point along the ray at parameter t.
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Upper parameter bound for a shadow ray towards a point `dist` away
    /// along a unit direction, stopping just short of the target surface.
    #[inline]
    pub fn shadow_limit(dist: f32) -> f32 {
        dist * (1.0 - RAY_EPSILON) - RAY_EPSILON
    }
}

impl Default for Ray {
    fn default() -> Self {
        Self {
            origin: Vec3::ZERO,
            direction: Vec3::Z,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ray_at() {
        let ray = Ray::new(Vec3::ZERO, Vec3::X);

        assert_eq!(ray.at(0.0), Vec3::ZERO);
        assert_eq!(ray.at(1.0), Vec3::X);
        assert_eq!(ray.at(2.0), Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(ray.at(-1.0), Vec3::new(-1.0, 0.0, 0.0));
    }

    #[test]
    fn test_shadow_limit_stops_short() {
        let limit = Ray::shadow_limit(10.0);
        assert!(limit < 10.0);
        assert!(limit > 9.99);
    }
}
