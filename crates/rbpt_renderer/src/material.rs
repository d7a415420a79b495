//! Materials: emission and BRDF evaluation/sampling.

use rand::Rng;
use rbpt_math::{Direction, Frame, Vec2, Vec3};
use std::f32::consts::{FRAC_1_PI, PI};

use crate::sampling::sample_cosine_hemisphere;

/// Color type alias (linear RGB)
pub type Color = Vec3;

/// Index of a material in the scene's material table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaterialId(pub usize);

/// Surface point as seen by materials and path vertices.
#[derive(Debug, Clone, Copy)]
pub struct Intersection {
    pub p: Vec3,
    /// Normal oriented towards the side the path arrived from
    pub n: Vec3,
    /// Whether `n` is the shape's outward normal
    pub front_face: bool,
}

/// Trait for materials that describe how light interacts with surfaces.
///
/// Directions are unit vectors pointing away from the surface; `wo` is
/// the direction the path arrived from, `wi` the other one.
pub trait Material: Send + Sync {
    fn is_emissive(&self) -> bool {
        false
    }

    /// Radiance emitted from `isect` towards `wo`.
    fn le(&self, _isect: &Intersection, _wo: &Direction) -> Color {
        Color::ZERO
    }

    /// BRDF value for the pair of directions.
    fn f(&self, isect: &Intersection, wi: Vec3, wo: Vec3) -> Color;

    /// Solid-angle density of `sample` returning `wi` given `wo`.
    fn pdf(&self, isect: &Intersection, wi: Vec3, wo: Vec3) -> f32;

    /// Sample a continuation direction. `None` absorbs the path.
    fn sample(&self, isect: &Intersection, wo: Vec3, rng: &mut dyn rand::RngCore) -> Option<Vec3>;
}

/// Lambertian (diffuse) material.
#[derive(Clone, Debug)]
pub struct Lambertian {
    albedo: Color,
}

impl Lambertian {
    pub fn new(albedo: Color) -> Self {
        Self { albedo }
    }
}

impl Material for Lambertian {
    fn f(&self, isect: &Intersection, wi: Vec3, wo: Vec3) -> Color {
        // Opaque: both directions must leave through the arrival side
        if wi.dot(isect.n) <= 0.0 || wo.dot(isect.n) <= 0.0 {
            return Color::ZERO;
        }
        self.albedo * FRAC_1_PI
    }

    fn pdf(&self, isect: &Intersection, wi: Vec3, _wo: Vec3) -> f32 {
        wi.dot(isect.n).max(0.0) * FRAC_1_PI
    }

    fn sample(&self, isect: &Intersection, _wo: Vec3, rng: &mut dyn rand::RngCore) -> Option<Vec3> {
        if self.albedo.max_element() <= 0.0 {
            return None;
        }
        let local = sample_cosine_hemisphere(Vec2::new(rng.gen(), rng.gen()));
        let wi = Frame::from_normal(isect.n).from_local(local);
        if wi.dot(isect.n) <= 0.0 {
            return None;
        }
        Some(wi.normalize())
    }
}

/// Diffuse light emitter. Emits from its front face only and absorbs
/// everything that reaches it.
#[derive(Clone, Debug)]
pub struct DiffuseLight {
    emit: Color,
}

impl DiffuseLight {
    pub fn new(emit: Color) -> Self {
        Self { emit }
    }
}

impl Material for DiffuseLight {
    fn is_emissive(&self) -> bool {
        true
    }

    fn le(&self, isect: &Intersection, wo: &Direction) -> Color {
        if isect.front_face && !wo.in_lower_hemisphere() {
            self.emit
        } else {
            Color::ZERO
        }
    }

    fn f(&self, _isect: &Intersection, _wi: Vec3, _wo: Vec3) -> Color {
        Color::ZERO
    }

    fn pdf(&self, _isect: &Intersection, _wi: Vec3, _wo: Vec3) -> f32 {
        0.0
    }

    fn sample(&self, _isect: &Intersection, _wo: Vec3, _rng: &mut dyn rand::RngCore) -> Option<Vec3> {
        None
    }
}

/// Scalar weight of an RGB value (Rec. 709 luminance).
#[inline]
pub fn luminance(c: Color) -> f32 {
    0.2126 * c.x + 0.7152 * c.y + 0.0722 * c.z
}

/// Cosine-weighted emission profile of a diffuse emitter, `cos / pi`.
#[inline]
pub fn emission_pdf(n: Vec3, w: Vec3) -> f32 {
    w.dot(n).max(0.0) / PI
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn isect() -> Intersection {
        Intersection {
            p: Vec3::ZERO,
            n: Vec3::Y,
            front_face: true,
        }
    }

    #[test]
    fn test_lambertian_samples_upper_hemisphere() {
        let mat = Lambertian::new(Color::splat(0.8));
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..256 {
            let wi = mat.sample(&isect(), Vec3::Y, &mut rng).unwrap();
            assert!(wi.dot(Vec3::Y) > 0.0);
            assert!((wi.length() - 1.0).abs() < 1e-4);
            assert!(mat.pdf(&isect(), wi, Vec3::Y) > 0.0);
        }
    }

    #[test]
    fn test_lambertian_is_opaque() {
        let mat = Lambertian::new(Color::ONE);
        assert_eq!(mat.f(&isect(), -Vec3::Y, Vec3::Y), Color::ZERO);
        assert!((mat.f(&isect(), Vec3::Y, Vec3::Y).x - FRAC_1_PI).abs() < 1e-6);
    }

    #[test]
    fn test_light_emits_from_front_only() {
        let light = DiffuseLight::new(Color::splat(3.0));
        let front = isect();
        let back = Intersection { front_face: false, ..front };
        let up = Direction::new(Vec3::Y, Vec3::Y);
        assert_eq!(light.le(&front, &up), Color::splat(3.0));
        assert_eq!(light.le(&back, &up), Color::ZERO);
        assert!(light.sample(&front, Vec3::Y, &mut StdRng::seed_from_u64(1)).is_none());
    }
}
