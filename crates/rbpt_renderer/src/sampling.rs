//! Sample warping and random stream helpers.

use rbpt_math::{Vec2, Vec3};
use std::f32::consts::{FRAC_PI_2, FRAC_PI_4, PI};

/// Map `u` in `[0,1)^2` to the unit disk with the concentric mapping.
pub fn sample_disk_concentric(u: Vec2) -> Vec2 {
    let r1 = 2.0 * u.x - 1.0;
    let r2 = 2.0 * u.y - 1.0;
    if r1 == 0.0 && r2 == 0.0 {
        return Vec2::ZERO;
    }

    let (r, phi) = if r1 * r1 > r2 * r2 {
        (r1, FRAC_PI_4 * (r2 / r1))
    } else {
        (r2, FRAC_PI_2 - FRAC_PI_4 * (r1 / r2))
    };
    let (sin_phi, cos_phi) = phi.sin_cos();
    Vec2::new(r * cos_phi, r * sin_phi)
}

/// Cosine-weighted direction around local `+z`. Density is `cos / pi`.
pub fn sample_cosine_hemisphere(u: Vec2) -> Vec3 {
    let p = sample_disk_concentric(u);
    let z = (1.0 - p.length_squared()).max(0.0).sqrt();
    Vec3::new(p.x, p.y, z)
}

/// Uniform point on the unit sphere.
pub fn sample_uniform_sphere(u: Vec2) -> Vec3 {
    let z = 1.0 - 2.0 * u.x;
    let r = (1.0 - z * z).max(0.0).sqrt();
    let phi = 2.0 * PI * u.y;
    Vec3::new(r * phi.cos(), r * phi.sin(), z)
}

/// Barycentric coordinates `(b0, b1)` of a uniform point on a triangle.
pub fn sample_triangle(u: Vec2) -> (f32, f32) {
    let su = u.x.sqrt();
    (1.0 - su, u.y * su)
}

/// Parallel phases of one iteration, used to separate random streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u64)]
pub enum Phase {
    Caches = 1,
    LightPaths = 2,
    Shading = 3,
}

/// Seed of the random stream for one task.
///
/// Every task of every phase gets its own stream, so the image does not
/// depend on how tasks are scheduled across workers.
pub fn stream_seed(seed: u64, iteration: u32, phase: Phase, index: usize) -> u64 {
    let mut h = splitmix64(seed);
    h = splitmix64(h ^ iteration as u64);
    h = splitmix64(h ^ phase as u64);
    splitmix64(h ^ index as u64)
}

fn splitmix64(x: u64) -> u64 {
    let mut z = x.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_cosine_hemisphere_is_unit_and_upper() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..512 {
            let d = sample_cosine_hemisphere(Vec2::new(rng.gen(), rng.gen()));
            assert!(d.z >= 0.0);
            assert!((d.length() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_triangle_barycentrics_in_range() {
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..512 {
            let (b0, b1) = sample_triangle(Vec2::new(rng.gen(), rng.gen()));
            assert!(b0 >= 0.0 && b1 >= 0.0 && b0 + b1 <= 1.0 + 1e-6);
        }
    }

    #[test]
    fn test_stream_seeds_differ() {
        let a = stream_seed(0, 1, Phase::Shading, 10);
        let b = stream_seed(0, 1, Phase::Shading, 11);
        let c = stream_seed(0, 2, Phase::Shading, 10);
        let d = stream_seed(0, 1, Phase::LightPaths, 10);
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
        assert_eq!(a, stream_seed(0, 1, Phase::Shading, 10));
    }
}
