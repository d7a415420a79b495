//! Hittable trait and HitRecord for ray-object intersection.

use rbpt_math::{Aabb, Ray, Vec2, Vec3};

use crate::material::{Intersection, MaterialId};

/// Record of a ray-object intersection.
#[derive(Clone, Copy, Debug)]
pub struct HitRecord {
    /// Point of intersection
    pub p: Vec3,
    /// Surface normal at intersection (always points against ray)
    pub normal: Vec3,
    /// Material at the intersection point
    pub material: MaterialId,
    /// Parameter t where the intersection occurs
    pub t: f32,
    /// Whether the ray hit the front face (outside) of the surface
    pub front_face: bool,
}

impl Default for HitRecord {
    fn default() -> Self {
        Self {
            p: Vec3::ZERO,
            normal: Vec3::ZERO,
            material: MaterialId(0),
            t: 0.0,
            front_face: false,
        }
    }
}

impl HitRecord {
    /// Set the face normal based on ray direction and outward normal.
    ///
    /// The normal is always stored pointing against the ray direction,
    /// so we need to track whether we hit the front or back face.
    pub fn set_face_normal(&mut self, ray: &Ray, outward_normal: Vec3) {
        self.front_face = ray.direction().dot(outward_normal) < 0.0;
        self.normal = if self.front_face {
            outward_normal
        } else {
            -outward_normal
        };
    }

    /// Geometry of the hit as seen by materials.
    pub fn intersection(&self) -> Intersection {
        Intersection {
            p: self.p,
            n: self.normal,
            front_face: self.front_face,
        }
    }
}

/// Trait for objects that can be hit by rays.
pub trait Hittable: Send + Sync {
    /// Test if a ray hits this object within `(t_min, t_max)`.
    ///
    /// Returns true if hit, and fills in the hit record.
    fn hit(&self, ray: &Ray, t_min: f32, t_max: f32, rec: &mut HitRecord) -> bool;

    /// Get the axis-aligned bounding box of this object.
    fn bounding_box(&self) -> Aabb;
}

/// A point sampled uniformly on a shape's surface.
#[derive(Clone, Copy, Debug)]
pub struct SurfaceSample {
    pub p: Vec3,
    /// Outward (front-face) normal
    pub n: Vec3,
}

/// A primitive with a material and an area measure, so emissive shapes
/// can be sampled by light sub-paths.
pub trait Shape: Hittable {
    fn material(&self) -> MaterialId;

    fn area(&self) -> f32;

    /// Sample a point uniformly by area from `u` in `[0,1)^2`.
    fn sample_area(&self, u: Vec2) -> SurfaceSample;
}
