//! Triangle primitive.
//!
//! Uses the Möller-Trumbore algorithm for ray-triangle intersection.
//! Quads are built from two triangles sharing the quad's front face.

use crate::hittable::{HitRecord, Hittable, Shape, SurfaceSample};
use crate::material::MaterialId;
use crate::sampling::sample_triangle;
use rbpt_math::{Aabb, Ray, Vec2, Vec3};

/// A triangle primitive.
pub struct Triangle {
    /// Vertices
    v0: Vec3,
    v1: Vec3,
    v2: Vec3,
    /// Face normal `(v1 - v0) x (v2 - v0)`, unit length
    normal: Vec3,
    area: f32,
    material: MaterialId,
    bbox: Aabb,
}

impl Triangle {
    /// Create a new triangle from three vertices.
    pub fn new(v0: Vec3, v1: Vec3, v2: Vec3, material: MaterialId) -> Self {
        let cross = (v1 - v0).cross(v2 - v0);
        let area = 0.5 * cross.length();
        let normal = cross.normalize_or_zero();

        let mut bbox = Aabb::from_points(v0, v1);
        bbox.grow(v2);

        Self {
            v0,
            v1,
            v2,
            normal,
            area,
            material,
            bbox,
        }
    }

    pub fn normal(&self) -> Vec3 {
        self.normal
    }
}

/// The two triangles of the parallelogram `corner + a*edge_u + b*edge_v`,
/// both facing `edge_u x edge_v`.
pub fn quad(corner: Vec3, edge_u: Vec3, edge_v: Vec3, material: MaterialId) -> [Triangle; 2] {
    let far = corner + edge_u + edge_v;
    [
        Triangle::new(corner, corner + edge_u, far, material),
        Triangle::new(corner, far, corner + edge_v, material),
    ]
}

impl Hittable for Triangle {
    fn hit(&self, ray: &Ray, t_min: f32, t_max: f32, rec: &mut HitRecord) -> bool {
        let edge1 = self.v1 - self.v0;
        let edge2 = self.v2 - self.v0;

        let h = ray.direction().cross(edge2);
        let a = edge1.dot(h);

        // Ray is parallel to triangle
        if a.abs() < 1e-8 {
            return false;
        }

        let f = 1.0 / a;
        let s = ray.origin() - self.v0;
        let u = f * s.dot(h);
        if !(0.0..=1.0).contains(&u) {
            return false;
        }

        let q = s.cross(edge1);
        let v = f * ray.direction().dot(q);
        if v < 0.0 || u + v > 1.0 {
            return false;
        }

        let t = f * edge2.dot(q);
        if t <= t_min || t >= t_max {
            return false;
        }

        rec.t = t;
        rec.p = ray.at(t);
        rec.set_face_normal(ray, self.normal);
        rec.material = self.material;

        true
    }

    fn bounding_box(&self) -> Aabb {
        self.bbox
    }
}

impl Shape for Triangle {
    fn material(&self) -> MaterialId {
        self.material
    }

    fn area(&self) -> f32 {
        self.area
    }

    fn sample_area(&self, u: Vec2) -> SurfaceSample {
        let (b0, b1) = sample_triangle(u);
        SurfaceSample {
            p: b0 * self.v0 + b1 * self.v1 + (1.0 - b0 - b1) * self.v2,
            n: self.normal,
        }
    }
}
