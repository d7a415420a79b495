//! Render-ready scene: materials, shapes, BVH and the emitter table.

use std::sync::Arc;

use rand::Rng;
use rbpt_core::{SceneDescription, ShapeDescription};
use rbpt_math::{Ray, Vec2, Vec3, RAY_EPSILON};

use crate::bvh::BvhNode;
use crate::error::{RenderError, RenderResult};
use crate::hittable::{HitRecord, Hittable, Shape};
use crate::material::{Color, DiffuseLight, Intersection, Lambertian, Material, MaterialId};
use crate::sphere::Sphere;
use crate::triangle::{quad, Triangle};

/// A point sampled on an emitter, uniformly by total emissive area.
#[derive(Debug, Clone, Copy)]
pub struct LightSample {
    pub isect: Intersection,
    pub material: MaterialId,
    /// Area density of the sample
    pub pdf_area: f32,
}

/// Scene consumed by path construction and the estimator.
pub struct Scene {
    materials: Vec<Box<dyn Material>>,
    bvh: BvhNode,
    /// Emissive shapes and their cumulative areas
    lights: Vec<Arc<dyn Shape>>,
    light_cdf: Vec<f32>,
    light_area: f32,
}

impl Scene {
    /// Build from a validated description.
    pub fn from_description(desc: &SceneDescription) -> RenderResult<Self> {
        let mut builder = SceneBuilder::new();
        for m in &desc.materials {
            if m.is_emissive() {
                builder.add_material(DiffuseLight::new(Vec3::from(m.emission)));
            } else {
                builder.add_material(Lambertian::new(Vec3::from(m.diffuse)));
            }
        }

        for shape in &desc.shapes {
            let material = desc
                .material_index(shape.material())
                .map(MaterialId)
                .ok_or_else(|| RenderError::UnknownMaterial(shape.material().to_string()))?;
            match shape {
                ShapeDescription::Sphere { center, radius, .. } => {
                    builder.add_shape(Sphere::new(Vec3::from(*center), *radius, material));
                }
                ShapeDescription::Quad {
                    corner,
                    edge_u,
                    edge_v,
                    ..
                } => {
                    for tri in quad(
                        Vec3::from(*corner),
                        Vec3::from(*edge_u),
                        Vec3::from(*edge_v),
                        material,
                    ) {
                        builder.add_shape(tri);
                    }
                }
                ShapeDescription::Mesh {
                    positions, indices, ..
                } => {
                    for idx in indices.chunks_exact(3) {
                        let v = |i: u32| Vec3::from(positions[i as usize]);
                        builder.add_shape(Triangle::new(v(idx[0]), v(idx[1]), v(idx[2]), material));
                    }
                }
            }
        }

        builder.build()
    }

    /// Whether anything blocks `ray` in `(RAY_EPSILON, t_max)`.
    pub fn intersect(&self, ray: &Ray, t_max: f32) -> bool {
        self.bvh.occluded(ray, RAY_EPSILON, t_max)
    }

    /// Visibility between two points, leaving a margin at both ends.
    pub fn visible(&self, from: Vec3, dir: Vec3, dist: f32) -> bool {
        !self.intersect(&Ray::new(from, dir), Ray::shadow_limit(dist))
    }

    pub fn closest_hit(&self, ray: &Ray) -> Option<HitRecord> {
        let mut rec = HitRecord::default();
        self.bvh
            .hit(ray, RAY_EPSILON, f32::INFINITY, &mut rec)
            .then_some(rec)
    }

    pub fn material(&self, id: MaterialId) -> &dyn Material {
        self.materials[id.0].as_ref()
    }

    pub fn has_lights(&self) -> bool {
        !self.lights.is_empty()
    }

    /// Total emissive surface area.
    pub fn light_area(&self) -> f32 {
        self.light_area
    }

    /// Pick an emitter in proportion to its area and a uniform point on it.
    pub fn sample_light(&self, rng: &mut dyn rand::RngCore) -> Option<LightSample> {
        if self.lights.is_empty() || self.light_area <= 0.0 {
            return None;
        }
        let u: f32 = rng.gen::<f32>() * self.light_area;
        let idx = self
            .light_cdf
            .partition_point(|&c| c <= u)
            .min(self.lights.len() - 1);
        let light = &self.lights[idx];
        let s = light.sample_area(Vec2::new(rng.gen(), rng.gen()));
        Some(LightSample {
            isect: Intersection {
                p: s.p,
                n: s.n,
                front_face: true,
            },
            material: light.material(),
            pdf_area: 1.0 / self.light_area,
        })
    }

    /// Area density with which `sample_light` produces a point on an emitter.
    pub fn light_pdf_area(&self, _isect: &Intersection) -> f32 {
        if self.light_area > 0.0 {
            1.0 / self.light_area
        } else {
            0.0
        }
    }

    /// Emitted radiance of the light sample towards its normal.
    pub fn light_radiance(&self, sample: &LightSample) -> Color {
        let up = rbpt_math::Direction::new(sample.isect.n, sample.isect.n);
        self.material(sample.material).le(&sample.isect, &up)
    }
}

/// Incremental scene construction for code and tests.
#[derive(Default)]
pub struct SceneBuilder {
    materials: Vec<Box<dyn Material>>,
    shapes: Vec<Arc<dyn Shape>>,
}

impl SceneBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_material<M: Material + 'static>(&mut self, material: M) -> MaterialId {
        self.materials.push(Box::new(material));
        MaterialId(self.materials.len() - 1)
    }

    pub fn add_shape<S: Shape + 'static>(&mut self, shape: S) -> &mut Self {
        self.shapes.push(Arc::new(shape));
        self
    }

    pub fn build(self) -> RenderResult<Scene> {
        if let Some(bad) = self.shapes.iter().find(|s| s.material().0 >= self.materials.len()) {
            return Err(RenderError::UnknownMaterial(format!("#{}", bad.material().0)));
        }

        let lights: Vec<Arc<dyn Shape>> = self
            .shapes
            .iter()
            .filter(|s| self.materials[s.material().0].is_emissive() && s.area() > 0.0)
            .cloned()
            .collect();
        let mut light_area = 0.0;
        let light_cdf: Vec<f32> = lights
            .iter()
            .map(|l| {
                light_area += l.area();
                light_area
            })
            .collect();

        log::debug!(
            "Scene: {} shapes, {} emitters, emissive area {:.4}",
            self.shapes.len(),
            lights.len(),
            light_area
        );

        Ok(Scene {
            materials: self.materials,
            bvh: BvhNode::new(self.shapes),
            lights,
            light_cdf,
            light_area,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_light_sampling_uses_area() {
        let mut builder = SceneBuilder::new();
        let light = builder.add_material(DiffuseLight::new(Color::splat(2.0)));
        for tri in quad(Vec3::new(-1.0, -1.0, -1.0), Vec3::X * 2.0, Vec3::Y * 2.0, light) {
            builder.add_shape(tri);
        }
        let scene = builder.build().unwrap();
        assert!((scene.light_area() - 4.0).abs() < 1e-5);

        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..64 {
            let s = scene.sample_light(&mut rng).unwrap();
            assert!((s.pdf_area - 0.25).abs() < 1e-6);
            assert!((s.isect.p.z + 1.0).abs() < 1e-6);
            assert_eq!(scene.light_radiance(&s), Color::splat(2.0));
        }
    }

    #[test]
    fn test_occlusion_and_closest_hit() {
        let mut builder = SceneBuilder::new();
        let grey = builder.add_material(Lambertian::new(Color::splat(0.5)));
        builder.add_shape(Sphere::new(Vec3::new(0.0, 0.0, -3.0), 1.0, grey));
        let scene = builder.build().unwrap();

        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0));
        assert!(scene.intersect(&ray, 10.0));
        assert!(!scene.intersect(&ray, 1.5));
        let hit = scene.closest_hit(&ray).unwrap();
        assert!((hit.t - 2.0).abs() < 1e-4);
        assert!(!scene.has_lights());
        assert!(scene.sample_light(&mut StdRng::seed_from_u64(0)).is_none());
    }

    #[test]
    fn test_bad_material_reference() {
        let mut builder = SceneBuilder::new();
        builder.add_shape(Sphere::new(Vec3::ZERO, 1.0, MaterialId(3)));
        assert!(matches!(builder.build(), Err(RenderError::UnknownMaterial(_))));
    }
}
