//! Bounding Volume Hierarchy (BVH) acceleration structure.
//!
//! Binary tree over the scene's shapes, answering closest-hit queries for
//! path construction and any-hit queries for shadow rays.

use std::sync::Arc;

use crate::hittable::{HitRecord, Hittable, Shape};
use rbpt_math::{Aabb, Ray};

/// Maximum primitives per leaf node before splitting.
const LEAF_MAX_SIZE: usize = 4;

/// BVH node - either a branch with two children or a leaf with primitives.
pub enum BvhNode {
    /// Internal node with two children.
    Branch {
        left: Box<BvhNode>,
        right: Box<BvhNode>,
        bbox: Aabb,
    },
    /// Leaf node with a small number of primitives.
    Leaf {
        objects: Vec<Arc<dyn Shape>>,
        bbox: Aabb,
    },
    /// Empty node (for edge cases).
    Empty,
}

impl BvhNode {
    /// Create a BVH from a list of shapes.
    pub fn new(objects: Vec<Arc<dyn Shape>>) -> Self {
        if objects.is_empty() {
            return BvhNode::Empty;
        }
        Self::build(objects)
    }

    /// Median split on the longest axis of the centroid bounds.
    fn build(mut objects: Vec<Arc<dyn Shape>>) -> Self {
        let n = objects.len();

        let bounds = objects
            .iter()
            .fold(Aabb::EMPTY, |acc, o| Aabb::surrounding(&acc, &o.bounding_box()));

        if n <= LEAF_MAX_SIZE {
            return BvhNode::Leaf {
                objects,
                bbox: bounds,
            };
        }

        let centroid_bounds = objects.iter().fold(Aabb::EMPTY, |mut acc, obj| {
            acc.grow(obj.bounding_box().centroid());
            acc
        });
        let axis = centroid_bounds.longest_axis();

        let mid = n / 2;
        objects.select_nth_unstable_by(mid, |a, b| {
            let a_val = a.bounding_box().centroid()[axis];
            let b_val = b.bounding_box().centroid()[axis];
            a_val.total_cmp(&b_val)
        });

        let right_objects = objects.split_off(mid);
        let left = Self::build(objects);
        let right = Self::build(right_objects);

        BvhNode::Branch {
            left: Box::new(left),
            right: Box::new(right),
            bbox: bounds,
        }
    }

    /// Whether anything blocks the ray within `(t_min, t_max)`.
    ///
    /// Stops at the first hit found instead of searching for the closest.
    pub fn occluded(&self, ray: &Ray, t_min: f32, t_max: f32) -> bool {
        match self {
            BvhNode::Empty => false,
            BvhNode::Leaf { objects, bbox } => {
                if !bbox.hit(ray, t_min, t_max) {
                    return false;
                }
                let mut rec = HitRecord::default();
                objects.iter().any(|obj| obj.hit(ray, t_min, t_max, &mut rec))
            }
            BvhNode::Branch { left, right, bbox } => {
                bbox.hit(ray, t_min, t_max)
                    && (left.occluded(ray, t_min, t_max) || right.occluded(ray, t_min, t_max))
            }
        }
    }
}

impl Hittable for BvhNode {
    fn hit(&self, ray: &Ray, t_min: f32, t_max: f32, rec: &mut HitRecord) -> bool {
        match self {
            BvhNode::Empty => false,

            BvhNode::Leaf { objects, bbox } => {
                if !bbox.hit(ray, t_min, t_max) {
                    return false;
                }

                let mut hit_anything = false;
                let mut closest = t_max;

                for obj in objects {
                    if obj.hit(ray, t_min, closest, rec) {
                        hit_anything = true;
                        closest = rec.t;
                    }
                }
                hit_anything
            }

            BvhNode::Branch { left, right, bbox } => {
                if !bbox.hit(ray, t_min, t_max) {
                    return false;
                }

                let hit_left = left.hit(ray, t_min, t_max, rec);

                // Only check right up to closest hit
                let right_max = if hit_left { rec.t } else { t_max };
                let hit_right = right.hit(ray, t_min, right_max, rec);

                hit_left || hit_right
            }
        }
    }

    fn bounding_box(&self) -> Aabb {
        match self {
            BvhNode::Empty => Aabb::EMPTY,
            BvhNode::Leaf { bbox, .. } => *bbox,
            BvhNode::Branch { bbox, .. } => *bbox,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::MaterialId;
    use crate::sphere::Sphere;
    use rbpt_math::Vec3;

    fn spheres(count: usize) -> Vec<Arc<dyn Shape>> {
        (0..count)
            .map(|i| {
                Arc::new(Sphere::new(Vec3::new(i as f32, 0.0, -5.0), 0.5, MaterialId(i)))
                    as Arc<dyn Shape>
            })
            .collect()
    }

    #[test]
    fn test_bvh_empty() {
        let bvh = BvhNode::new(vec![]);
        assert!(matches!(bvh, BvhNode::Empty));
        assert!(!bvh.occluded(&Ray::default(), 0.0, f32::INFINITY));
    }

    #[test]
    fn test_bvh_single_sphere() {
        let bvh = BvhNode::new(spheres(1));
        assert!(matches!(bvh, BvhNode::Leaf { .. }));

        let ray = Ray::new(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0));
        let mut rec = HitRecord::default();
        assert!(bvh.hit(&ray, 0.001, f32::INFINITY, &mut rec));
    }

    #[test]
    fn test_bvh_multiple_spheres() {
        let bvh = BvhNode::new(spheres(10));

        let ray = Ray::new(Vec3::new(5.0, 0.0, 0.0), Vec3::new(0.0, 0.0, -1.0));
        let mut rec = HitRecord::default();
        assert!(bvh.hit(&ray, 0.001, f32::INFINITY, &mut rec));

        // Sphere at z=-5 with radius 0.5
        assert!((rec.p.z - (-4.5)).abs() < 0.01);
        assert_eq!(rec.material, MaterialId(5));
    }

    #[test]
    fn test_occlusion_respects_range() {
        let bvh = BvhNode::new(spheres(10));
        let ray = Ray::new(Vec3::new(3.0, 0.0, 0.0), Vec3::new(0.0, 0.0, -1.0));
        assert!(bvh.occluded(&ray, 0.001, 10.0));
        assert!(!bvh.occluded(&ray, 0.001, 4.0));
    }
}
