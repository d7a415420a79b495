//! Implicit balanced kd-tree over cache-point positions.
//!
//! The tree is stored as a permutation of point indices: the node covering
//! `order[lo..hi]` is the median slot `(lo + hi) / 2`, split on the widest
//! axis of its points.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use rbpt_math::{Aabb, Vec3};

#[derive(Debug, Clone, Copy, PartialEq)]
struct OrdF32(f32);

impl Eq for OrdF32 {}

impl PartialOrd for OrdF32 {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrdF32 {
    #[inline]
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct KdTree {
    points: Vec<Vec3>,
    order: Vec<usize>,
    axes: Vec<u8>,
}

impl KdTree {
    pub fn build(points: Vec<Vec3>) -> Self {
        let n = points.len();
        let mut tree = Self {
            points,
            order: (0..n).collect(),
            axes: vec![0; n],
        };
        tree.build_range(0, n);
        tree
    }

    fn build_range(&mut self, lo: usize, hi: usize) {
        if hi - lo <= 1 {
            return;
        }
        let points = &self.points;
        let bounds = self.order[lo..hi].iter().fold(Aabb::EMPTY, |mut acc, &i| {
            acc.grow(points[i]);
            acc
        });
        let axis = bounds.longest_axis();

        let mid = (lo + hi) / 2;
        self.order[lo..hi].select_nth_unstable_by(mid - lo, |&a, &b| {
            points[a][axis]
                .total_cmp(&points[b][axis])
                .then(a.cmp(&b))
        });
        self.axes[mid] = axis as u8;

        self.build_range(lo, mid);
        self.build_range(mid + 1, hi);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Indices of the `k` points closest to `p`, closest first.
    pub fn k_nearest(&self, p: Vec3, k: usize) -> Vec<usize> {
        let mut heap = BinaryHeap::with_capacity(k + 1);
        if k > 0 {
            self.search(0, self.order.len(), p, k, &mut heap);
        }
        let mut found = heap.into_vec();
        found.sort_unstable();
        found.into_iter().map(|(_, i)| i).collect()
    }

    pub fn nearest(&self, p: Vec3) -> Option<usize> {
        self.k_nearest(p, 1).first().copied()
    }

    fn search(
        &self,
        lo: usize,
        hi: usize,
        p: Vec3,
        k: usize,
        heap: &mut BinaryHeap<(OrdF32, usize)>,
    ) {
        if lo >= hi {
            return;
        }
        let mid = (lo + hi) / 2;
        let idx = self.order[mid];
        let q = self.points[idx];

        // Ties are broken by index so the result does not depend on the
        // traversal order.
        let candidate = (OrdF32(p.distance_squared(q)), idx);
        if heap.len() < k {
            heap.push(candidate);
        } else if heap.peek().map_or(false, |top| candidate < *top) {
            heap.pop();
            heap.push(candidate);
        }

        if hi - lo == 1 {
            return;
        }
        let axis = self.axes[mid] as usize;
        let diff = p[axis] - q[axis];
        let (near, far) = if diff < 0.0 {
            ((lo, mid), (mid + 1, hi))
        } else {
            ((mid + 1, hi), (lo, mid))
        };

        self.search(near.0, near.1, p, k, heap);
        let worst = heap.peek().map_or(f32::INFINITY, |top| top.0 .0);
        if heap.len() < k || diff * diff <= worst {
            self.search(far.0, far.1, p, k, heap);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn brute_force(points: &[Vec3], p: Vec3, k: usize) -> Vec<usize> {
        let mut all: Vec<(OrdF32, usize)> = points
            .iter()
            .enumerate()
            .map(|(i, q)| (OrdF32(p.distance_squared(*q)), i))
            .collect();
        all.sort_unstable();
        all.into_iter().take(k).map(|(_, i)| i).collect()
    }

    #[test]
    fn test_matches_brute_force() {
        let mut rng = StdRng::seed_from_u64(42);
        let points: Vec<Vec3> = (0..500)
            .map(|_| Vec3::new(rng.gen(), rng.gen::<f32>() * 4.0, rng.gen::<f32>() * 0.1))
            .collect();
        let tree = KdTree::build(points.clone());
        assert_eq!(tree.len(), 500);

        for _ in 0..100 {
            let p = Vec3::new(rng.gen(), rng.gen::<f32>() * 4.0, rng.gen::<f32>() * 0.1);
            for k in [1, 4, 9] {
                assert_eq!(tree.k_nearest(p, k), brute_force(&points, p, k));
            }
            assert_eq!(tree.nearest(p), brute_force(&points, p, 1).first().copied());
        }
    }

    #[test]
    fn test_duplicate_points() {
        let points = vec![Vec3::ONE; 10];
        let tree = KdTree::build(points);
        assert_eq!(tree.k_nearest(Vec3::ZERO, 3), vec![0, 1, 2]);
    }

    #[test]
    fn test_empty_and_oversized_queries() {
        let empty = KdTree::build(Vec::new());
        assert!(empty.is_empty());
        assert_eq!(empty.nearest(Vec3::ZERO), None);

        let tree = KdTree::build(vec![Vec3::X, Vec3::Y]);
        assert_eq!(tree.k_nearest(Vec3::ZERO, 5).len(), 2);
        assert!(tree.k_nearest(Vec3::ZERO, 0).is_empty());
    }
}
