//! Cache points and their resampling distributions.
//!
//! A cache point is a camera-path vertex used as a hub: after the light
//! sub-paths of an iteration are traced it holds a distribution over the
//! candidate pool, proportional to the unoccluded contribution each
//! candidate would make at the cache. Camera vertices resample their
//! connections from nearby caches.

use std::ops::Index;

use rand::Rng;
use rbpt_math::Vec3;

use crate::kd_tree::KdTree;
use crate::material::luminance;
use crate::parallel::Executor;
use crate::path::{Connection, LightPath, PathVertex};
use crate::scene::Scene;

/// A light-path vertex in the candidate pool. Connecting through it is
/// strategy `s = vertex + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub path: usize,
    pub vertex: usize,
}

impl Candidate {
    pub fn s(&self) -> usize {
        self.vertex + 1
    }

    pub fn resolve<'a>(&self, paths: &'a [LightPath]) -> &'a PathVertex {
        &paths[self.path][self.vertex]
    }
}

/// Every vertex, from the emitter vertex on, of the first `m` light paths.
pub fn collect_candidates(paths: &[LightPath], m: usize) -> Vec<Candidate> {
    paths
        .iter()
        .take(m)
        .enumerate()
        .flat_map(|(path, y)| (0..y.num_vertices()).map(move |vertex| Candidate { path, vertex }))
        .collect()
}

/// Discrete distribution over the candidates with positive weight.
#[derive(Debug, Clone, Default)]
pub struct ResamplingDistribution {
    /// Candidate indices, ascending
    support: Vec<usize>,
    weights: Vec<f32>,
    cdf: Vec<f64>,
    total: f64,
}

impl ResamplingDistribution {
    /// Build from `(candidate index, weight)` pairs in ascending index order.
    /// Non-positive and non-finite weights are left out of the support.
    pub fn build(weights: impl IntoIterator<Item = (usize, f32)>) -> Self {
        let mut dist = Self::default();
        for (j, w) in weights {
            if !(w > 0.0 && w.is_finite()) {
                continue;
            }
            dist.total += w as f64;
            dist.support.push(j);
            dist.weights.push(w);
            dist.cdf.push(dist.total);
        }
        dist
    }

    pub fn is_empty(&self) -> bool {
        self.support.is_empty()
    }

    pub fn len(&self) -> usize {
        self.support.len()
    }

    /// Sum of the unnormalized weights.
    pub fn normalization_constant(&self) -> f32 {
        self.total as f32
    }

    /// Draw a candidate index and its probability.
    pub fn sample(&self, rng: &mut dyn rand::RngCore) -> Option<(usize, f32)> {
        if self.support.is_empty() {
            return None;
        }
        let u = rng.gen::<f64>() * self.total;
        let i = self
            .cdf
            .partition_point(|&c| c <= u)
            .min(self.support.len() - 1);
        Some((self.support[i], (self.weights[i] as f64 / self.total) as f32))
    }

    /// Probability of `candidate`; zero outside the support.
    pub fn pmf(&self, candidate: usize) -> f32 {
        match self.support.binary_search(&candidate) {
            Ok(i) => (self.weights[i] as f64 / self.total) as f32,
            Err(_) => 0.0,
        }
    }
}

/// Unnormalized resampling weight of light vertex `y` at cache vertex `c`:
/// the luminance of the full connection contribution, zero when the
/// connection is invalid or occluded.
pub fn candidate_weight(scene: &Scene, y: &PathVertex, c: &PathVertex) -> f32 {
    let Some(conn) = Connection::between(y, c) else {
        return 0.0;
    };
    let fy = y.f(scene, &conn.yz);
    let fc = c.f(scene, &conn.zy);
    let w = luminance(y.throughput * fy * fc * conn.geometry());
    if w <= 0.0 || !scene.visible(y.p(), conn.yz.vector(), conn.dist) {
        return 0.0;
    }
    w
}

#[derive(Debug, Clone)]
pub struct CachePoint {
    vertex: PathVertex,
    /// Normalization factor carried over from the previous iteration
    seed: Option<f32>,
    distribution: ResamplingDistribution,
    /// Expected weight total per light sub-path
    q: f32,
    /// `Σw / M` of this iteration's pool
    estimate: f32,
}

impl CachePoint {
    pub fn new(vertex: PathVertex, seed: Option<f32>) -> Self {
        Self {
            vertex,
            seed,
            distribution: ResamplingDistribution::default(),
            q: 0.0,
            estimate: 0.0,
        }
    }

    pub fn position(&self) -> Vec3 {
        self.vertex.p()
    }

    /// Populate the distribution over `candidates`.
    pub fn build(&mut self, scene: &Scene, paths: &[LightPath], candidates: &[Candidate], m: usize) {
        let c = &self.vertex;
        self.distribution = ResamplingDistribution::build(
            candidates
                .iter()
                .enumerate()
                .map(|(j, cand)| (j, candidate_weight(scene, cand.resolve(paths), c))),
        );
        self.estimate = self.distribution.normalization_constant() / m as f32;
        self.q = self.seed.unwrap_or(self.estimate);
    }

    /// Normalization factor `Q`.
    pub fn q(&self) -> f32 {
        self.q
    }

    pub fn estimate(&self) -> f32 {
        self.estimate
    }

    pub fn normalization_constant(&self) -> f32 {
        self.distribution.normalization_constant()
    }

    pub fn sample(&self, rng: &mut dyn rand::RngCore) -> Option<(usize, f32)> {
        self.distribution.sample(rng)
    }

    pub fn pmf(&self, candidate: usize) -> f32 {
        self.distribution.pmf(candidate)
    }
}

/// Cache points of one iteration with a kd-tree over their positions.
///
/// The points live in an arena indexed by the tree; distributions are built
/// through `&mut self` before shading reads them through `&self`.
#[derive(Debug, Clone, Default)]
pub struct CacheIndex {
    caches: Vec<CachePoint>,
    tree: KdTree,
}

impl CacheIndex {
    pub fn new(caches: Vec<CachePoint>) -> Self {
        let tree = KdTree::build(caches.iter().map(CachePoint::position).collect());
        Self { caches, tree }
    }

    pub fn len(&self) -> usize {
        self.caches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.caches.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CachePoint> {
        self.caches.iter()
    }

    pub fn k_nearest(&self, p: Vec3, k: usize) -> Vec<usize> {
        self.tree.k_nearest(p, k)
    }

    pub fn nearest(&self, p: Vec3) -> Option<usize> {
        self.tree.nearest(p)
    }

    /// Build every cache's distribution, one task per cache.
    pub fn build_distributions(
        &mut self,
        executor: &Executor,
        scene: &Scene,
        paths: &[LightPath],
        candidates: &[Candidate],
        m: usize,
    ) {
        executor.for_each_mut(&mut self.caches, |cache| cache.build(scene, paths, candidates, m));
    }

    /// Seed for a new cache at `p`: the mean estimate of `neighbors`, or of
    /// the nearest cache when there are none.
    pub fn seed_for(&self, p: Vec3, neighbors: impl Iterator<Item = usize>) -> Option<f32> {
        let (sum, count) = neighbors.fold((0.0, 0usize), |(sum, count), id| {
            (sum + self.caches[id].estimate, count + 1)
        });
        if count > 0 {
            return Some(sum / count as f32);
        }
        self.nearest(p).map(|id| self.caches[id].estimate)
    }
}

impl Index<usize> for CacheIndex {
    type Output = CachePoint;

    fn index(&self, id: usize) -> &CachePoint {
        &self.caches[id]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::CameraPath;
    use crate::test_scenes;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_distribution_sums_to_one() {
        let mut rng = StdRng::seed_from_u64(8);
        let weights: Vec<(usize, f32)> = (0..200)
            .map(|j| (j, if j % 3 == 0 { 0.0 } else { rng.gen::<f32>() * 10.0 }))
            .collect();
        let dist = ResamplingDistribution::build(weights.clone());

        let total: f32 = (0..200).map(|j| dist.pmf(j)).sum();
        assert!((total - 1.0).abs() < 1e-4);
        assert_eq!(dist.pmf(0), 0.0);

        let expected: f32 = weights.iter().map(|&(_, w)| w).sum();
        assert!((dist.normalization_constant() - expected).abs() / expected < 1e-5);

        for _ in 0..500 {
            let (j, pmf) = dist.sample(&mut rng).unwrap();
            assert!(j % 3 != 0);
            assert!((pmf - dist.pmf(j)).abs() < 1e-7);
        }
    }

    #[test]
    fn test_empty_distribution() {
        let dist = ResamplingDistribution::build(vec![(0, 0.0), (1, -1.0), (2, f32::NAN)]);
        assert!(dist.is_empty());
        assert_eq!(dist.normalization_constant(), 0.0);
        assert!(dist.sample(&mut StdRng::seed_from_u64(0)).is_none());
    }

    #[test]
    fn test_candidates_start_at_emitter_vertex() {
        let (scene, _) = test_scenes::cornell_box(8);
        let mut rng = StdRng::seed_from_u64(12);
        let paths: Vec<LightPath> = (0..10)
            .map(|_| LightPath::construct(&scene, &mut rng, 5))
            .collect();
        let candidates = collect_candidates(&paths, 4);
        let expected: usize = paths[..4].iter().map(LightPath::num_vertices).sum();
        assert_eq!(candidates.len(), expected);
        assert_eq!(candidates[0], Candidate { path: 0, vertex: 0 });
        assert_eq!(candidates[0].s(), 1);
        assert!(candidates.iter().all(|c| c.path < 4));
    }

    #[test]
    fn test_cache_distribution_in_cornell_box() {
        let _ = env_logger::builder().is_test(true).try_init();
        let (scene, camera) = test_scenes::cornell_box(8);
        let mut rng = StdRng::seed_from_u64(13);
        let paths: Vec<LightPath> = (0..64)
            .map(|_| LightPath::construct(&scene, &mut rng, 5))
            .collect();
        let candidates = collect_candidates(&paths, 64);

        let mut z = CameraPath::new(0);
        z.construct(&scene, &camera, 4, 4, &mut rng, 5, None);
        assert!(z.num_vertices() >= 2);
        let mut cache = CachePoint::new(z[1], None);
        cache.build(&scene, &paths, &candidates, 64);

        // The back wall sees the ceiling light directly
        assert!(cache.normalization_constant() > 0.0);
        assert!((cache.q() - cache.normalization_constant() / 64.0).abs() < 1e-6);
        let total: f32 = (0..candidates.len()).map(|j| cache.pmf(j)).sum();
        assert!((total - 1.0).abs() < 1e-4);

        let seeded = {
            let mut c = CachePoint::new(z[1], Some(0.5));
            c.build(&scene, &paths, &candidates, 64);
            c
        };
        assert_eq!(seeded.q(), 0.5);
        assert_eq!(seeded.estimate(), cache.estimate());
    }

    #[test]
    fn test_seed_falls_back_to_nearest() {
        let (scene, camera) = test_scenes::emitter_wall(8);
        let mut rng = StdRng::seed_from_u64(14);
        let mut z = CameraPath::new(0);
        z.construct(&scene, &camera, 0, 0, &mut rng, 4, None);
        let mut a = CachePoint::new(z[1], None);
        a.estimate = 2.0;
        let mut b = CachePoint::new(z[1], None);
        b.estimate = 4.0;
        let index = CacheIndex::new(vec![a, b]);

        assert_eq!(index.seed_for(Vec3::ZERO, [0, 1].into_iter()), Some(3.0));
        assert_eq!(index.seed_for(z[1].p(), std::iter::empty()), Some(2.0));
        assert_eq!(CacheIndex::default().seed_for(Vec3::ZERO, std::iter::empty()), None);
    }
}
