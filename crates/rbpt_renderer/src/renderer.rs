//! Progressive iteration driver.
//!
//! Each call to [`Renderer::render`] runs one full iteration and returns an
//! independent estimate of the image; the caller averages them. The phases
//! below are separated by hard barriers:
//!
//! 1. trace eye sub-paths on a coarse auxiliary grid and keep their
//!    vertices as cache points, indexed by a kd-tree;
//! 2. trace one light sub-path per pixel;
//! 3. pool the vertices of the first `M` light sub-paths and build every
//!    cache's resampling distribution over the pool;
//! 4. update the virtual-cache normalization factor;
//! 5. shade every pixel with the `0t`, `s1` and `st` techniques and merge
//!    the light-tracing splats in pixel order.

use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::SeedableRng;
use rbpt_core::RenderSettings;

use crate::cache::{collect_candidates, CacheIndex, CachePoint};
use crate::camera::Camera;
use crate::contribution::{Estimator, PixelSample};
use crate::error::{RenderError, RenderResult};
use crate::image::ImageBuffer;
use crate::parallel::Executor;
use crate::path::{CameraPath, LightPath, MisParams};
use crate::sampling::{stream_seed, Phase};
use crate::scene::Scene;

/// Counters of one iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct IterationStats {
    pub iteration: u32,
    /// Auxiliary eye sub-paths traced
    pub eye_paths: usize,
    /// Vertices of those paths, lens vertices included
    pub eye_vertices: usize,
    pub caches: usize,
    pub light_vertices: usize,
    /// Candidate pool size
    pub pool_size: usize,
    /// Virtual-cache normalization factor after this iteration
    pub qp: f32,
    pub elapsed: Duration,
}

/// Task-local state of a worker.
struct Worker {
    rng: StdRng,
    camera_path: CameraPath,
}

impl Worker {
    fn new(neighbor_caches: usize) -> Self {
        Self {
            rng: StdRng::seed_from_u64(0),
            camera_path: CameraPath::new(neighbor_caches),
        }
    }
}

/// Resolution of the auxiliary camera used to place cache points: about
/// 0.4% of the image's pixels, with the same aspect ratio.
pub fn aux_resolution(width: u32, height: u32) -> (u32, u32) {
    let (w, h) = (width as f32, height as f32);
    let num = w * h * 0.004;
    let res_x = (num * w / h).sqrt().ceil() as u32;
    let res_y = (num * h / w).sqrt().ceil() as u32;
    (res_x.max(1), res_y.max(1))
}

/// Combine per-pixel results into an image.
///
/// A pixel whose own estimate is not finite stays black. Splats are summed
/// in pixel order and scaled by `1 / ns1`.
pub fn compose_image(width: u32, height: u32, samples: &[PixelSample], ns1: usize) -> ImageBuffer {
    let mut image = ImageBuffer::new(width, height);
    let mut splats = ImageBuffer::new(width, height);

    for (pixel, sample) in image.pixels.iter_mut().zip(samples) {
        if sample.radiance.is_finite() {
            *pixel = sample.radiance;
        }
        for s in &sample.splats {
            splats.add(s.x, s.y, s.value);
        }
    }

    let inv_ns1 = 1.0 / ns1 as f32;
    for (pixel, splat) in image.pixels.iter_mut().zip(&splats.pixels) {
        *pixel += *splat * inv_ns1;
    }
    image
}

/// Progressive renderer for one camera resolution.
///
/// Iteration count and the running pool-size sum persist across calls, so
/// `render` takes `&mut self` and calls on one instance are sequential.
pub struct Renderer {
    settings: RenderSettings,
    resolution: (u32, u32),
    executor: Executor,
    iteration: u32,
    /// Running sum of pool size / M
    sum: f64,
    qp: f32,
    /// Cache points of the previous iteration, seeding the next one
    caches: Option<CacheIndex>,
    stats: Option<IterationStats>,
}

impl Renderer {
    pub fn new(camera: &Camera, settings: &RenderSettings) -> RenderResult<Self> {
        let pixels = camera.pixel_count();
        let m = settings.light_subpaths;
        if m == 0 || m > pixels {
            return Err(RenderError::InvalidLightSubpaths { m, pixels });
        }
        let executor = Executor::new(settings.threads)?;

        log::info!(
            "Renderer: {}x{}, M={}, Nc={}, max depth {}, {} threads",
            camera.res_x(),
            camera.res_y(),
            m,
            settings.neighbor_caches,
            settings.max_depth,
            executor.threads()
        );

        Ok(Self {
            settings: settings.clone(),
            resolution: (camera.res_x(), camera.res_y()),
            executor,
            iteration: 0,
            sum: 0.0,
            qp: 0.0,
            caches: None,
            stats: None,
        })
    }

    /// Completed iterations.
    pub fn iteration(&self) -> u32 {
        self.iteration
    }

    /// Mean of pool size / M over all iterations so far.
    pub fn virtual_cache_normalization(&self) -> f32 {
        self.qp
    }

    pub fn stats(&self) -> Option<&IterationStats> {
        self.stats.as_ref()
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// Run one iteration and return its estimate of the image.
    pub fn render(&mut self, scene: &Scene, camera: &Camera) -> RenderResult<ImageBuffer> {
        let (w, h) = (camera.res_x(), camera.res_y());
        if (w, h) != self.resolution {
            return Err(RenderError::ResolutionMismatch {
                expected: self.resolution,
                actual: (w, h),
            });
        }

        let start = Instant::now();
        self.iteration += 1;
        let iteration = self.iteration;
        let seed = self.settings.seed;
        let nc = self.settings.neighbor_caches;
        let max_depth = self.settings.max_depth;
        let m = self.settings.light_subpaths;
        let ns1 = camera.pixel_count();
        let executor = &self.executor;

        // Cache points
        let (aux_x, aux_y) = aux_resolution(w, h);
        let aux = camera.with_resolution(aux_x, aux_y);
        let previous = self.caches.take();
        let eye_paths = executor.map_2d(
            aux_x,
            aux_y,
            || Worker::new(nc),
            |worker, x, y| {
                let index = y as usize * aux_x as usize + x as usize;
                worker.rng = StdRng::seed_from_u64(stream_seed(seed, iteration, Phase::Caches, index));
                let Worker { rng, camera_path: z } = worker;
                z.construct(scene, &aux, x, y, rng, max_depth, previous.as_ref());

                let points: Vec<CachePoint> = (1..z.num_vertices())
                    .map(|v| {
                        let seed = previous
                            .as_ref()
                            .and_then(|prev| prev.seed_for(z[v].p(), z.neighbors(v)));
                        CachePoint::new(z[v], seed)
                    })
                    .collect();
                (points, z.num_vertices())
            },
        );
        let eye_vertices: usize = eye_paths.iter().map(|(_, n)| n).sum();
        let caches: Vec<CachePoint> = eye_paths.into_iter().flat_map(|(points, _)| points).collect();
        let mut cache_index = CacheIndex::new(caches);
        log::debug!(
            "Iteration {}: {} cache points from {}x{} eye sub-paths",
            iteration,
            cache_index.len(),
            aux_x,
            aux_y
        );

        // Light sub-paths, one per pixel
        let light_paths: Vec<LightPath> = executor.map_1d(
            ns1,
            || StdRng::seed_from_u64(0),
            |rng, i| {
                *rng = StdRng::seed_from_u64(stream_seed(seed, iteration, Phase::LightPaths, i));
                LightPath::construct(scene, rng, max_depth)
            },
        );
        let light_vertices: usize = light_paths.iter().map(LightPath::num_vertices).sum();

        // Candidate pool and resampling distributions
        let candidates = collect_candidates(&light_paths, m);
        cache_index.build_distributions(executor, scene, &light_paths, &candidates, m);
        log::debug!(
            "Iteration {}: {} light vertices, pool of {} candidates",
            iteration,
            light_vertices,
            candidates.len()
        );

        // Virtual cache
        self.sum += candidates.len() as f64 / m as f64;
        self.qp = (self.sum / iteration as f64) as f32;

        // Shading
        let estimator = Estimator {
            scene,
            camera,
            caches: &cache_index,
            light_paths: &light_paths,
            candidates: &candidates,
            mis: MisParams {
                m,
                qp: self.qp,
                ns1: ns1 as f32,
            },
            mis_threshold: self.settings.mis_threshold,
        };
        let samples: Vec<PixelSample> = self.executor.map_2d(
            w,
            h,
            || Worker::new(nc),
            |worker, x, y| {
                let index = y as usize * w as usize + x as usize;
                worker.rng = StdRng::seed_from_u64(stream_seed(seed, iteration, Phase::Shading, index));
                let Worker { rng, camera_path: z } = worker;
                z.construct(scene, camera, x, y, rng, max_depth, Some(&cache_index));
                estimator.radiance(&light_paths[index], z, rng)
            },
        );
        let image = compose_image(w, h, &samples, ns1);

        let stats = IterationStats {
            iteration,
            eye_paths: aux_x as usize * aux_y as usize,
            eye_vertices,
            caches: cache_index.len(),
            light_vertices,
            pool_size: candidates.len(),
            qp: self.qp,
            elapsed: start.elapsed(),
        };
        log::info!(
            "Iteration {} done in {:.2?}: {} caches, pool {}, Qp {:.4}",
            stats.iteration,
            stats.elapsed,
            stats.caches,
            stats.pool_size,
            stats.qp
        );
        self.stats = Some(stats);
        self.caches = Some(cache_index);

        Ok(image)
    }
}
