//! The three estimator techniques and their balance-heuristic weights.
//!
//! * `0t`: the camera path reaches an emitter on its own.
//! * `s1`: light vertices connect to the lens and splat to the pixel they
//!   project to.
//! * `st`: a camera vertex resamples one light vertex from a nearby cache
//!   point (or uniformly from the pool, the virtual cache) and connects to it.

use rand::Rng;

use crate::cache::{Candidate, CacheIndex};
use crate::camera::Camera;
use crate::material::Color;
use crate::path::{CameraPath, Connection, LightPath, MisParams};
use crate::scene::Scene;

/// Light-tracing contribution to an arbitrary pixel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Splat {
    pub x: u32,
    pub y: u32,
    pub value: Color,
}

/// Result of shading one pixel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PixelSample {
    /// `0t + st` estimate of the pixel itself
    pub radiance: Color,
    /// `s1` contributions, scaled later by `1 / ns1`
    pub splats: Vec<Splat>,
}

/// Where a camera vertex resamples its light vertex from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResamplingOrigin {
    /// One of the vertex's neighbour-cache slots
    Cache(usize),
    /// Uniform over the whole candidate pool
    Virtual,
}

impl ResamplingOrigin {
    /// Uniform choice among `slots` caches and the virtual cache.
    pub fn choose(u: f32, slots: usize) -> Self {
        let slot = ((u * (slots + 1) as f32) as usize).min(slots);
        if slot == slots {
            ResamplingOrigin::Virtual
        } else {
            ResamplingOrigin::Cache(slot)
        }
    }
}

/// Read-only state of the shading pass of one iteration.
pub struct Estimator<'a> {
    pub scene: &'a Scene,
    pub camera: &'a Camera,
    pub caches: &'a CacheIndex,
    pub light_paths: &'a [LightPath],
    pub candidates: &'a [Candidate],
    pub mis: MisParams,
    /// Lower clamp on `Q / L` in the resampling weight
    pub mis_threshold: f32,
}

impl Estimator<'_> {
    /// Shade one pixel from its camera path `z` and its light path `y`.
    pub fn radiance(&self, y: &LightPath, z: &CameraPath, rng: &mut dyn rand::RngCore) -> PixelSample {
        let mut splats = Vec::new();
        self.calculate_s1(y, z, &mut splats);
        PixelSample {
            radiance: self.calculate_0t(y, z) + self.calculate_st(z, rng),
            splats,
        }
    }

    /// Unidirectional path tracing (`s = 0`).
    pub fn calculate_0t(&self, y: &LightPath, z: &CameraPath) -> Color {
        let t = z.num_vertices();
        if t < 2 {
            return Color::ZERO;
        }
        let last = &z[t - 1];
        if !last.emissive {
            return Color::ZERO;
        }

        let le = last.le(self.scene);
        let mis_weight =
            1.0 / (1.0 + CameraPath::mis_partial_weight(self.scene, y, 0, z, t, None, &self.mis));
        le * last.throughput * mis_weight
    }

    /// Light tracing (`t = 1`): connect every light vertex to the lens.
    pub fn calculate_s1(&self, y: &LightPath, z: &CameraPath, splats: &mut Vec<Splat>) {
        let z0 = &z[0];
        let ns1 = self.mis.ns1;

        for s in 1..=y.num_vertices() {
            let ys = &y[s - 1];
            let Some(conn) = Connection::between(ys, z0) else {
                continue;
            };
            let Some((x, py)) = self.camera.calc_intersection(z0.p(), &conn.zy) else {
                continue;
            };
            if !self.scene.visible(z0.p(), conn.zy.vector(), conn.dist) {
                continue;
            }

            let fyz = ys.f(self.scene, &conn.yz);
            let we = self.camera.we(&conn.zy);
            let light_pw = LightPath::mis_partial_weight(
                self.scene,
                self.camera,
                y,
                s,
                z,
                1,
                &conn,
                &self.mis,
            );
            let mis_weight = ns1 / (light_pw + ns1);
            let value = ys.throughput * fyz * (we * conn.geometry() / z0.pdf_fwd * mis_weight);
            if value != Color::ZERO {
                splats.push(Splat { x, y: py, value });
            }
        }
    }

    /// Resampled connections (`s >= 1, t >= 2`).
    pub fn calculate_st(&self, z: &CameraPath, rng: &mut dyn rand::RngCore) -> Color {
        let nc = z.neighbor_caches();
        let mut l = Color::ZERO;
        for t in 2..=z.num_vertices() {
            if z[t - 1].emissive {
                continue;
            }
            let origin = ResamplingOrigin::choose(rng.gen(), nc);
            l += self.resample_connection(z, t, origin, rng);
        }
        l
    }

    /// Resample a light vertex for camera vertex `z_{t-1}` from `origin`
    /// and connect to it. The origin's selection probability `1/(Nc+1)` is
    /// part of the estimate.
    pub fn resample_connection(
        &self,
        z: &CameraPath,
        t: usize,
        origin: ResamplingOrigin,
        rng: &mut dyn rand::RngCore,
    ) -> Color {
        let select = 1.0 / (z.neighbor_caches() + 1) as f32;
        let m = self.mis.m as f32;
        let zt = &z[t - 1];

        let (sample_idx, pmf) = match origin {
            ResamplingOrigin::Cache(slot) => {
                let Some(id) = z.neighbor_cache(t - 1, slot) else {
                    return Color::ZERO;
                };
                let cache = &self.caches[id];
                if cache.normalization_constant() == 0.0 {
                    return Color::ZERO;
                }
                match cache.sample(rng) {
                    Some(sample) => sample,
                    None => return Color::ZERO,
                }
            }
            ResamplingOrigin::Virtual => {
                if self.candidates.is_empty() {
                    return Color::ZERO;
                }
                let len = self.candidates.len();
                (rng.gen_range(0..len), 1.0 / len as f32)
            }
        };
        let pmf = pmf * select;

        let candidate = self.candidates[sample_idx];
        let y = &self.light_paths[candidate.path];
        let s = candidate.s();
        let ys = &y[s - 1];

        let Some(conn) = Connection::between(ys, zt) else {
            return Color::ZERO;
        };
        if !self.scene.visible(ys.p(), conn.yz.vector(), conn.dist) {
            return Color::ZERO;
        }

        let fyz = ys.f(self.scene, &conn.yz);
        let fzy = zt.f(self.scene, &conn.zy);
        let mis_weight = self.resampling_weight(y, s, z, t, &conn, sample_idx, origin);

        ys.throughput * fyz * fzy * zt.throughput * (conn.geometry() / (pmf * m) * mis_weight)
    }

    /// Clamped balance heuristic over the `Nc + 1` resampling origins of
    /// camera vertex `z_{t-1}`, against light tracing and path tracing.
    #[allow(clippy::too_many_arguments)]
    fn resampling_weight(
        &self,
        y: &LightPath,
        s: usize,
        z: &CameraPath,
        t: usize,
        conn: &Connection,
        sample_idx: usize,
        origin: ResamplingOrigin,
    ) -> f32 {
        let nc = z.neighbor_caches();
        let select = 1.0 / (nc + 1) as f32;
        let m = self.mis.m as f32;

        // Stays zero when the sampled cache gives the candidate no mass
        let mut val = 0.0;
        let mut sum_val = 0.0;
        for slot in 0..nc {
            let Some(id) = z.neighbor_cache(t - 1, slot) else {
                continue;
            };
            let cache = &self.caches[id];
            let l_i = cache.pmf(sample_idx) * cache.normalization_constant();
            if l_i > 0.0 {
                let v = select * m / ((m - 1.0) * self.mis_threshold.max(cache.q() / l_i) + 1.0);
                if origin == ResamplingOrigin::Cache(slot) {
                    val = v;
                }
                sum_val += v;
            }
        }
        let v = select * self.mis.resampling_count();
        if origin == ResamplingOrigin::Virtual {
            val = v;
        }
        sum_val += v;

        if val == 0.0 {
            return 0.0;
        }
        let light_pw = LightPath::mis_partial_weight(
            self.scene,
            self.camera,
            y,
            s,
            z,
            t,
            conn,
            &self.mis,
        );
        let camera_pw =
            CameraPath::mis_partial_weight(self.scene, y, s, z, t, Some(conn), &self.mis);
        val / (light_pw + sum_val + camera_pw)
    }
}
