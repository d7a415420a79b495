//! Camera and light sub-paths.
//!
//! Every vertex carries the area density with which its own sub-path
//! generated it (`pdf_fwd`) and the area density with which the opposite
//! sub-path would have generated it (`pdf_rev`). The reverse densities of
//! the two vertices nearest a connection depend on the connection itself and
//! are recomputed by the partial-weight functions.

use std::ops::Index;

use rand::Rng;
use rbpt_math::{segment, Direction, Frame, Ray, Vec2, Vec3};

use crate::cache::CacheIndex;
use crate::camera::Camera;
use crate::material::{emission_pdf, Color, Intersection, MaterialId};
use crate::sampling::sample_cosine_hemisphere;
use crate::scene::Scene;

/// Scattering behaviour bound to a path vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Brdf {
    /// Lens vertex of a camera path
    Lens,
    /// Origin of a light path; unit directional profile over the upper
    /// hemisphere, sampled with density `cos / pi`
    Emission,
    /// Surface scattering through a scene material
    Surface(MaterialId),
}

#[derive(Debug, Clone, Copy)]
pub struct PathVertex {
    pub isect: Intersection,
    pub brdf: Brdf,
    /// The surface material emits light
    pub emissive: bool,
    /// Unit direction towards the previous vertex (zero at path origins)
    pub wo: Vec3,
    /// Light paths: `Le` over the path density so far.
    /// Camera paths: `We` over the path density so far.
    pub throughput: Color,
    pub pdf_fwd: f32,
    pub pdf_rev: f32,
}

impl PathVertex {
    pub fn p(&self) -> Vec3 {
        self.isect.p
    }

    /// BRDF value for continuing along `wi` from this vertex.
    pub fn f(&self, scene: &Scene, wi: &Direction) -> Color {
        match self.brdf {
            Brdf::Lens => Color::ZERO,
            Brdf::Emission => {
                if wi.in_lower_hemisphere() {
                    Color::ZERO
                } else {
                    Color::ONE
                }
            }
            Brdf::Surface(m) => scene.material(m).f(&self.isect, wi.vector(), self.wo),
        }
    }

    /// Solid-angle density of continuing along `wi`.
    pub fn pdf(&self, scene: &Scene, wi: Vec3) -> f32 {
        match self.brdf {
            Brdf::Lens => 0.0,
            Brdf::Emission => emission_pdf(self.isect.n, wi),
            Brdf::Surface(m) => scene.material(m).pdf(&self.isect, wi, self.wo),
        }
    }

    /// Solid-angle density of leaving towards `wo` when arriving from `from`.
    pub fn pdf_reversed(&self, scene: &Scene, from: Vec3) -> f32 {
        match self.brdf {
            Brdf::Surface(m) => scene.material(m).pdf(&self.isect, self.wo, from),
            _ => 0.0,
        }
    }

    /// Radiance emitted back along `wo`.
    pub fn le(&self, scene: &Scene) -> Color {
        match self.brdf {
            Brdf::Surface(m) if self.emissive => scene
                .material(m)
                .le(&self.isect, &Direction::new(self.wo, self.isect.n)),
            _ => Color::ZERO,
        }
    }
}

/// Convert a solid-angle density at `from` into an area density at `to`.
fn to_area(pdf_solid: f32, from: Vec3, to: &PathVertex) -> f32 {
    let (dir, _, dist2) = segment(from, to.p());
    let pdf = pdf_solid * dir.dot(to.isect.n).abs() / dist2;
    if pdf.is_finite() {
        pdf
    } else {
        0.0
    }
}

#[inline]
fn density_ratio(rev: f32, fwd: f32) -> f32 {
    if fwd > 0.0 {
        rev / fwd
    } else {
        0.0
    }
}

/// Extend `vertices` by a random walk starting from the last vertex along
/// `dir`, until the walk escapes, reaches an emitter, is absorbed or holds
/// `max_vertices` vertices.
fn random_walk(
    scene: &Scene,
    rng: &mut dyn rand::RngCore,
    vertices: &mut Vec<PathVertex>,
    mut dir: Vec3,
    mut pdf_solid: f32,
    mut throughput: Color,
    max_vertices: usize,
) {
    while vertices.len() < max_vertices {
        let Some(origin) = vertices.last().map(PathVertex::p) else {
            return;
        };
        let Some(hit) = scene.closest_hit(&Ray::new(origin, dir)) else {
            return;
        };
        let isect = hit.intersection();
        let material = scene.material(hit.material);
        let wo = -dir;

        let mut vertex = PathVertex {
            isect,
            brdf: Brdf::Surface(hit.material),
            emissive: material.is_emissive(),
            wo,
            throughput,
            pdf_fwd: 0.0,
            pdf_rev: 0.0,
        };
        vertex.pdf_fwd = to_area(pdf_solid, origin, &vertex);
        vertices.push(vertex);

        if vertex.emissive || vertices.len() >= max_vertices {
            return;
        }

        let Some(wi) = material.sample(&isect, wo, rng) else {
            return;
        };
        let f = material.f(&isect, wi, wo);
        let pdf = material.pdf(&isect, wi, wo);
        if pdf <= 0.0 || f == Color::ZERO {
            return;
        }

        let n = vertices.len();
        let rev = to_area(material.pdf(&isect, wo, wi), isect.p, &vertices[n - 2]);
        vertices[n - 2].pdf_rev = rev;

        throughput *= f * (wi.dot(isect.n).abs() / pdf);
        dir = wi;
        pdf_solid = pdf;
    }
}

/// Geometry of a connection between light vertex `y` and camera vertex `z`.
#[derive(Debug, Clone, Copy)]
pub struct Connection {
    /// From `y` towards `z`, measured against `y`'s normal
    pub yz: Direction,
    /// From `z` towards `y`, measured against `z`'s normal
    pub zy: Direction,
    pub dist: f32,
    pub dist2: f32,
}

impl Connection {
    /// `None` when the segment is degenerate or leaves either surface
    /// through its lower hemisphere.
    pub fn between(y: &PathVertex, z: &PathVertex) -> Option<Self> {
        let (dir, dist, dist2) = segment(y.p(), z.p());
        let yz = Direction::new(dir, y.isect.n);
        if yz.is_invalid() || yz.in_lower_hemisphere() {
            return None;
        }
        let zy = yz.reversed(z.isect.n);
        if zy.is_invalid() || zy.in_lower_hemisphere() {
            return None;
        }
        Some(Self { yz, zy, dist, dist2 })
    }

    /// Geometric term `|cos_y| |cos_z| / d^2`.
    pub fn geometry(&self) -> f32 {
        self.yz.abs_cos() * self.zy.abs_cos() / self.dist2
    }
}

/// Per-iteration constants of the balance heuristic.
#[derive(Debug, Clone, Copy)]
pub struct MisParams {
    /// Light sub-paths in the candidate pool
    pub m: usize,
    /// Virtual-cache normalization factor
    pub qp: f32,
    /// Light-tracing samples per iteration (the pixel count)
    pub ns1: f32,
}

impl MisParams {
    /// Effective sample count of one resampling technique, as seen through
    /// the virtual cache.
    pub fn resampling_count(&self) -> f32 {
        let m = self.m as f32;
        m / ((m - 1.0) * self.qp + 1.0)
    }
}

/// Light sub-path `y_0 .. y_{n-1}`; `y_0` lies on an emitter.
#[derive(Debug, Clone, Default)]
pub struct LightPath {
    vertices: Vec<PathVertex>,
}

impl LightPath {
    /// Trace a light sub-path from a point sampled on the emitters.
    ///
    /// No cache index is taken: light vertices never resample, and the
    /// partial weights count the resampling techniques in closed form.
    pub fn construct(scene: &Scene, rng: &mut dyn rand::RngCore, max_depth: usize) -> Self {
        let mut vertices = Vec::new();
        let Some(sample) = scene.sample_light(rng) else {
            return Self { vertices };
        };
        let throughput = scene.light_radiance(&sample) / sample.pdf_area;
        vertices.push(PathVertex {
            isect: sample.isect,
            brdf: Brdf::Emission,
            emissive: true,
            wo: Vec3::ZERO,
            throughput,
            pdf_fwd: sample.pdf_area,
            pdf_rev: 0.0,
        });

        let n = sample.isect.n;
        let local = sample_cosine_hemisphere(Vec2::new(rng.gen(), rng.gen()));
        let dir = Frame::from_normal(n).from_local(local).normalize();
        let pdf = emission_pdf(n, dir);
        if pdf > 0.0 {
            let throughput = throughput * (dir.dot(n) / pdf);
            random_walk(scene, rng, &mut vertices, dir, pdf, throughput, max_depth);
        }
        Self { vertices }
    }

    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn vertices(&self) -> &[PathVertex] {
        &self.vertices
    }

    /// Balance-heuristic mass of the techniques that move light vertices
    /// `y_{s-1} .. y_0` to the camera side, relative to strategy `(s, t)`.
    #[allow(clippy::too_many_arguments)]
    pub fn mis_partial_weight(
        scene: &Scene,
        camera: &Camera,
        y: &LightPath,
        s: usize,
        z: &CameraPath,
        t: usize,
        conn: &Connection,
        params: &MisParams,
    ) -> f32 {
        let mut sum = 0.0;
        let mut ratio = 1.0;
        for i in (0..s).rev() {
            let rev = if i == s - 1 {
                let solid = if t >= 2 {
                    z[t - 1].pdf(scene, conn.zy.vector())
                } else {
                    camera.pdf_direction(&conn.zy)
                };
                solid * conn.yz.abs_cos() / conn.dist2
            } else if i == s - 2 {
                let ys = &y[s - 1];
                to_area(ys.pdf_reversed(scene, conn.yz.vector()), ys.p(), &y[i])
            } else {
                y[i].pdf_rev
            };
            ratio *= density_ratio(rev, y[i].pdf_fwd);

            // y_i becomes the connecting camera vertex of strategy (i, .)
            let count = if i == 0 {
                1.0
            } else if y[i].emissive {
                0.0
            } else {
                params.resampling_count()
            };
            sum += count * ratio;
        }
        sum
    }
}

impl Index<usize> for LightPath {
    type Output = PathVertex;

    fn index(&self, i: usize) -> &PathVertex {
        &self.vertices[i]
    }
}

/// Camera sub-path `z_0 .. z_{n-1}`; `z_0` is the lens.
///
/// Reused across pixels by a worker. Each vertex also records up to `Nc`
/// nearest cache points, stored flat with stride `Nc`.
#[derive(Debug, Clone, Default)]
pub struct CameraPath {
    vertices: Vec<PathVertex>,
    neighbors: Vec<Option<usize>>,
    neighbor_caches: usize,
}

impl CameraPath {
    pub fn new(neighbor_caches: usize) -> Self {
        Self {
            vertices: Vec::new(),
            neighbors: Vec::new(),
            neighbor_caches,
        }
    }

    /// Trace a new path through pixel `(x, y)`, replacing the previous one.
    ///
    /// With `caches`, every vertex past the lens looks up its nearest cache
    /// points; missing slots stay `None`.
    #[allow(clippy::too_many_arguments)]
    pub fn construct(
        &mut self,
        scene: &Scene,
        camera: &Camera,
        x: u32,
        y: u32,
        rng: &mut dyn rand::RngCore,
        max_depth: usize,
        caches: Option<&CacheIndex>,
    ) {
        self.vertices.clear();
        self.neighbors.clear();

        let lens = camera.sample_lens(Vec2::new(rng.gen(), rng.gen()));
        self.vertices.push(PathVertex {
            isect: Intersection {
                p: lens,
                n: camera.d(),
                front_face: true,
            },
            brdf: Brdf::Lens,
            emissive: false,
            wo: Vec3::ZERO,
            throughput: Color::ONE,
            pdf_fwd: camera.lens_pdf(),
            pdf_rev: 0.0,
        });

        let dir = camera.generate_direction(lens, x, y, Vec2::new(rng.gen(), rng.gen()));
        let pdf = camera.pdf_direction(&Direction::new(dir, camera.d()));
        if pdf > 0.0 {
            // We * cos / (pdf_dir * pdf_lens) == 1
            random_walk(scene, rng, &mut self.vertices, dir, pdf, Color::ONE, max_depth + 1);
        }

        let nc = self.neighbor_caches;
        self.neighbors.resize(self.vertices.len() * nc, None);
        if let Some(caches) = caches {
            for (v, vertex) in self.vertices.iter().enumerate().skip(1) {
                for (slot, id) in caches.k_nearest(vertex.p(), nc).into_iter().enumerate() {
                    self.neighbors[v * nc + slot] = Some(id);
                }
            }
        }
    }

    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn vertices(&self) -> &[PathVertex] {
        &self.vertices
    }

    pub fn neighbor_caches(&self) -> usize {
        self.neighbor_caches
    }

    /// Cache in `slot` of vertex `v`, if the index had enough points.
    pub fn neighbor_cache(&self, v: usize, slot: usize) -> Option<usize> {
        self.neighbors
            .get(v * self.neighbor_caches + slot)
            .copied()
            .flatten()
    }

    /// Occupied neighbour slots of vertex `v`.
    pub fn neighbors(&self, v: usize) -> impl Iterator<Item = usize> + '_ {
        (0..self.neighbor_caches).filter_map(move |slot| self.neighbor_cache(v, slot))
    }

    /// Balance-heuristic mass of the techniques that move camera vertices
    /// `z_{t-1} .. z_1` to the light side, relative to strategy `(s, t)`.
    ///
    /// `conn` is `None` for `s = 0`, where `z_{t-1}` lies on an emitter.
    pub fn mis_partial_weight(
        scene: &Scene,
        y: &LightPath,
        s: usize,
        z: &CameraPath,
        t: usize,
        conn: Option<&Connection>,
        params: &MisParams,
    ) -> f32 {
        let mut sum = 0.0;
        let mut ratio = 1.0;
        for i in (1..t).rev() {
            let rev = if i == t - 1 {
                match conn {
                    Some(c) if s >= 1 => y[s - 1].pdf(scene, c.yz.vector()) * c.zy.abs_cos() / c.dist2,
                    _ => scene.light_pdf_area(&z[t - 1].isect),
                }
            } else if i == t - 2 {
                let zt = &z[t - 1];
                let solid = match conn {
                    Some(c) if s >= 1 => zt.pdf_reversed(scene, c.zy.vector()),
                    _ => emission_pdf(zt.isect.n, zt.wo),
                };
                to_area(solid, zt.p(), &z[i])
            } else {
                z[i].pdf_rev
            };
            ratio *= density_ratio(rev, z[i].pdf_fwd);

            // z_{i-1} becomes the connecting camera vertex of strategy (., i)
            let count = if i == 1 {
                params.ns1
            } else if z[i - 1].emissive {
                0.0
            } else {
                params.resampling_count()
            };
            sum += count * ratio;
        }
        sum
    }
}

impl Index<usize> for CameraPath {
    type Output = PathVertex;

    fn index(&self, i: usize) -> &PathVertex {
        &self.vertices[i]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_scenes;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_camera_path_hits_emitter_wall() {
        let (scene, camera) = test_scenes::emitter_wall(16);
        let mut rng = StdRng::seed_from_u64(1);
        let mut z = CameraPath::new(2);
        z.construct(&scene, &camera, 3, 5, &mut rng, 8, None);

        assert_eq!(z.num_vertices(), 2);
        assert!(z[1].emissive);
        assert!((z[1].throughput - Color::ONE).length() < 1e-5);
        assert_eq!(z.neighbor_cache(1, 0), None);
        assert!((z[1].le(&scene) - test_scenes::WALL_RADIANCE).length() < 1e-5);
    }

    #[test]
    fn test_light_path_starts_on_emitter() {
        let (scene, _) = test_scenes::cornell_box(16);
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..64 {
            let y = LightPath::construct(&scene, &mut rng, 6);
            assert!(y.num_vertices() >= 1 && y.num_vertices() <= 6);
            assert_eq!(y[0].brdf, Brdf::Emission);
            assert!((y[0].pdf_fwd - 1.0 / scene.light_area()).abs() < 1e-6);
            // Only the last vertex may land on an emitter
            for v in &y.vertices()[1..y.num_vertices().saturating_sub(1).max(1)] {
                assert!(!v.emissive);
            }
        }
    }

    #[test]
    fn test_depth_limit() {
        let (scene, camera) = test_scenes::cornell_box(16);
        let mut rng = StdRng::seed_from_u64(3);
        let mut z = CameraPath::new(0);
        for _ in 0..32 {
            z.construct(&scene, &camera, 8, 8, &mut rng, 3, None);
            assert!(z.num_vertices() <= 4);
        }
    }

    #[test]
    fn test_direct_connection_weights_sum_to_one() {
        // On the emitter wall, the path lens -> wall is produced by the
        // unidirectional technique (s=0, t=2) and by light tracing (s=1, t=1).
        let (scene, camera) = test_scenes::emitter_wall(16);
        let params = MisParams {
            m: 64,
            qp: 1.0,
            ns1: camera.pixel_count() as f32,
        };
        let mut rng = StdRng::seed_from_u64(4);
        let mut z = CameraPath::new(0);
        z.construct(&scene, &camera, 7, 9, &mut rng, 8, None);
        assert_eq!(z.num_vertices(), 2);

        // Light path that starts at the camera path's hit point
        let mut y = LightPath::construct(&scene, &mut rng, 8);
        y.vertices.truncate(1);
        y.vertices[0].isect.p = z[1].p();

        let w_0t = 1.0
            / (1.0
                + CameraPath::mis_partial_weight(&scene, &y, 0, &z, 2, None, &params));

        let conn = Connection::between(&y[0], &z[0]).unwrap();
        let light_pw =
            LightPath::mis_partial_weight(&scene, &camera, &y, 1, &z, 1, &conn, &params);
        let w_s1 = params.ns1 / (light_pw + params.ns1);

        assert!((w_0t + w_s1 - 1.0).abs() < 1e-3, "{} + {}", w_0t, w_s1);
        assert!(w_0t > 0.0 && w_s1 > 0.0);
    }
}
