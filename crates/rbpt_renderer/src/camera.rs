//! Pinhole / thin-lens camera with importance evaluation.
//!
//! The image plane sits at distance 1 in front of the lens; `pixel_area` is
//! the area of one pixel on that plane. With this normalization the
//! throughput of the first surface vertex of a camera path is exactly one.

use rbpt_core::CameraDescription;
use rbpt_math::{Direction, Vec2, Vec3};
use std::f32::consts::PI;

use crate::sampling::sample_disk_concentric;

/// Camera for generating and projecting rays.
#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    // Image settings
    res_x: u32,
    res_y: u32,

    // Camera positioning
    position: Vec3,
    target: Vec3,
    vup: Vec3,

    // Lens settings
    fovy: f32,           // Vertical field of view in degrees
    lens_radius: f32,    // Zero for a pinhole
    focus_distance: f32, // Distance from camera to plane of perfect focus

    // Cached values (set by initialize())
    forward: Vec3,
    right: Vec3,
    up: Vec3,
    half_width: f32,
    half_height: f32,
    pixel_area: f32,
    lens_area: f32,
}

impl Camera {
    /// Create a pinhole camera.
    pub fn new(position: Vec3, target: Vec3, vup: Vec3, fovy: f32, res_x: u32, res_y: u32) -> Self {
        let mut camera = Self {
            res_x,
            res_y,
            position,
            target,
            vup,
            fovy,
            lens_radius: 0.0,
            focus_distance: 1.0,
            forward: Vec3::NEG_Z,
            right: Vec3::X,
            up: Vec3::Y,
            half_width: 1.0,
            half_height: 1.0,
            pixel_area: 1.0,
            lens_area: 1.0,
        };
        camera.initialize();
        camera
    }

    pub fn from_description(desc: &CameraDescription) -> Self {
        Self::new(
            Vec3::from(desc.position),
            Vec3::from(desc.target),
            Vec3::from(desc.up),
            desc.fovy,
            desc.resolution[0],
            desc.resolution[1],
        )
        .with_lens(desc.lens_radius, desc.focus_distance)
    }

    /// Set lens settings.
    pub fn with_lens(mut self, lens_radius: f32, focus_distance: f32) -> Self {
        self.lens_radius = lens_radius.max(0.0);
        self.focus_distance = focus_distance;
        self.initialize();
        self
    }

    /// Same camera with another image resolution.
    pub fn with_resolution(&self, res_x: u32, res_y: u32) -> Self {
        let mut camera = self.clone();
        camera.res_x = res_x;
        camera.res_y = res_y;
        camera.initialize();
        camera
    }

    fn initialize(&mut self) {
        self.forward = (self.target - self.position).normalize();
        self.right = self.forward.cross(self.vup).normalize();
        self.up = self.right.cross(self.forward);

        self.half_height = (self.fovy.to_radians() / 2.0).tan();
        self.half_width = self.half_height * self.res_x as f32 / self.res_y as f32;
        self.pixel_area = (2.0 * self.half_width / self.res_x as f32)
            * (2.0 * self.half_height / self.res_y as f32);
        self.lens_area = if self.lens_radius > 0.0 {
            PI * self.lens_radius * self.lens_radius
        } else {
            1.0
        };
    }

    pub fn res_x(&self) -> u32 {
        self.res_x
    }

    pub fn res_y(&self) -> u32 {
        self.res_y
    }

    pub fn pixel_count(&self) -> usize {
        self.res_x as usize * self.res_y as usize
    }

    /// Lens center.
    pub fn p(&self) -> Vec3 {
        self.position
    }

    /// Viewing direction (unit), also the lens normal.
    pub fn d(&self) -> Vec3 {
        self.forward
    }

    pub fn fovy(&self) -> f32 {
        self.fovy
    }

    pub fn lens_radius(&self) -> f32 {
        self.lens_radius
    }

    pub fn focus_distance(&self) -> f32 {
        self.focus_distance
    }

    /// Area density of `sample_lens`.
    pub fn lens_pdf(&self) -> f32 {
        1.0 / self.lens_area
    }

    /// Uniform point on the lens (the lens center for a pinhole).
    pub fn sample_lens(&self, u: Vec2) -> Vec3 {
        if self.lens_radius <= 0.0 {
            return self.position;
        }
        let d = sample_disk_concentric(u) * self.lens_radius;
        self.position + d.x * self.right + d.y * self.up
    }

    /// Direction from `lens_point` through a uniform point of pixel `(x, y)`.
    /// Row 0 is the top of the image.
    pub fn generate_direction(&self, lens_point: Vec3, x: u32, y: u32, u: Vec2) -> Vec3 {
        let sx = ((x as f32 + u.x) / self.res_x as f32 * 2.0 - 1.0) * self.half_width;
        let sy = (1.0 - (y as f32 + u.y) / self.res_y as f32 * 2.0) * self.half_height;
        let through_center = self.forward + sx * self.right + sy * self.up;
        if self.lens_radius <= 0.0 {
            return through_center.normalize();
        }
        let focus = self.position + through_center * self.focus_distance;
        (focus - lens_point).normalize()
    }

    /// Solid-angle density of `generate_direction` within one pixel.
    /// `dir` is measured against the lens normal.
    pub fn pdf_direction(&self, dir: &Direction) -> f32 {
        let cos = dir.cos();
        if cos <= 0.0 {
            return 0.0;
        }
        1.0 / (self.pixel_area * cos * cos * cos)
    }

    /// Importance emitted along `dir`, normalized so that it integrates
    /// to one over a pixel and the lens.
    pub fn we(&self, dir: &Direction) -> f32 {
        let cos = dir.cos();
        if cos <= 0.0 {
            return 0.0;
        }
        let cos2 = cos * cos;
        1.0 / (self.pixel_area * self.lens_area * cos2 * cos2)
    }

    /// Pixel hit by the ray leaving `lens_point` along `dir`, if on screen.
    pub fn calc_intersection(&self, lens_point: Vec3, dir: &Direction) -> Option<(u32, u32)> {
        let v = dir.vector();
        let cos = v.dot(self.forward);
        if cos <= 0.0 {
            return None;
        }

        // Through the focus plane, then back through the lens center
        let q = if self.lens_radius <= 0.0 {
            v
        } else {
            lens_point + v * (self.focus_distance / cos) - self.position
        };
        let qz = q.dot(self.forward);
        if qz <= 0.0 {
            return None;
        }
        let sx = q.dot(self.right) / qz;
        let sy = q.dot(self.up) / qz;

        let fx = (sx / self.half_width + 1.0) * 0.5 * self.res_x as f32;
        let fy = (1.0 - sy / self.half_height) * 0.5 * self.res_y as f32;
        if !(fx >= 0.0 && fy >= 0.0 && fx < self.res_x as f32 && fy < self.res_y as f32) {
            return None;
        }
        Some(((fx as u32).min(self.res_x - 1), (fy as u32).min(self.res_y - 1)))
    }
}
