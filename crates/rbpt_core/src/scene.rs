//! Scene description types.
//!
//! This module defines the renderer-agnostic scene representation that is
//! loaded from JSON and turned into acceleration structures by the renderer.

use rbpt_math::Vec3;
use serde::{Deserialize, Serialize};

use crate::settings::RenderSettings;

/// A material definition.
///
/// A material is either a diffuse reflector or a diffuse emitter; a
/// non-zero `emission` makes it a light source.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MaterialDescription {
    /// Material name, referenced by shapes
    pub name: String,

    /// Diffuse albedo (RGB, 0-1)
    #[serde(default = "default_diffuse")]
    pub diffuse: [f32; 3],

    /// Emitted radiance (RGB, for light-emitting surfaces)
    #[serde(default)]
    pub emission: [f32; 3],
}

fn default_diffuse() -> [f32; 3] {
    [0.5, 0.5, 0.5]
}

impl MaterialDescription {
    /// Create a diffuse material.
    pub fn diffuse(name: impl Into<String>, albedo: Vec3) -> Self {
        Self {
            name: name.into(),
            diffuse: albedo.to_array(),
            emission: [0.0; 3],
        }
    }

    /// Create an emissive material.
    pub fn emitter(name: impl Into<String>, radiance: Vec3) -> Self {
        Self {
            name: name.into(),
            diffuse: [0.0; 3],
            emission: radiance.to_array(),
        }
    }

    pub fn is_emissive(&self) -> bool {
        Vec3::from(self.emission).max_element() > 0.0
    }
}

/// Geometry, referencing its material by name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ShapeDescription {
    Sphere {
        center: [f32; 3],
        radius: f32,
        material: String,
    },
    /// Parallelogram spanned by `edge_u` and `edge_v`; its front face
    /// (the emitting side of a light) is `edge_u x edge_v`.
    Quad {
        corner: [f32; 3],
        edge_u: [f32; 3],
        edge_v: [f32; 3],
        material: String,
    },
    /// Indexed triangle mesh (every 3 indices form a triangle).
    Mesh {
        positions: Vec<[f32; 3]>,
        indices: Vec<u32>,
        material: String,
    },
}

impl ShapeDescription {
    pub fn material(&self) -> &str {
        match self {
            ShapeDescription::Sphere { material, .. }
            | ShapeDescription::Quad { material, .. }
            | ShapeDescription::Mesh { material, .. } => material,
        }
    }
}

/// Pinhole / thin-lens camera.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraDescription {
    pub position: [f32; 3],
    pub target: [f32; 3],
    #[serde(default = "default_up")]
    pub up: [f32; 3],
    /// Vertical field of view in degrees
    #[serde(default = "default_fovy")]
    pub fovy: f32,
    /// Image resolution `[width, height]`
    pub resolution: [u32; 2],
    #[serde(default)]
    pub lens_radius: f32,
    #[serde(default = "default_focus_distance")]
    pub focus_distance: f32,
}

fn default_up() -> [f32; 3] {
    [0.0, 1.0, 0.0]
}

fn default_fovy() -> f32 {
    40.0
}

fn default_focus_distance() -> f32 {
    1.0
}

/// A complete scene: camera, materials, shapes and optional settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SceneDescription {
    /// Scene name (usually from filename)
    #[serde(default)]
    pub name: String,

    pub camera: CameraDescription,

    pub materials: Vec<MaterialDescription>,

    pub shapes: Vec<ShapeDescription>,

    #[serde(default)]
    pub settings: RenderSettings,
}

impl SceneDescription {
    /// Get a material index by name.
    pub fn material_index(&self, name: &str) -> Option<usize> {
        self.materials.iter().position(|m| m.name == name)
    }

    /// Number of shapes whose material emits light.
    pub fn emitter_count(&self) -> usize {
        self.shapes
            .iter()
            .filter(|s| {
                self.material_index(s.material())
                    .map(|i| self.materials[i].is_emissive())
                    .unwrap_or(false)
            })
            .count()
    }

    /// Total triangle count of all mesh shapes (quads count as two).
    pub fn triangle_count(&self) -> usize {
        self.shapes
            .iter()
            .map(|s| match s {
                ShapeDescription::Sphere { .. } => 0,
                ShapeDescription::Quad { .. } => 2,
                ShapeDescription::Mesh { indices, .. } => indices.len() / 3,
            })
            .sum()
    }
}
