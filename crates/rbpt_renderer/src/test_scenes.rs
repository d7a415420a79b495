//! Small scenes shared by the unit tests.

use rbpt_core::load_scene_from_str;
use rbpt_math::Vec3;

use crate::camera::Camera;
use crate::material::{Color, DiffuseLight};
use crate::scene::{Scene, SceneBuilder};
use crate::triangle::quad;

pub const WALL_RADIANCE: Color = Color::new(2.0, 1.5, 1.0);

/// A 4x4 emitting wall at `z = -1` filling the view of a 90 degree camera
/// at the origin. Every eye ray hits the emitter directly.
pub fn emitter_wall(res: u32) -> (Scene, Camera) {
    let mut builder = SceneBuilder::new();
    let light = builder.add_material(DiffuseLight::new(WALL_RADIANCE));
    for tri in quad(Vec3::new(-2.0, -2.0, -1.0), Vec3::X * 4.0, Vec3::Y * 4.0, light) {
        builder.add_shape(tri);
    }
    let scene = builder.build().unwrap();
    let camera = Camera::new(Vec3::ZERO, Vec3::NEG_Z, Vec3::Y, 90.0, res, res);
    (scene, camera)
}

const CORNELL_BOX: &str = r#"{
    "name": "cornell_box",
    "camera": {
        "position": [0.0, 0.0, 3.5],
        "target": [0.0, 0.0, 0.0],
        "fovy": 40.0,
        "resolution": [8, 8]
    },
    "materials": [
        { "name": "white", "diffuse": [0.7, 0.7, 0.7] },
        { "name": "red", "diffuse": [0.65, 0.05, 0.05] },
        { "name": "green", "diffuse": [0.12, 0.45, 0.15] },
        { "name": "light", "emission": [8.0, 8.0, 8.0] }
    ],
    "shapes": [
        { "type": "quad", "corner": [-1, -1, 1], "edge_u": [2, 0, 0], "edge_v": [0, 0, -2], "material": "white" },
        { "type": "quad", "corner": [-1, 1, -1], "edge_u": [2, 0, 0], "edge_v": [0, 0, 2], "material": "white" },
        { "type": "quad", "corner": [-1, -1, -1], "edge_u": [2, 0, 0], "edge_v": [0, 2, 0], "material": "white" },
        { "type": "quad", "corner": [-1, -1, 1], "edge_u": [0, 0, -2], "edge_v": [0, 2, 0], "material": "red" },
        { "type": "quad", "corner": [1, -1, -1], "edge_u": [0, 0, 2], "edge_v": [0, 2, 0], "material": "green" },
        { "type": "quad", "corner": [-0.3, 0.99, -0.3], "edge_u": [0.6, 0, 0], "edge_v": [0, 0, 0.6], "material": "light" },
        { "type": "sphere", "center": [0.45, -0.6, -0.3], "radius": 0.35, "material": "white" }
    ]
}"#;

/// Cornell box, open toward the camera, with a small ceiling light, at
/// `res x res`.
pub fn cornell_box(res: u32) -> (Scene, Camera) {
    let desc = load_scene_from_str(CORNELL_BOX).unwrap();
    let scene = Scene::from_description(&desc).unwrap();
    let camera = Camera::from_description(&desc.camera).with_resolution(res, res);
    (scene, camera)
}
