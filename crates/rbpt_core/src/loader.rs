//! Scene loading.
//!
//! Scenes are JSON documents deserialized into [`SceneDescription`] and
//! validated before they reach the renderer, so the renderer can assume
//! every material reference resolves and every mesh index is in range.

use std::path::Path;

use thiserror::Error;

use crate::scene::{SceneDescription, ShapeDescription};

/// Errors that can occur during scene loading.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown material: {0}")]
    UnknownMaterial(String),

    #[error("Invalid mesh: {0}")]
    InvalidMesh(String),

    #[error("Invalid camera: {0}")]
    InvalidCamera(String),
}

/// Result type for loading operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// Load and validate a JSON scene file.
///
/// The scene name defaults to the file stem when the document has none.
pub fn load_scene<P: AsRef<Path>>(path: P) -> LoadResult<SceneDescription> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    let mut scene = load_scene_from_str(&text)?;
    if scene.name.is_empty() {
        scene.name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unnamed")
            .to_string();
    }
    log::info!(
        "Loaded scene '{}': {} shapes ({} emitters), {} materials",
        scene.name,
        scene.shapes.len(),
        scene.emitter_count(),
        scene.materials.len()
    );
    Ok(scene)
}

/// Parse and validate a scene from a JSON string.
pub fn load_scene_from_str(text: &str) -> LoadResult<SceneDescription> {
    let scene: SceneDescription = serde_json::from_str(text)?;
    validate(&scene)?;
    Ok(scene)
}

fn validate(scene: &SceneDescription) -> LoadResult<()> {
    let [w, h] = scene.camera.resolution;
    if w == 0 || h == 0 {
        return Err(LoadError::InvalidCamera(format!("resolution {}x{}", w, h)));
    }
    if !(scene.camera.fovy > 0.0 && scene.camera.fovy < 180.0) {
        return Err(LoadError::InvalidCamera(format!("fovy {}", scene.camera.fovy)));
    }
    if scene.camera.lens_radius < 0.0 || scene.camera.focus_distance <= 0.0 {
        return Err(LoadError::InvalidCamera("negative lens radius or focus distance".into()));
    }

    for shape in &scene.shapes {
        if scene.material_index(shape.material()).is_none() {
            return Err(LoadError::UnknownMaterial(shape.material().to_string()));
        }
        if let ShapeDescription::Mesh { positions, indices, .. } = shape {
            if indices.len() % 3 != 0 {
                return Err(LoadError::InvalidMesh(format!(
                    "index count {} is not a multiple of 3",
                    indices.len()
                )));
            }
            if let Some(&bad) = indices.iter().find(|&&i| i as usize >= positions.len()) {
                return Err(LoadError::InvalidMesh(format!(
                    "index {} out of range for {} positions",
                    bad,
                    positions.len()
                )));
            }
        }
    }

    if scene.emitter_count() == 0 {
        log::warn!("Scene '{}' has no emissive shapes; it will render black", scene.name);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENE: &str = r#"{
        "camera": { "position": [0, 0, 3], "target": [0, 0, 0], "resolution": [32, 24] },
        "materials": [
            { "name": "grey", "diffuse": [0.5, 0.5, 0.5] },
            { "name": "light", "emission": [5, 5, 5] }
        ],
        "shapes": [
            { "type": "sphere", "center": [0, 0, 0], "radius": 1, "material": "grey" },
            { "type": "quad", "corner": [-1, 2, -1], "edge_u": [0, 0, 2], "edge_v": [2, 0, 0], "material": "light" }
        ],
        "settings": { "light_subpaths": 128 }
    }"#;

    #[test]
    fn test_load_valid_scene() {
        let _ = env_logger::builder().is_test(true).try_init();
        let scene = load_scene_from_str(SCENE).unwrap();
        assert_eq!(scene.shapes.len(), 2);
        assert_eq!(scene.emitter_count(), 1);
        assert_eq!(scene.triangle_count(), 2);
        assert_eq!(scene.settings.light_subpaths, 128);
        assert_eq!(scene.camera.up, [0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_unknown_material() {
        let text = SCENE.replace(r#""material": "grey""#, r#""material": "chrome""#);
        let err = load_scene_from_str(&text).unwrap_err();
        assert!(matches!(err, LoadError::UnknownMaterial(name) if name == "chrome"));
    }

    #[test]
    fn test_mesh_index_out_of_range() {
        let text = r#"{
            "camera": { "position": [0, 0, 3], "target": [0, 0, 0], "resolution": [8, 8] },
            "materials": [ { "name": "grey" } ],
            "shapes": [ { "type": "mesh", "positions": [[0,0,0],[1,0,0],[0,1,0]], "indices": [0, 1, 3], "material": "grey" } ]
        }"#;
        assert!(matches!(load_scene_from_str(text), Err(LoadError::InvalidMesh(_))));
    }

    #[test]
    fn test_zero_resolution() {
        let text = SCENE.replace("[32, 24]", "[0, 24]");
        assert!(matches!(load_scene_from_str(&text), Err(LoadError::InvalidCamera(_))));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(load_scene("does/not/exist.json"), Err(LoadError::Io(_))));
    }
}
