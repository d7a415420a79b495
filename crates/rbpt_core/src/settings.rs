//! Render settings for the progressive estimator.

use serde::{Deserialize, Serialize};

/// Settings shared by the renderer and the command-line front end.
///
/// Every field has a default, so a scene file may specify only the
/// values it wants to change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Number of light sub-paths sub-sampled into the candidate pool (`M`).
    /// Must satisfy `1 <= M <= width * height`.
    pub light_subpaths: usize,

    /// Worker threads used by every parallel phase.
    pub threads: usize,

    /// Nearest cache points tracked per camera-path vertex (`Nc`).
    pub neighbor_caches: usize,

    /// Maximum number of surface vertices per sub-path (excluding the
    /// lens vertex of camera paths).
    pub max_depth: usize,

    /// Lower clamp on `Q / L` in the resampling weight.
    pub mis_threshold: f32,

    /// Base seed of the per-task random streams.
    pub seed: u64,

    /// Number of `render` calls the front end averages.
    pub iterations: u32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            light_subpaths: 1024,
            threads: default_threads(),
            neighbor_caches: 4,
            max_depth: 8,
            mis_threshold: 0.01,
            seed: 0,
            iterations: 16,
        }
    }
}

fn default_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_settings_use_defaults() {
        let settings: RenderSettings =
            serde_json::from_str(r#"{ "light_subpaths": 64, "neighbor_caches": 0 }"#).unwrap();
        assert_eq!(settings.light_subpaths, 64);
        assert_eq!(settings.neighbor_caches, 0);
        assert_eq!(settings.max_depth, RenderSettings::default().max_depth);
        assert!(settings.threads >= 1);
    }
}
