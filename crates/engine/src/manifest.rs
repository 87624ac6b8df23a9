//! The JSON result manifest the analyze kind writes via `--output`.

use std::path::Path;

use serde::Deserialize;

/// Errors reading the analyze manifest.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("Failed to read manifest: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid manifest JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Parsed analyze output.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalysisManifest {
    /// Mean reconstruction, one entry per domain across subjects.
    #[serde(default)]
    pub mean: MeanShapes,
    /// Principal modes of variation.
    #[serde(default)]
    pub modes: Vec<ModeEntry>,
    /// Chart payloads passed through to the stored analysis untouched.
    #[serde(default)]
    pub charts: Vec<serde_json::Value>,
}

/// Mean shape files of an analysis.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MeanShapes {
    #[serde(default)]
    pub meshes: Vec<String>,
    #[serde(default)]
    pub particle_files: Vec<String>,
}

/// One principal mode of variation.
#[derive(Debug, Clone, Deserialize)]
pub struct ModeEntry {
    pub mode: i32,
    #[serde(default)]
    pub eigen_value: f64,
    #[serde(default)]
    pub explained_variance: f64,
    #[serde(default)]
    pub cumulative_explained_variance: f64,
    /// Per-standard-deviation reconstructions, stored verbatim.
    #[serde(default)]
    pub pca_values: Vec<serde_json::Value>,
}

impl AnalysisManifest {
    /// Load and parse the manifest the engine left at `path`.
    pub async fn load(path: &Path) -> Result<Self, ManifestError> {
        let bytes = tokio::fs::read(path).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_manifest() {
        let json = r#"{
            "mean": {
                "meshes": ["analysis/mean_0.vtk", "analysis/mean_1.vtk"],
                "particle_files": ["analysis/mean_0.particles"]
            },
            "modes": [
                {
                    "mode": 1,
                    "eigen_value": 0.82,
                    "explained_variance": 61.2,
                    "cumulative_explained_variance": 61.2,
                    "pca_values": [{"pca_value": -2.0, "meshes": ["m.vtk"]}]
                }
            ],
            "charts": [{"type": "variance"}]
        }"#;
        let manifest: AnalysisManifest = serde_json::from_str(json).unwrap();
        assert_eq!(manifest.mean.meshes.len(), 2);
        assert_eq!(manifest.modes.len(), 1);
        assert_eq!(manifest.modes[0].mode, 1);
        assert_eq!(manifest.charts.len(), 1);
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let manifest: AnalysisManifest = serde_json::from_str("{}").unwrap();
        assert!(manifest.mean.meshes.is_empty());
        assert!(manifest.modes.is_empty());
        assert!(manifest.charts.is_empty());
    }
}
