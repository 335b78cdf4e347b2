//! Chunk configuration, loadable from JSON.
//!
//! ```json
//! {
//!   "chunk_size": 16,
//!   "algorithm": "MarchingCubes",
//!   "pre_generate": true,
//!   "density": { "border_size": 1, "shape": "Sphere", "center": [8, 8, 8], "radius": 8 }
//! }
//! ```
//!
//! `algorithm` accepts a name or a numeric id and rejects anything unknown.
//! `density.shape` accepts a name or id and falls back to Rubin.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::types::Result;
use crate::density::BaseDensityProperties;
use crate::mesh::IsosurfaceAlgorithm;

/// Default cells per chunk axis
pub const DEFAULT_CHUNK_SIZE: usize = 16;

/// Everything needed to stand up one chunk
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkConfig {
    /// Cells per axis
    pub chunk_size: usize,
    pub algorithm: IsosurfaceAlgorithm,
    /// Generate the density grid eagerly on creation instead of on first tick
    pub pre_generate: bool,
    pub density: BaseDensityProperties,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            algorithm: IsosurfaceAlgorithm::MarchingCubes,
            pre_generate: true,
            density: BaseDensityProperties::default(),
        }
    }
}

impl ChunkConfig {
    /// Parse from a JSON document
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load from a JSON file on disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)?;
        let config = Self::from_json_str(&json)?;
        log::info!("Loaded chunk config from {}: {:?}", path.display(), config.algorithm);
        Ok(config)
    }

    /// Write as pretty JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::Error;
    use crate::density::{ShapeKind, SimulationMode};
    use glam::Vec3;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config = ChunkConfig::from_json_str(r#"{ "chunk_size": 8 }"#).unwrap();
        assert_eq!(config.chunk_size, 8);
        assert_eq!(config.algorithm, IsosurfaceAlgorithm::MarchingCubes);
        assert_eq!(config.density.border_size, 1);
    }

    #[test]
    fn test_names_and_ids() {
        let json = r#"{
            "algorithm": 3,
            "density": { "shape": "torus", "center": [1.0, 2.0, 3.0], "simulation": "Tide" }
        }"#;
        let config = ChunkConfig::from_json_str(json).unwrap();
        assert_eq!(config.algorithm, IsosurfaceAlgorithm::NaiveSurfaceNets);
        assert_eq!(config.density.shape, ShapeKind::Torus);
        assert_eq!(config.density.center, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(config.density.simulation, SimulationMode::Tide);
    }

    #[test]
    fn test_unknown_algorithm_is_an_error() {
        assert!(matches!(
            ChunkConfig::from_json_str(r#"{ "algorithm": 9 }"#),
            Err(Error::Config(_))
        ));
        assert!(ChunkConfig::from_json_str(r#"{ "algorithm": "Raymarch" }"#).is_err());
    }

    #[test]
    fn test_unknown_shape_falls_back() {
        let config = ChunkConfig::from_json_str(r#"{ "density": { "shape": 99 } }"#).unwrap();
        assert_eq!(config.density.shape, ShapeKind::Rubin);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chunk.json");
        let config = ChunkConfig {
            chunk_size: 24,
            algorithm: IsosurfaceAlgorithm::DualContouring,
            pre_generate: false,
            ..Default::default()
        };
        config.save(&path).unwrap();
        assert_eq!(ChunkConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(ChunkConfig::load(dir.path().join("nope.json")), Err(Error::Io(_))));
    }
}
