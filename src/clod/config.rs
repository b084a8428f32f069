//! LOD engine configuration
//!
//! Everything here is fixed when the terrain is built, except the polygon
//! target, vertical exaggeration and culling mode, which have setters on
//! [`SmTerrain`](super::SmTerrain).

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::types::Result;

/// Default triangle budget per frame
pub const DEFAULT_POLYGON_TARGET: u32 = 10_000;
/// Smallest accepted triangle budget
pub const MIN_POLYGON_TARGET: u32 = 1_000;
/// Gain of the quality feedback loop
pub const ADAPTION_SPEED: f32 = 0.000_03;
/// Lowest quality constant the feedback loop may reach
pub const QUALITY_FLOOR: f32 = 0.002;
/// Quality constant before the first measurement
pub const INITIAL_QUALITY: f32 = 0.1;

/// How per-node variance is stored
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VarianceEncoding {
    /// One byte per node, ~3% relative error
    #[default]
    Fp8,
    /// Four bytes per node, exact
    Float,
}

/// How deep the variance tree is stored
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VarianceDepth {
    #[default]
    Full,
    /// Halves memory by dropping the bottom stored level; nodes there always split
    OmitLowest,
}

/// Where adaptive refinement starts each frame
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitStrategy {
    /// Descend from the two master triangles
    #[default]
    WholeTree,
    /// Descend from each block root
    PerBlock,
}

/// Output primitive layout
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmitMode {
    #[default]
    Fans,
    /// One three-vertex group per leaf
    Triangles,
}

/// Measurement the quality controller steers toward the polygon target
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackMetric {
    #[default]
    DrawnTriangles,
    /// Half of the triangle pool nodes used last frame
    PoolUsage,
}

/// Configuration for [`SmTerrain`](super::SmTerrain)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LodConfig {
    /// Triangles to aim for each frame (clamped to at least [`MIN_POLYGON_TARGET`])
    pub polygon_target: u32,
    /// Height multiplier applied to world positions
    pub vertical_exag: f32,
    /// Block edge length as a power of two in grid cells; `None` picks one from the grid size
    pub block_size_log2: Option<u32>,
    pub variance_encoding: VarianceEncoding,
    pub variance_depth: VarianceDepth,
    pub split_strategy: SplitStrategy,
    pub emit_mode: EmitMode,
    pub feedback: FeedbackMetric,
    pub initial_quality: f32,
    pub quality_floor: f32,
    pub adaption_speed: f32,
    /// Dead band around the target as a fraction of it
    pub tolerance: f32,
    /// Largest multiplicative change of the quality constant per frame
    pub max_quality_step: f32,
    /// When false the mesh is only rebuilt on [`cull_once`](super::SmTerrain::cull_once)
    pub cull_every_frame: bool,
}

impl Default for LodConfig {
    fn default() -> Self {
        Self {
            polygon_target: DEFAULT_POLYGON_TARGET,
            vertical_exag: 1.0,
            block_size_log2: None,
            variance_encoding: VarianceEncoding::Fp8,
            variance_depth: VarianceDepth::Full,
            split_strategy: SplitStrategy::WholeTree,
            emit_mode: EmitMode::Fans,
            feedback: FeedbackMetric::DrawnTriangles,
            initial_quality: INITIAL_QUALITY,
            quality_floor: QUALITY_FLOOR,
            adaption_speed: ADAPTION_SPEED,
            tolerance: 0.05,
            max_quality_step: 2.0,
            cull_every_frame: true,
        }
    }
}

impl LodConfig {
    /// Builder-style polygon target
    pub fn with_polygon_target(mut self, target: u32) -> Self {
        self.polygon_target = target;
        self
    }

    /// Load from a JSON file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Save as pretty JSON, creating parent directories as needed
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Error;

    #[test]
    fn test_defaults() {
        let config = LodConfig::default();
        assert_eq!(config.polygon_target, 10_000);
        assert_eq!(config.variance_encoding, VarianceEncoding::Fp8);
        assert_eq!(config.split_strategy, SplitStrategy::WholeTree);
        assert_eq!(config.feedback, FeedbackMetric::DrawnTriangles);
        assert_eq!(config.initial_quality, 0.1);
        assert_eq!(config.quality_floor, 0.002);
        assert!(config.cull_every_frame);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: LodConfig =
            serde_json::from_str(r#"{ "polygon_target": 2500, "emit_mode": "triangles" }"#).unwrap();
        assert_eq!(config.polygon_target, 2500);
        assert_eq!(config.emit_mode, EmitMode::Triangles);
        assert_eq!(config.variance_depth, VarianceDepth::Full);
        assert_eq!(config.block_size_log2, None);
    }

    #[test]
    fn test_save_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lod").join("config.json");

        let config = LodConfig {
            block_size_log2: Some(4),
            variance_encoding: VarianceEncoding::Float,
            feedback: FeedbackMetric::PoolUsage,
            ..LodConfig::default().with_polygon_target(5000)
        };
        config.save(&path).unwrap();

        let loaded = LodConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(matches!(LodConfig::load(&missing), Err(Error::Io(_))));

        let broken = dir.path().join("broken.json");
        std::fs::write(&broken, "{ not json").unwrap();
        assert!(matches!(LodConfig::load(&broken), Err(Error::Config(_))));
    }
}
