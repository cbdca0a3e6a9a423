use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::aggregate::NdviBlend;
use crate::error::Result;

/// Engine settings. Every field has a default so a partial JSON file works.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Folder holding the factor rasters.
    pub data_dir: PathBuf,
    pub ndvi_blend: NdviBlend,
    /// Value written for missing cells in the output raster.
    pub nodata_out: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            ndvi_blend: NdviBlend::Legacy,
            nodata_out: -9999.0,
        }
    }
}

impl EngineConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: EngineConfig = serde_json::from_str(r#"{"ndvi_blend": "unit"}"#).unwrap();
        assert_eq!(cfg.ndvi_blend, NdviBlend::Unit);
        assert_eq!(cfg.data_dir, PathBuf::from("data"));
        assert_eq!(cfg.nodata_out, -9999.0);
    }

    #[test]
    fn from_json_file_reads_and_rejects() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("engine.json");
        fs::write(&good, r#"{"data_dir": "/srv/rasters"}"#).unwrap();
        assert_eq!(EngineConfig::from_json_file(&good).unwrap().data_dir, PathBuf::from("/srv/rasters"));

        let bad = dir.path().join("bad.json");
        fs::write(&bad, "{ndvi_blend:").unwrap();
        assert!(EngineConfig::from_json_file(&bad).is_err());
        assert!(EngineConfig::from_json_file(&dir.path().join("absent.json")).is_err());
    }
}
