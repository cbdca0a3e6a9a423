//! Agricultural land-suitability scoring over GeoTIFF factor layers.
//!
//! A folder of single-band rasters (fertility, moisture, pH, ...) is aligned
//! to a reference grid, normalized per factor, blended with caller weights,
//! overridden by NDVI penalties and written back as a 0–100 GeoTIFF.

pub mod aggregate;
pub mod align;
pub mod config;
pub mod engine;
pub mod error;
pub mod factor;
pub mod geotransform;
pub mod grid;
pub mod io;
pub mod loader;
pub mod normalize;
pub mod penalty;
pub mod status;
pub mod weights;

pub use aggregate::NdviBlend;
pub use align::Resampling;
pub use config::EngineConfig;
pub use engine::{SuitabilityEngine, SuitabilityResult};
pub use error::{Result, SuitabilityError};
pub use factor::Factor;
pub use geotransform::GeoTransform;
pub use grid::{GeoKeys, GridStats, RasterGrid, RasterMeta};
pub use status::{run_analysis, AnalysisStatus, RunState, StatusStore};
pub use weights::WeightSet;
