//! Suitability engine: one synchronous pass from weights and a data folder
//! to a georeferenced 0–100 score grid.
//!
//! Pipeline:
//!   reference grid → weight renormalization → load/align/normalize factors →
//!   weighted blend → NDVI overrides → discretize (0.1 bands) → rescale ×100.

use std::path::Path;
use std::time::Instant;

use tracing::{info, warn};

use crate::aggregate::Aggregator;
use crate::config::EngineConfig;
use crate::error::{Result, SuitabilityError};
use crate::factor::Factor;
use crate::grid::{GridStats, RasterGrid, RasterMeta};
use crate::io::{read_meta, write_geotiff};
use crate::loader::{FactorAvailability, FactorLoader};
use crate::penalty::apply_ndvi_penalty;
use crate::weights::WeightSet;

/// Output of one computation.
#[derive(Debug, Clone)]
pub struct SuitabilityResult {
    /// Scores in [0, 100], NaN where nothing could be scored. Carries the
    /// reference transform and CRS.
    pub grid: RasterGrid,
    /// Metadata of the reference raster the output is aligned to.
    pub reference: RasterMeta,
    pub reference_factor: Factor,
    /// Factors that contributed to the blend, in processing order.
    pub applied: Vec<Factor>,
    pub penalized_cells: usize,
}

impl SuitabilityResult {
    pub fn stats(&self) -> Option<GridStats> {
        self.grid.stats()
    }
}

pub struct SuitabilityEngine {
    config: EngineConfig,
    loader: FactorLoader,
}

impl SuitabilityEngine {
    pub fn new(config: EngineConfig) -> Self {
        let loader = FactorLoader::new(config.data_dir.clone());
        Self { config, loader }
    }

    /// Engine with default settings reading from `data_dir`.
    pub fn with_data_dir(data_dir: impl AsRef<Path>) -> Self {
        Self::new(EngineConfig {
            data_dir: data_dir.as_ref().to_path_buf(),
            ..EngineConfig::default()
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn factor_availability(&self) -> Vec<FactorAvailability> {
        self.loader.availability()
    }

    /// First factor, in [`Factor::ALL`] order, whose file exists and has a
    /// readable header.
    pub fn select_reference(&self) -> Result<(Factor, RasterMeta)> {
        for factor in Factor::ALL {
            let Some(path) = self.loader.locate(factor) else {
                continue;
            };
            match read_meta(&path) {
                Ok(meta) => {
                    let epsg = meta.crs.as_ref().and_then(|k| k.epsg());
                    info!(
                        "using {} as spatial reference ({}x{}, EPSG {})",
                        path.display(),
                        meta.width,
                        meta.height,
                        epsg.map_or_else(|| "unknown".to_string(), |c| c.to_string())
                    );
                    return Ok((factor, meta));
                }
                Err(e) => warn!("{} cannot serve as reference: {e}", path.display()),
            }
        }
        Err(SuitabilityError::NoReferenceData {
            data_dir: self.loader.data_dir().to_path_buf(),
        })
    }

    pub fn compute(&self, weights: &WeightSet) -> Result<SuitabilityResult> {
        let started = Instant::now();
        let weights = weights.normalized()?;
        info!("using weights: {weights:?}");
        for id in weights.unknown_ids() {
            warn!("weight given for unknown factor {id}; it is counted but never loaded");
        }

        let (reference_factor, reference) = self.select_reference()?;

        let mut aggregator = Aggregator::new(reference.clone(), self.config.ndvi_blend);
        let mut applied = Vec::new();
        for factor in Factor::ALL {
            let Some(weight) = weights.get(factor) else {
                continue;
            };
            info!("processing {factor}...");
            if let Some(loaded) = self.loader.load(factor, Some(&reference)) {
                aggregator.add(factor, &loaded.normalized, weight)?;
                applied.push(factor);
            }
        }
        let mut grid = aggregator.finish()?;

        let penalized_cells = if self.loader.locate(Factor::Ndvi).is_some() {
            apply_ndvi_penalty(&self.loader, &mut grid, &reference)?
        } else {
            0
        };

        discretize(&mut grid.data);
        rescale(&mut grid.data);
        grid.meta.nodata = Some(f64::from(self.config.nodata_out));

        match grid.stats() {
            Some(s) => info!(
                "suitability range: {:.1} - {:.1} (mean {:.1}) in {:.2?}",
                s.min,
                s.max,
                s.mean,
                started.elapsed()
            ),
            None => warn!("suitability grid has no valid cells"),
        }

        Ok(SuitabilityResult { grid, reference, reference_factor, applied, penalized_cells })
    }

    /// Write `grid` as a GeoTIFF georeferenced by `meta` (normally the
    /// reference metadata returned by [`compute`](Self::compute)).
    pub fn save(&self, grid: &RasterGrid, meta: &RasterMeta, output: &Path) -> Result<()> {
        let mut meta = meta.clone();
        meta.nodata = Some(f64::from(self.config.nodata_out));
        let out = RasterGrid::from_vec(meta, grid.data.clone())?;
        write_geotiff(&out, output, self.config.nodata_out)?;
        info!("suitability raster saved to {}", output.display());
        Ok(())
    }
}

/// Round to one decimal (ties to even): 11 bands 0.0, 0.1, …, 1.0.
pub fn discretize(values: &mut [f32]) {
    for v in values.iter_mut() {
        *v = (*v * 10.0).round_ties_even() / 10.0;
    }
}

/// Scale [0, 1] scores to [0, 100] and clip. NaN stays NaN.
pub fn rescale(values: &mut [f32]) {
    for v in values.iter_mut() {
        *v = (*v * 100.0).clamp(0.0, 100.0);
    }
}
