//! Vegetation-index hard overrides applied after the weighted blend.
//!
//! Raw NDVI classes 1 and 2 (sparse cover) clamp the composite to 0.1 and
//! class 5 (forest) to 0.2, whatever the blend produced, missing included.

use tracing::{info, warn};

use crate::align::Resampling;
use crate::error::{Result, SuitabilityError};
use crate::factor::Factor;
use crate::grid::{RasterGrid, RasterMeta};
use crate::loader::FactorLoader;

/// Raw NDVI class → forced composite score (0–1 scale).
pub const NDVI_OVERRIDES: [(f32, f32); 3] = [(1.0, 0.1), (2.0, 0.1), (5.0, 0.2)];

/// Forced score for a raw NDVI class, if the class triggers an override.
pub fn override_for(raw: f32) -> Option<f32> {
    NDVI_OVERRIDES.iter().find(|&&(class, _)| class == raw).map(|&(_, score)| score)
}

/// Overwrite `composite` wherever `raw_ndvi` carries an override class.
/// Returns the number of cells overridden.
pub fn apply_overrides(composite: &mut RasterGrid, raw_ndvi: &RasterGrid) -> Result<usize> {
    if composite.data.len() != raw_ndvi.data.len() {
        return Err(SuitabilityError::DimensionMismatch {
            expected: composite.data.len(),
            actual: raw_ndvi.data.len(),
        });
    }
    let mut hits = 0usize;
    for (cell, &raw) in composite.data.iter_mut().zip(&raw_ndvi.data) {
        if let Some(score) = override_for(raw) {
            *cell = score;
            hits += 1;
        }
    }
    Ok(hits)
}

/// Reload raw NDVI (nearest-neighbour onto `target`) and apply the overrides.
/// A missing NDVI file leaves the composite untouched; an unreadable one is
/// logged and skipped.
pub fn apply_ndvi_penalty(
    loader: &FactorLoader,
    composite: &mut RasterGrid,
    target: &RasterMeta,
) -> Result<usize> {
    let raw = match loader.read_raw(Factor::Ndvi, Some(target), Resampling::Nearest) {
        Ok(Some((raw, _))) => raw,
        Ok(None) => return Ok(0),
        Err(e) => {
            warn!("cannot read raw NDVI for penalties: {e}; skipping");
            return Ok(0);
        }
    };
    let hits = apply_overrides(composite, &raw)?;
    info!("applied NDVI penalties to {hits} cell(s): poor areas set to 0.1, forest areas set to 0.2");
    Ok(hits)
}
