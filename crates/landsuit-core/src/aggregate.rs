//! Weighted blend of normalized factor grids.
//!
//! Each factor adds `score * weight / 100` to every cell where its score is
//! present, and its weight fraction to one scalar total. The finished blend
//! is divided by that total so a partial set of factors still spans [0, 1].
//!
//! The total is per computation, not per cell: where factors have different
//! missing-data footprints the rescale is only approximate.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Result, SuitabilityError};
use crate::factor::Factor;
use crate::grid::{RasterGrid, RasterMeta};

/// How the NDVI score (0–100) enters a blend of 0–1 scores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NdviBlend {
    /// Blend the 0–100 score as is, matching historical outputs.
    #[default]
    Legacy,
    /// Divide by 100 first so NDVI weighs like every other factor.
    Unit,
}

impl NdviBlend {
    fn scale(self, factor: Factor) -> f32 {
        match (self, factor) {
            (NdviBlend::Unit, Factor::Ndvi) => 0.01,
            _ => 1.0,
        }
    }
}

pub struct Aggregator {
    meta: RasterMeta,
    acc: Vec<f32>,
    covered: Vec<bool>,
    applied: f64,
    ndvi_blend: NdviBlend,
}

impl Aggregator {
    /// Start an all-zero blend on the grid described by `meta`.
    pub fn new(meta: RasterMeta, ndvi_blend: NdviBlend) -> Self {
        let n = meta.len();
        Self {
            meta,
            acc: vec![0.0; n],
            covered: vec![false; n],
            applied: 0.0,
            ndvi_blend,
        }
    }

    /// Sum of weight fractions applied so far (1.0 = the full 100 points).
    pub fn applied_fraction(&self) -> f64 {
        self.applied
    }

    /// Blend one normalized grid with `weight` on the 0–100 scale. Grids of
    /// the wrong size are refused.
    pub fn add(&mut self, factor: Factor, grid: &RasterGrid, weight: f64) -> Result<()> {
        if grid.data.len() != self.acc.len() {
            return Err(SuitabilityError::DimensionMismatch {
                expected: self.acc.len(),
                actual: grid.data.len(),
            });
        }
        let fraction = weight / 100.0;
        let w = fraction as f32 * self.ndvi_blend.scale(factor);

        for ((acc, covered), &v) in self.acc.iter_mut().zip(self.covered.iter_mut()).zip(&grid.data) {
            if !v.is_nan() {
                *acc += v * w;
                *covered = true;
            }
        }
        self.applied += fraction;
        debug!("applied {factor}: weight {weight:.3}% (fraction {fraction:.3})");
        Ok(())
    }

    /// Rescale by the applied weight total. Cells no factor covered stay NaN.
    /// Fails when nothing was applied.
    pub fn finish(self) -> Result<RasterGrid> {
        if self.applied <= 0.0 {
            return Err(SuitabilityError::NoFactorsApplied);
        }
        let total = self.applied as f32;
        let uncovered = self.covered.iter().filter(|c| !**c).count();
        if uncovered > 0 {
            warn!("{uncovered} cell(s) have no valid factor value and stay missing");
        }
        let data = self
            .acc
            .into_iter()
            .zip(self.covered)
            .map(|(v, covered)| if covered { v / total } else { f32::NAN })
            .collect();
        RasterGrid::from_vec(self.meta, data)
    }
}
