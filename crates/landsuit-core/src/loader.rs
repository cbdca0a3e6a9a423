//! Per-factor loading: locate → read → mask no-data → align → normalize.
//!
//! A factor whose file is absent or unreadable is reported as unavailable
//! and logged; it never aborts the computation.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};

use crate::align::{align_to, Resampling};
use crate::error::Result;
use crate::factor::{Factor, ValueKind};
use crate::grid::{RasterGrid, RasterMeta};
use crate::io::read_geotiff;
use crate::normalize::normalize_grid;

/// A normalized factor grid together with its source's own metadata.
#[derive(Debug, Clone)]
pub struct LoadedFactor {
    pub factor: Factor,
    pub normalized: RasterGrid,
    pub source_meta: RasterMeta,
}

/// Whether a factor's source file is present in the data folder.
#[derive(Debug, Clone, Serialize)]
pub struct FactorAvailability {
    pub factor: Factor,
    pub filename: &'static str,
    pub kind: ValueKind,
    pub path: PathBuf,
    pub exists: bool,
}

#[derive(Debug, Clone)]
pub struct FactorLoader {
    data_dir: PathBuf,
}

impl FactorLoader {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self { data_dir: data_dir.into() }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn path_of(&self, factor: Factor) -> PathBuf {
        self.data_dir.join(factor.filename())
    }

    /// Path of the factor's file if it exists.
    pub fn locate(&self, factor: Factor) -> Option<PathBuf> {
        let path = self.path_of(factor);
        path.is_file().then_some(path)
    }

    pub fn availability(&self) -> Vec<FactorAvailability> {
        Factor::ALL
            .into_iter()
            .map(|factor| {
                let path = self.path_of(factor);
                FactorAvailability {
                    factor,
                    filename: factor.filename(),
                    kind: factor.kind(),
                    exists: path.is_file(),
                    path,
                }
            })
            .collect()
    }

    /// Read band 1 with the no-data sentinel replaced by NaN, resampled onto
    /// `target` when one is given.
    pub fn read_raw(
        &self,
        factor: Factor,
        target: Option<&RasterMeta>,
        method: Resampling,
    ) -> Result<Option<(RasterGrid, RasterMeta)>> {
        let Some(path) = self.locate(factor) else {
            return Ok(None);
        };
        let mut grid = read_geotiff(&path)?;
        grid.mask_nodata();
        let source_meta = grid.meta.clone();

        if let Some(target) = target {
            if !source_meta.same_grid(target) {
                debug!(
                    "{factor}: resampling {}x{} onto {}x{} ({method:?})",
                    source_meta.width, source_meta.height, target.width, target.height
                );
            }
            grid = align_to(&grid, target, method);
        }
        debug!("{factor}: {} of {} cells valid", grid.valid_count(), grid.data.len());
        Ok(Some((grid, source_meta)))
    }

    /// Load, align (bilinear) and normalize one factor. `None` when the file
    /// is missing or cannot be read.
    pub fn load(&self, factor: Factor, target: Option<&RasterMeta>) -> Option<LoadedFactor> {
        match self.read_raw(factor, target, Resampling::Bilinear) {
            Ok(Some((mut grid, source_meta))) => {
                normalize_grid(&mut grid, factor.id());
                Some(LoadedFactor { factor, normalized: grid, source_meta })
            }
            Ok(None) => {
                warn!("{} not found, skipping {factor}", self.path_of(factor).display());
                None
            }
            Err(e) => {
                warn!("error loading {factor}: {e}; skipping");
                None
            }
        }
    }
}
