//! Run status for callers that drive the engine from a background task.
//!
//! The engine never touches this store. A runner owns it and records progress
//! at fixed checkpoints: start, computation, saving, done or error.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tracing::error;

use crate::engine::SuitabilityEngine;
use crate::error::{Result, SuitabilityError};
use crate::grid::GridStats;
use crate::weights::WeightSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Processing,
    Completed,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisStatus {
    pub state: RunState,
    /// 0–100.
    pub progress: u8,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statistics: Option<GridStats>,
}

impl AnalysisStatus {
    fn idle() -> Self {
        Self {
            state: RunState::Idle,
            progress: 0,
            message: "No analysis in progress".to_string(),
            output_file: None,
            statistics: None,
        }
    }
}

/// Shared, thread-safe status handle. Clones observe the same status.
#[derive(Debug, Clone)]
pub struct StatusStore(Arc<Mutex<AnalysisStatus>>);

impl Default for StatusStore {
    fn default() -> Self {
        Self(Arc::new(Mutex::new(AnalysisStatus::idle())))
    }
}

impl StatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, AnalysisStatus> {
        // A writer that panicked mid-update still left a whole status value.
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn snapshot(&self) -> AnalysisStatus {
        self.lock().clone()
    }

    /// Claim the store for a new run. Fails while another run is processing.
    pub fn begin(&self) -> Result<()> {
        let mut status = self.lock();
        if status.state == RunState::Processing {
            return Err(SuitabilityError::AnalysisInProgress);
        }
        *status = AnalysisStatus {
            state: RunState::Processing,
            progress: 0,
            message: "Starting analysis...".to_string(),
            output_file: None,
            statistics: None,
        };
        Ok(())
    }

    pub fn checkpoint(&self, progress: u8, message: impl Into<String>) {
        let mut status = self.lock();
        status.progress = progress.min(100);
        status.message = message.into();
    }

    pub fn complete(&self, output_file: PathBuf, statistics: Option<GridStats>) {
        *self.lock() = AnalysisStatus {
            state: RunState::Completed,
            progress: 100,
            message: "Analysis completed successfully".to_string(),
            output_file: Some(output_file),
            statistics,
        };
    }

    pub fn fail(&self, message: impl Into<String>) {
        *self.lock() = AnalysisStatus {
            state: RunState::Error,
            progress: 0,
            message: message.into(),
            output_file: None,
            statistics: None,
        };
    }
}

/// Compute and save one suitability raster, reporting through `store`.
pub fn run_analysis(
    engine: &SuitabilityEngine,
    weights: &WeightSet,
    output: &Path,
    store: &StatusStore,
) -> Result<Option<GridStats>> {
    store.begin()?;
    let outcome = (|| -> Result<Option<GridStats>> {
        store.checkpoint(25, "Calculating suitability...");
        let result = engine.compute(weights)?;
        store.checkpoint(75, "Saving results...");
        engine.save(&result.grid, &result.reference, output)?;
        Ok(result.stats())
    })();

    match outcome {
        Ok(stats) => {
            store.complete(output.to_path_buf(), stats);
            Ok(stats)
        }
        Err(e) => {
            error!("analysis failed: {e}");
            store.fail(format!("Analysis failed: {e}"));
            Err(e)
        }
    }
}
