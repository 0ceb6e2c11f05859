//! Command types for the benchmark lifecycle.
//!
//! Commands describe an intended state change. [`RunBenchmark`] is handled
//! by [`BenchmarkEngine`](crate::BenchmarkEngine); [`CreateRun`] and
//! [`FinishRun`] by a [`BenchmarkStore`](crate::storage::BenchmarkStore).

use crate::config::Configuration;
use crate::dataset::TestDataset;
use crate::result::{RunStatus, model_name_from_path};
use crate::sweep::{SweepConfig, SweepMode};
use crate::types::RunId;

/// Command to benchmark a model over a sweep.
#[derive(Debug, Clone)]
pub struct RunBenchmark {
    /// Path or tag identifying the model.
    pub model_path: String,

    /// System prompt every test case starts from.
    pub system_prompt: String,

    pub dataset: TestDataset,

    pub sweep: SweepConfig,
}

/// Command to open a new run record.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateRun {
    pub model_path: String,

    /// Display name, usually the file stem of `model_path`.
    pub model_name: String,

    pub sweep_mode: SweepMode,

    pub total_configs: u32,

    pub total_tests: u32,
}

impl CreateRun {
    /// Build a command deriving the model name from the path.
    pub fn new(
        model_path: impl Into<String>,
        sweep_mode: SweepMode,
        total_configs: u32,
        total_tests: u32,
    ) -> Self {
        let model_path = model_path.into();
        Self {
            model_name: model_name_from_path(&model_path),
            model_path,
            sweep_mode,
            total_configs,
            total_tests,
        }
    }
}

/// Command to close a run.
#[derive(Debug, Clone, PartialEq)]
pub struct FinishRun {
    pub run_id: RunId,

    /// Terminal status, either completed or cancelled.
    pub status: RunStatus,

    pub best_score: Option<f64>,

    pub best_config: Option<Configuration>,
}
