//! Durable result storage.
//!
//! Every result is written through as soon as it is scored, so an
//! interrupted run keeps everything produced before the interruption.
//!
//! The Turso implementation stores data in an embedded libSQL database.

mod error;
mod turso;

pub use error::{Error, Result};
pub use turso::{CURRENT_SCHEMA_VERSION, TursoBenchmarkStore};

use async_trait::async_trait;

use crate::commands::{CreateRun, FinishRun};
use crate::config::Configuration;
use crate::result::{BenchmarkResult, RunRecord};
use crate::types::RunId;

/// Persistent store for runs and their results.
///
/// Implementations serialize all access, so the engine may write while a
/// reporting context reads.
#[async_trait]
pub trait BenchmarkStore: Send + Sync {
    /// Open a run in the `running` state and return its id.
    async fn create_run(&self, cmd: CreateRun) -> Result<RunId>;

    /// Append one result.
    async fn save_result(&self, result: &BenchmarkResult) -> Result<()>;

    /// Record the final status and best configuration of a run.
    async fn finish_run(&self, cmd: FinishRun) -> Result<()>;

    /// Get a run by id.
    async fn get_run(&self, run_id: RunId) -> Result<Option<RunRecord>>;

    /// All results of a run, best match first.
    async fn get_results_for_run(&self, run_id: RunId) -> Result<Vec<BenchmarkResult>>;

    /// All runs, most recent first.
    async fn get_all_runs(&self) -> Result<Vec<RunRecord>>;

    /// Best configuration of the highest scoring run for a model.
    async fn get_best_config_for_model(&self, model_path: &str)
    -> Result<Option<Configuration>>;
}
