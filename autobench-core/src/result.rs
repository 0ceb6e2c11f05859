//! Persisted benchmark records.
//!
//! A run produces one [`RunRecord`] and one [`BenchmarkResult`] per
//! (configuration, test case) pair. Results are append-only.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::Configuration;
use crate::inference::PerformanceMetrics;
use crate::sweep::SweepMode;
use crate::types::{RunId, TestCaseId};

/// Lifecycle state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Created, results still being written
    Running,
    /// Every pair was evaluated
    Completed,
    /// Stopped early by a cancellation request
    Cancelled,
}

impl RunStatus {
    /// Convert to database string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parse from database string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

/// One benchmark execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: RunId,
    pub model_path: String,
    pub model_name: String,
    pub sweep_mode: SweepMode,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    /// Set once when the run completes or is cancelled.
    pub finished_at: Option<DateTime<Utc>>,
    pub total_configs: u32,
    pub total_tests: u32,
    pub best_score: Option<f64>,
    pub best_config: Option<Configuration>,
}

impl RunRecord {
    /// Planned number of (configuration, test case) pairs.
    #[must_use]
    pub fn total_runs(&self) -> u64 {
        u64::from(self.total_configs) * u64::from(self.total_tests)
    }
}

/// Derive a display name from a model path: the file stem, or the whole
/// string when there is none (e.g. an Ollama tag such as `llama3:8b`).
#[must_use]
pub fn model_name_from_path(model_path: &str) -> String {
    Path::new(model_path)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| model_path.to_string())
}

/// Outcome of evaluating one configuration against one test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkResult {
    pub run_id: RunId,
    pub test_case_id: TestCaseId,
    pub test_case_name: String,
    pub config: Configuration,
    pub response: String,
    pub match_percentage: f64,
    pub is_pass: bool,
    pub metrics: PerformanceMetrics,
    pub timestamp: DateTime<Utc>,
}
