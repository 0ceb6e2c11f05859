//! Benchmark orchestration.
//!
//! [`BenchmarkEngine`] drives the configuration × test case cross product
//! one inference call at a time, scores each response, writes every result
//! through to the store and reports progress after each pair.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::commands::{CreateRun, FinishRun, RunBenchmark};
use crate::config::Configuration;
use crate::inference::{InferenceClient, InferenceError, InferenceResult, PerformanceMetrics};
use crate::result::{BenchmarkResult, RunStatus, model_name_from_path};
use crate::scoring::{ResponseScorer, SimilarityScorer};
use crate::storage::{self, BenchmarkStore};
use crate::sweep::{self, SweepError};
use crate::types::RunId;

/// Errors that end a benchmark run.
///
/// Failed inference calls are not among them: they are scored as failures
/// and the run continues.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The sweep could not be expanded. Nothing was run or stored.
    #[error(transparent)]
    Sweep(#[from] SweepError),

    /// A result or run record could not be written.
    #[error(transparent)]
    Storage(#[from] storage::Error),

    #[error("dataset has no test cases")]
    EmptyDataset,
}

/// Snapshot emitted after every completed (configuration, test case) pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkProgress {
    pub current_config: Configuration,
    pub current_test_case_name: String,
    pub completed: usize,
    pub total: usize,
    /// Best mean score over fully evaluated configurations, 0 until one completes.
    pub best_score_so_far: f64,
    pub current_score: f64,
    pub current_pass: bool,
    pub current_metrics: PerformanceMetrics,
    pub elapsed: Duration,
    /// Linear extrapolation from the pairs completed so far.
    pub estimated_remaining: Option<Duration>,
}

impl BenchmarkProgress {
    #[must_use]
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.completed as f64 / self.total as f64 * 100.0
    }
}

/// Outcome of one [`BenchmarkEngine::run`] call.
#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkRunSummary {
    pub run_id: RunId,
    pub model_path: String,
    pub model_name: String,
    pub total_configs: usize,
    pub total_tests: usize,
    /// Planned number of pairs.
    pub total_runs: usize,
    /// Pairs actually evaluated.
    pub completed_runs: usize,
    /// `None` when no configuration finished all of its test cases.
    pub best_config: Option<Configuration>,
    pub best_average_score: f64,
    pub duration: Duration,
    pub status: RunStatus,
    /// Results produced by this invocation, in evaluation order.
    pub results: Vec<BenchmarkResult>,
}

impl BenchmarkRunSummary {
    #[must_use]
    pub fn was_cancelled(&self) -> bool {
        self.status == RunStatus::Cancelled
    }
}

/// Linear ETA: `elapsed / completed * (total - completed)`.
///
/// Returns `None` before the first pair completes.
#[must_use]
pub fn estimate_remaining(elapsed: Duration, completed: usize, total: usize) -> Option<Duration> {
    if completed == 0 {
        return None;
    }
    let remaining = total.saturating_sub(completed);
    Some(Duration::from_secs_f64(
        elapsed.as_secs_f64() / completed as f64 * remaining as f64,
    ))
}

/// Tracks per-configuration scores and the best complete configuration.
///
/// A configuration becomes a candidate only once it has one score per test
/// case. It replaces the current best only with a strictly greater mean, so
/// ties keep the configuration found first.
struct BestTracker {
    tests_per_config: usize,
    scores: HashMap<Configuration, Vec<f64>>,
    best: Option<(Configuration, f64)>,
}

impl BestTracker {
    fn new(tests_per_config: usize) -> Self {
        Self {
            tests_per_config,
            scores: HashMap::new(),
            best: None,
        }
    }

    fn record(&mut self, config: Configuration, score: f64) {
        let scores = self.scores.entry(config).or_default();
        scores.push(score);
        if scores.len() != self.tests_per_config {
            return;
        }

        let mean = scores.iter().sum::<f64>() / scores.len() as f64;
        let improves = match self.best {
            Some((_, best)) => mean > best,
            None => true,
        };
        if improves {
            debug!(config = %config.to_short_string(), mean, "new best configuration");
            self.best = Some((config, mean));
        }
    }

    fn best_config(&self) -> Option<Configuration> {
        self.best.map(|(config, _)| config)
    }

    fn best_score(&self) -> f64 {
        self.best.map_or(0.0, |(_, score)| score)
    }
}

/// Runs benchmarks and persists their results.
pub struct BenchmarkEngine {
    store: Arc<dyn BenchmarkStore>,
    scorer: Arc<dyn ResponseScorer>,
}

impl BenchmarkEngine {
    /// Create an engine using the default [`SimilarityScorer`].
    pub fn new(store: Arc<dyn BenchmarkStore>) -> Self {
        Self::with_scorer(store, Arc::new(SimilarityScorer))
    }

    pub fn with_scorer(store: Arc<dyn BenchmarkStore>, scorer: Arc<dyn ResponseScorer>) -> Self {
        Self { store, scorer }
    }

    pub fn store(&self) -> &Arc<dyn BenchmarkStore> {
        &self.store
    }

    /// Evaluate every configuration of `cmd.sweep` against every test case.
    ///
    /// Exactly one inference call is in flight at a time. The conversation
    /// is reset to the system prompt before each call. Cancellation is
    /// checked before every pair and races the in-flight call; a cancelled
    /// run is still finalized and keeps every result written so far.
    ///
    /// Store failures abort the run and are returned as-is; the run record
    /// then stays in the `running` state.
    pub async fn run<F>(
        &self,
        client: &dyn InferenceClient,
        cmd: RunBenchmark,
        mut on_progress: F,
        cancel: &CancellationToken,
    ) -> Result<BenchmarkRunSummary, EngineError>
    where
        F: FnMut(BenchmarkProgress) + Send,
    {
        let configs = sweep::generate(&cmd.sweep)?;
        let test_cases = &cmd.dataset.test_cases;
        if test_cases.is_empty() {
            return Err(EngineError::EmptyDataset);
        }
        let total_runs = configs.len() * test_cases.len();

        let model_name = model_name_from_path(&cmd.model_path);
        let run_id = self
            .store
            .create_run(CreateRun {
                model_path: cmd.model_path.clone(),
                model_name: model_name.clone(),
                sweep_mode: cmd.sweep.mode,
                total_configs: u32::try_from(configs.len()).unwrap_or(u32::MAX),
                total_tests: u32::try_from(test_cases.len()).unwrap_or(u32::MAX),
            })
            .await?;
        info!(
            %run_id,
            model = %model_name,
            backend = client.name(),
            configs = configs.len(),
            tests = test_cases.len(),
            "benchmark started"
        );

        let started = Instant::now();
        let mut tracker = BestTracker::new(test_cases.len());
        let mut results = Vec::with_capacity(total_runs);
        let mut status = RunStatus::Completed;

        'sweep: for config in &configs {
            for case in test_cases {
                if cancel.is_cancelled() {
                    status = RunStatus::Cancelled;
                    break 'sweep;
                }

                client.reset_conversation(&cmd.system_prompt).await;

                let outcome = tokio::select! {
                    biased;
                    () = cancel.cancelled() => Err(InferenceError::Cancelled),
                    outcome = client.run_inference(&case.prompt, config, cancel) => outcome,
                };
                let inference = match outcome {
                    Ok(inference) => inference,
                    Err(err) if err.is_cancelled() || cancel.is_cancelled() => {
                        status = RunStatus::Cancelled;
                        break 'sweep;
                    }
                    Err(err) => {
                        warn!(
                            error = %err,
                            config = %config.to_short_string(),
                            test_case = %case.name,
                            "inference failed, scoring as failure"
                        );
                        InferenceResult {
                            response: format!("[ERROR] {err}"),
                            metrics: PerformanceMetrics::default(),
                        }
                    }
                };

                let score = self.scorer.score(
                    &case.expected_response,
                    &inference.response,
                    case.match_mode,
                    case.similarity_threshold,
                );

                let result = BenchmarkResult {
                    run_id,
                    test_case_id: case.id,
                    test_case_name: case.name.clone(),
                    config: *config,
                    response: inference.response,
                    match_percentage: score.match_percentage,
                    is_pass: score.is_pass,
                    metrics: inference.metrics,
                    timestamp: Utc::now(),
                };
                self.store.save_result(&result).await?;
                debug!(
                    test_case = %case.name,
                    score = score.match_percentage,
                    pass = score.is_pass,
                    "result saved"
                );

                tracker.record(*config, score.match_percentage);
                results.push(result);

                let completed = results.len();
                let elapsed = started.elapsed();
                on_progress(BenchmarkProgress {
                    current_config: *config,
                    current_test_case_name: case.name.clone(),
                    completed,
                    total: total_runs,
                    best_score_so_far: tracker.best_score(),
                    current_score: score.match_percentage,
                    current_pass: score.is_pass,
                    current_metrics: inference.metrics,
                    elapsed,
                    estimated_remaining: estimate_remaining(elapsed, completed, total_runs),
                });
            }
        }

        let best_config = tracker.best_config();
        let best_average_score = tracker.best_score();
        self.store
            .finish_run(FinishRun {
                run_id,
                status,
                best_score: best_config.map(|_| best_average_score),
                best_config,
            })
            .await?;

        let duration = started.elapsed();
        info!(
            %run_id,
            status = status.as_str(),
            completed = results.len(),
            best_score = best_average_score,
            ?duration,
            "benchmark finished"
        );

        Ok(BenchmarkRunSummary {
            run_id,
            model_path: cmd.model_path,
            model_name,
            total_configs: configs.len(),
            total_tests: test_cases.len(),
            total_runs,
            completed_runs: results.len(),
            best_config,
            best_average_score,
            duration,
            status,
            results,
        })
    }
}
