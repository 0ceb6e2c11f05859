//! End-to-end tests for the benchmark engine against real libSQL stores.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use autobench_core::storage::{self, BenchmarkStore};
use autobench_core::{
    BenchmarkEngine, BenchmarkProgress, BenchmarkResult, Configuration, CreateRun, EngineError,
    FinishRun, InferenceClient, InferenceError, InferenceResult, MatchMode, PerformanceMetrics,
    RunBenchmark, RunId, RunRecord, RunStatus, SweepConfig, SweepMode, TestCase, TestDataset,
    TursoBenchmarkStore,
};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

/// Client answering from a fixed table keyed by (temperature, prompt).
///
/// Unknown pairs fall back to `default_response`. Optionally cancels the
/// shared token on a given call and then waits for cancellation to be
/// observed.
struct ScriptedClient {
    default_response: String,
    responses: HashMap<(u32, String), String>,
    failing_prompts: Vec<String>,
    cancel_on_call: Option<(usize, CancellationToken)>,
    calls: AtomicUsize,
    resets: Mutex<Vec<String>>,
}

impl ScriptedClient {
    fn always(response: &str) -> Self {
        Self {
            default_response: response.to_string(),
            responses: HashMap::new(),
            failing_prompts: Vec::new(),
            cancel_on_call: None,
            calls: AtomicUsize::new(0),
            resets: Mutex::new(Vec::new()),
        }
    }

    fn respond(mut self, temperature: f32, prompt: &str, response: &str) -> Self {
        self.responses
            .insert((temperature.to_bits(), prompt.to_string()), response.to_string());
        self
    }

    fn fail_on(mut self, prompt: &str) -> Self {
        self.failing_prompts.push(prompt.to_string());
        self
    }

    fn cancel_on(mut self, call: usize, token: CancellationToken) -> Self {
        self.cancel_on_call = Some((call, token));
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InferenceClient for ScriptedClient {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn load_model(
        &self,
        _model: &Path,
        _system_prompt: &str,
        _threads: u32,
        _context_size: u32,
    ) -> Result<(), InferenceError> {
        Ok(())
    }

    fn is_loaded(&self) -> bool {
        true
    }

    async fn run_inference(
        &self,
        prompt: &str,
        config: &Configuration,
        cancel: &CancellationToken,
    ) -> Result<InferenceResult, InferenceError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

        if let Some((target, token)) = &self.cancel_on_call
            && *target == call
        {
            token.cancel();
            cancel.cancelled().await;
            return Err(InferenceError::Cancelled);
        }

        if self.failing_prompts.iter().any(|p| p == prompt) {
            return Err(InferenceError::Backend("model crashed".to_string()));
        }

        let response = self
            .responses
            .get(&(config.temperature.to_bits(), prompt.to_string()))
            .unwrap_or(&self.default_response)
            .clone();
        Ok(InferenceResult {
            response,
            metrics: PerformanceMetrics {
                tokens_per_second: 10.0,
                time_to_first_token_ms: 50.0,
                total_latency_ms: 150.0,
                token_count: 1,
            },
        })
    }

    async fn reset_conversation(&self, system_prompt: &str) {
        self.resets.lock().unwrap().push(system_prompt.to_string());
    }
}

/// Store wrapper that fails the nth `save_result` call.
struct FailingStore {
    inner: Arc<TursoBenchmarkStore>,
    fail_on_save: usize,
    saves: AtomicUsize,
}

#[async_trait]
impl BenchmarkStore for FailingStore {
    async fn create_run(&self, cmd: CreateRun) -> storage::Result<RunId> {
        self.inner.create_run(cmd).await
    }

    async fn save_result(&self, result: &BenchmarkResult) -> storage::Result<()> {
        let save = self.saves.fetch_add(1, Ordering::SeqCst) + 1;
        if save == self.fail_on_save {
            return Err(storage::Error::InvalidData("disk full".to_string()));
        }
        self.inner.save_result(result).await
    }

    async fn finish_run(&self, cmd: FinishRun) -> storage::Result<()> {
        self.inner.finish_run(cmd).await
    }

    async fn get_run(&self, run_id: RunId) -> storage::Result<Option<RunRecord>> {
        self.inner.get_run(run_id).await
    }

    async fn get_results_for_run(&self, run_id: RunId) -> storage::Result<Vec<BenchmarkResult>> {
        self.inner.get_results_for_run(run_id).await
    }

    async fn get_all_runs(&self) -> storage::Result<Vec<RunRecord>> {
        self.inner.get_all_runs().await
    }

    async fn get_best_config_for_model(
        &self,
        model_path: &str,
    ) -> storage::Result<Option<Configuration>> {
        self.inner.get_best_config_for_model(model_path).await
    }
}

fn temperature_sweep(min: f32, max: f32, step: f32) -> SweepConfig {
    SweepConfig {
        mode: SweepMode::TemperatureOnly,
        temperature_min: min,
        temperature_max: max,
        temperature_step: step,
        ..Default::default()
    }
}

fn dataset(cases: Vec<TestCase>) -> TestDataset {
    TestDataset {
        name: "test".to_string(),
        test_cases: cases,
    }
}

fn arithmetic_case() -> TestCase {
    TestCase::new("Arithmetic", "What is 2+2?", "4").with_threshold(80.0)
}

fn command(dataset: TestDataset, sweep: SweepConfig) -> RunBenchmark {
    RunBenchmark {
        model_path: "/models/stub-7b.gguf".to_string(),
        system_prompt: "You are terse.".to_string(),
        dataset,
        sweep,
    }
}

async fn memory_engine() -> (BenchmarkEngine, Arc<TursoBenchmarkStore>) {
    let store = Arc::new(TursoBenchmarkStore::new_memory().await.unwrap());
    (BenchmarkEngine::new(store.clone()), store)
}

#[tokio::test]
async fn temperature_sweep_scores_every_configuration() {
    let (engine, store) = memory_engine().await;
    let client = ScriptedClient::always("4");
    let mut snapshots: Vec<BenchmarkProgress> = Vec::new();

    let summary = engine
        .run(
            &client,
            command(dataset(vec![arithmetic_case()]), temperature_sweep(0.1, 0.3, 0.1)),
            |p| snapshots.push(p),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(summary.status, RunStatus::Completed);
    assert_eq!(summary.total_runs, 3);
    assert_eq!(summary.completed_runs, 3);
    assert_eq!(summary.best_average_score, 100.0);
    assert_eq!(summary.model_name, "stub-7b");
    assert!(summary.results.iter().all(|r| r.match_percentage == 100.0 && r.is_pass));
    assert!(summary.results.iter().all(|r| r.metrics.tokens_per_second == 10.0));

    let temperatures: Vec<f32> = summary.results.iter().map(|r| r.config.temperature).collect();
    assert_eq!(temperatures, vec![0.1, 0.2, 0.3]);

    // ties keep the first configuration
    assert_eq!(summary.best_config.map(|c| c.temperature), Some(0.1));

    let stored = store.get_results_for_run(summary.run_id).await.unwrap();
    assert_eq!(stored.len(), 3);

    let run = store.get_run(summary.run_id).await.unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.best_score, Some(100.0));
    assert_eq!(run.best_config, summary.best_config);
    assert_eq!(run.total_configs, 3);
    assert_eq!(run.total_tests, 1);
}

#[tokio::test]
async fn progress_is_reported_after_every_pair() {
    let (engine, _store) = memory_engine().await;
    let client = ScriptedClient::always("4");
    let mut snapshots: Vec<BenchmarkProgress> = Vec::new();
    let cases = vec![arithmetic_case(), TestCase::new("Echo", "Say 4", "4")];

    engine
        .run(
            &client,
            command(dataset(cases), temperature_sweep(0.1, 0.3, 0.1)),
            |p| snapshots.push(p),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    let completed: Vec<usize> = snapshots.iter().map(|p| p.completed).collect();
    assert_eq!(completed, vec![1, 2, 3, 4, 5, 6]);
    assert!(snapshots.iter().all(|p| p.total == 6));
    assert!(snapshots.iter().all(|p| p.estimated_remaining.is_some()));

    // the best score only appears once the first configuration is complete
    assert_eq!(snapshots[0].best_score_so_far, 0.0);
    assert_eq!(snapshots[1].best_score_so_far, 100.0);

    let last = snapshots.last().unwrap();
    assert_eq!(last.percent(), 100.0);
    assert_eq!(last.estimated_remaining, Some(std::time::Duration::ZERO));
}

#[tokio::test]
async fn conversation_is_reset_before_every_inference() {
    let (engine, _store) = memory_engine().await;
    let client = ScriptedClient::always("4");
    let cases = vec![arithmetic_case(), TestCase::new("Echo", "Say 4", "4")];

    engine
        .run(
            &client,
            command(dataset(cases), temperature_sweep(0.1, 0.2, 0.1)),
            |_| {},
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    let resets = client.resets.lock().unwrap();
    assert_eq!(resets.len(), client.calls());
    assert_eq!(resets.len(), 4);
    assert!(resets.iter().all(|s| s == "You are terse."));
}

#[tokio::test]
async fn inference_errors_are_scored_as_failures() {
    let (engine, store) = memory_engine().await;
    let client = ScriptedClient::always("4").fail_on("Say 4");
    let cases = vec![arithmetic_case(), TestCase::new("Echo", "Say 4", "4")];

    let summary = engine
        .run(
            &client,
            command(dataset(cases), temperature_sweep(0.1, 0.2, 0.1)),
            |_| {},
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(summary.status, RunStatus::Completed);
    assert_eq!(summary.completed_runs, 4);

    let failed: Vec<&BenchmarkResult> = summary
        .results
        .iter()
        .filter(|r| r.test_case_name == "Echo")
        .collect();
    assert_eq!(failed.len(), 2);
    for result in failed {
        assert!(result.response.starts_with("[ERROR] "));
        assert!(!result.is_pass);
        assert_eq!(result.metrics, PerformanceMetrics::default());
    }
    assert_eq!(summary.best_average_score, 50.0);
    assert_eq!(
        store.get_results_for_run(summary.run_id).await.unwrap().len(),
        4
    );
}

#[tokio::test]
async fn equal_means_keep_the_earlier_configuration() {
    let (engine, _store) = memory_engine().await;
    let first = "Say alpha";
    let second = "Say beta";
    // 0.1 scores [100, 0] and 0.2 scores [0, 100]: both average 50
    let client = ScriptedClient::always("nothing alike")
        .respond(0.1, first, "alpha")
        .respond(0.2, second, "beta");
    let cases = vec![
        TestCase::new("first", first, "alpha").with_match_mode(MatchMode::Exact),
        TestCase::new("second", second, "beta").with_match_mode(MatchMode::Exact),
    ];

    let summary = engine
        .run(
            &client,
            command(dataset(cases), temperature_sweep(0.1, 0.2, 0.1)),
            |_| {},
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(summary.best_average_score, 50.0);
    assert_eq!(summary.best_config.map(|c| c.temperature), Some(0.1));
}

#[tokio::test]
async fn strictly_better_later_configuration_becomes_best() {
    let (engine, _store) = memory_engine().await;
    let client = ScriptedClient::always("wrong").respond(0.3, "What is 2+2?", "4");

    let summary = engine
        .run(
            &client,
            command(dataset(vec![arithmetic_case()]), temperature_sweep(0.1, 0.3, 0.1)),
            |_| {},
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(summary.best_config.map(|c| c.temperature), Some(0.3));
    assert_eq!(summary.best_average_score, 100.0);
}

#[tokio::test]
async fn cancellation_before_start_finalizes_empty_run() {
    let (engine, store) = memory_engine().await;
    let client = ScriptedClient::always("4");
    let cancel = CancellationToken::new();
    cancel.cancel();

    let summary = engine
        .run(
            &client,
            command(dataset(vec![arithmetic_case()]), temperature_sweep(0.1, 0.3, 0.1)),
            |_| {},
            &cancel,
        )
        .await
        .unwrap();

    assert!(summary.was_cancelled());
    assert_eq!(summary.completed_runs, 0);
    assert_eq!(summary.total_runs, 3);
    assert_eq!(summary.best_config, None);
    assert_eq!(client.calls(), 0);

    let run = store.get_run(summary.run_id).await.unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Cancelled);
    assert!(run.finished_at.is_some());
    assert_eq!(run.best_score, None);
}

#[tokio::test]
async fn cancellation_during_inference_keeps_earlier_results() {
    let (engine, store) = memory_engine().await;
    let cancel = CancellationToken::new();
    let client = ScriptedClient::always("4").cancel_on(3, cancel.clone());

    let summary = engine
        .run(
            &client,
            command(dataset(vec![arithmetic_case()]), temperature_sweep(0.1, 0.5, 0.1)),
            |_| {},
            &cancel,
        )
        .await
        .unwrap();

    assert_eq!(summary.status, RunStatus::Cancelled);
    assert_eq!(summary.completed_runs, 2);
    assert_eq!(client.calls(), 3);
    assert_eq!(summary.best_config.map(|c| c.temperature), Some(0.1));

    let stored = store.get_results_for_run(summary.run_id).await.unwrap();
    assert_eq!(stored.len(), 2);
    assert!(stored.iter().all(|r| !r.response.starts_with("[ERROR]")));

    let run = store.get_run(summary.run_id).await.unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Cancelled);
    assert_eq!(run.best_score, Some(100.0));
}

#[tokio::test]
async fn store_failure_aborts_run_and_keeps_prior_results() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("telemetry.db");
    let inner = Arc::new(TursoBenchmarkStore::new_local(&path).await.unwrap());
    let store = Arc::new(FailingStore {
        inner: inner.clone(),
        fail_on_save: 4,
        saves: AtomicUsize::new(0),
    });
    let engine = BenchmarkEngine::new(store);
    let client = ScriptedClient::always("4");
    let cases = vec![arithmetic_case(), TestCase::new("Echo", "Say 4", "4")];

    let err = engine
        .run(
            &client,
            command(dataset(cases), temperature_sweep(0.1, 0.3, 0.1)),
            |_| {},
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::Storage(_)));
    drop(engine);
    drop(inner);

    let reopened = TursoBenchmarkStore::new_local(&path).await.unwrap();
    let runs = reopened.get_all_runs().await.unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, RunStatus::Running);

    let results = reopened.get_results_for_run(runs[0].id).await.unwrap();
    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|r| r.match_percentage == 100.0));
}

#[tokio::test]
async fn empty_dataset_is_rejected_before_a_run_is_created() {
    let (engine, store) = memory_engine().await;
    let client = ScriptedClient::always("4");

    let err = engine
        .run(
            &client,
            command(dataset(Vec::new()), SweepConfig::default()),
            |_| {},
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::EmptyDataset));
    assert!(store.get_all_runs().await.unwrap().is_empty());
}

#[tokio::test]
async fn malformed_sweep_fails_before_any_inference() {
    let (engine, store) = memory_engine().await;
    let client = ScriptedClient::always("4");

    let err = engine
        .run(
            &client,
            command(dataset(vec![arithmetic_case()]), temperature_sweep(0.9, 0.1, 0.1)),
            |_| {},
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, EngineError::Sweep(_)));
    assert_eq!(client.calls(), 0);
    assert!(store.get_all_runs().await.unwrap().is_empty());
}
