//! Run a parameter sweep against a model.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use autobench_core::{
    BenchmarkEngine, BenchmarkProgress, BenchmarkRunSummary, RunBenchmark, SweepConfig, SweepMode,
};
use autobench_models::{BackendKind, create_client};
use clap::Args;
use comfy_table::Cell;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::{StoreArgs, format_duration, load_dataset, new_table, print_configuration, truncate_str};
use crate::config::ConfigLoader;

/// Result rows shown after a run.
const SUMMARY_ROWS: usize = 10;

/// Sweep settings that override the configured `[sweep]` section.
#[derive(Args, Debug, Default)]
pub struct SweepOverrides {
    /// Sweep mode (temperature_only, all_combinations)
    #[arg(long, value_parser = parse_mode)]
    pub mode: Option<SweepMode>,

    /// Lowest temperature in the sweep
    #[arg(long)]
    pub temp_min: Option<f32>,

    /// Highest temperature in the sweep
    #[arg(long)]
    pub temp_max: Option<f32>,

    /// Temperature increment
    #[arg(long)]
    pub temp_step: Option<f32>,

    /// Token limit for every configuration
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Fixed seed for every configuration
    #[arg(long, conflicts_with = "random_seed")]
    pub seed: Option<u32>,

    /// Let the backend choose a seed per call
    #[arg(long)]
    pub random_seed: bool,
}

impl SweepOverrides {
    pub fn apply(&self, sweep: &mut SweepConfig) {
        if let Some(mode) = self.mode {
            sweep.mode = mode;
        }
        if let Some(value) = self.temp_min {
            sweep.temperature_min = value;
        }
        if let Some(value) = self.temp_max {
            sweep.temperature_max = value;
        }
        if let Some(value) = self.temp_step {
            sweep.temperature_step = value;
        }
        if let Some(value) = self.max_tokens {
            sweep.max_tokens = value;
        }
        if let Some(seed) = self.seed {
            sweep.deterministic_seed = true;
            sweep.seed = seed;
        }
        if self.random_seed {
            sweep.deterministic_seed = false;
        }
    }
}

fn parse_mode(s: &str) -> Result<SweepMode, String> {
    SweepMode::parse(s).ok_or_else(|| {
        format!(
            "unknown sweep mode '{}' (expected temperature_only or all_combinations)",
            s
        )
    })
}

fn parse_backend(s: &str) -> Result<BackendKind, String> {
    BackendKind::parse(s)
        .ok_or_else(|| format!("unknown backend '{}' (expected ollama or llama-server)", s))
}

/// Run command arguments
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Model to benchmark (Ollama tag or model file path)
    #[arg(short, long)]
    pub model: String,

    /// Dataset JSON file (defaults to the configured or built-in dataset)
    #[arg(short, long)]
    pub dataset: Option<PathBuf>,

    /// Inference backend (ollama, llama-server)
    #[arg(long, value_parser = parse_backend)]
    pub backend: Option<BackendKind>,

    /// Backend base URL
    #[arg(long)]
    pub url: Option<String>,

    /// System prompt used before every test case
    #[arg(long)]
    pub system_prompt: Option<String>,

    /// Inference threads
    #[arg(long)]
    pub threads: Option<u32>,

    /// Context window size
    #[arg(long)]
    pub context_size: Option<u32>,

    #[command(flatten)]
    pub sweep: SweepOverrides,

    #[command(flatten)]
    pub store: StoreArgs,
}

/// Run the benchmark command
pub async fn run(args: RunArgs) -> Result<()> {
    let config = ConfigLoader::load()?;

    let mut sweep = config.sweep.clone();
    args.sweep.apply(&mut sweep);

    let dataset_path = args.dataset.or_else(|| config.benchmark.dataset.clone());
    let dataset = load_dataset(dataset_path.as_deref())?;

    let kind = args.backend.unwrap_or(config.backend.kind);
    let url = args
        .url
        .unwrap_or_else(|| config.backend.effective_url().to_string());
    let system_prompt = args
        .system_prompt
        .unwrap_or_else(|| config.benchmark.system_prompt.clone());
    let threads = args.threads.unwrap_or(config.backend.threads);
    let context_size = args.context_size.unwrap_or(config.backend.context_size);

    let store = args.store.open(&config).await?;
    let client = create_client(kind, Some(&url));

    info!(backend = %kind, url = %url, model = %args.model, "loading model");
    client
        .load_model(Path::new(&args.model), &system_prompt, threads, context_size)
        .await
        .with_context(|| format!("failed to load model '{}' via {}", args.model, kind))?;

    let cancel = CancellationToken::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("\nCancelling after the current inference...");
                cancel.cancel();
            }
        })
    };

    println!(
        "Benchmarking {} with dataset '{}' ({} test cases)",
        args.model,
        dataset.name,
        dataset.test_cases.len()
    );

    let engine = BenchmarkEngine::new(store);
    let outcome = engine
        .run(
            client.as_ref(),
            RunBenchmark {
                model_path: args.model,
                system_prompt,
                dataset,
                sweep,
            },
            print_progress,
            &cancel,
        )
        .await;
    ctrl_c.abort();

    let summary = outcome?;
    if summary.was_cancelled() {
        warn!(run_id = %summary.run_id, "run cancelled");
    }
    print_summary(&summary);
    Ok(())
}

fn print_progress(progress: BenchmarkProgress) {
    let eta = progress
        .estimated_remaining
        .map(format_duration)
        .unwrap_or_else(|| "-".to_string());
    println!(
        "[{:>5.1}%] {}/{}  {}  {:<24} {:>5.1}% {}  best {:>5.1}%  {:>6.1} tok/s  ETA {}",
        progress.percent(),
        progress.completed,
        progress.total,
        progress.current_config.to_short_string(),
        truncate_str(&progress.current_test_case_name, 24),
        progress.current_score,
        if progress.current_pass { "PASS" } else { "FAIL" },
        progress.best_score_so_far,
        progress.current_metrics.tokens_per_second,
        eta,
    );
}

fn print_summary(summary: &BenchmarkRunSummary) {
    println!();
    println!("Run {} {}", summary.run_id, summary.status.as_str());
    println!("{}", "─".repeat(60));
    println!("Model:     {} ({})", summary.model_name, summary.model_path);
    println!(
        "Sweep:     {} configurations x {} test cases",
        summary.total_configs, summary.total_tests
    );
    println!(
        "Completed: {}/{} in {}",
        summary.completed_runs,
        summary.total_runs,
        format_duration(summary.duration)
    );

    match &summary.best_config {
        Some(best) => {
            println!();
            println!("Best configuration ({:.1}% average):", summary.best_average_score);
            print_configuration(best);
        }
        None => {
            println!();
            println!("No configuration completed every test case.");
        }
    }

    if summary.results.is_empty() {
        return;
    }

    let mut ranked: Vec<_> = summary.results.iter().collect();
    ranked.sort_by(|a, b| b.match_percentage.total_cmp(&a.match_percentage));

    let mut table = new_table(&["Test case", "Configuration", "Score", "Pass", "tok/s"]);
    for result in ranked.into_iter().take(SUMMARY_ROWS) {
        table.add_row(vec![
            Cell::new(truncate_str(&result.test_case_name, 28)),
            Cell::new(result.config.to_short_string()),
            Cell::new(format!("{:.1}%", result.match_percentage)),
            Cell::new(if result.is_pass { "yes" } else { "no" }),
            Cell::new(format!("{:.1}", result.metrics.tokens_per_second)),
        ]);
    }
    println!();
    println!("{table}");
}
