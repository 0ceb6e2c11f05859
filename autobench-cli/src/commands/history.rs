//! Score history for a model, checked for drift.

use anyhow::Result;
use autobench_core::optimization::{
    DEFAULT_DEVIATION_THRESHOLD, DEFAULT_WINDOW_SIZE, DriftDetector, DriftResult,
};
use autobench_core::{BenchmarkStore, RunRecord, RunStatus};
use clap::Args;
use comfy_table::{Cell, Color};

use super::{StoreArgs, new_table};
use crate::config::ConfigLoader;

/// History command arguments
#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Model path or tag, as given to `autobench run`
    #[arg(short, long)]
    pub model: String,

    /// Rolling window size
    #[arg(long, default_value_t = DEFAULT_WINDOW_SIZE)]
    pub window: usize,

    /// Standard deviations from the window mean that count as drift
    #[arg(long, default_value_t = DEFAULT_DEVIATION_THRESHOLD)]
    pub threshold: f64,

    #[command(flatten)]
    pub store: StoreArgs,
}

/// Run the history command
pub async fn run(args: HistoryArgs) -> Result<()> {
    let config = ConfigLoader::load()?;
    let store = args.store.open(&config).await?;

    let runs = scored_runs(store.get_all_runs().await?, &args.model);
    if runs.is_empty() {
        println!("No scored runs for {}", args.model);
        return Ok(());
    }

    let mut detector = DriftDetector::new(args.window, args.threshold);
    let checked: Vec<(RunRecord, DriftResult)> = runs
        .into_iter()
        .filter_map(|run| {
            let score = run.best_score?;
            Some((run, detector.record_score(score)))
        })
        .collect();

    let mut table = new_table(&[
        "Run",
        "Started",
        "Best",
        "Window mean",
        "Std dev",
        "Deviation",
        "Drift",
    ]);
    for (run, drift) in &checked {
        let flag = if drift.is_drift_detected {
            Cell::new("DRIFT").fg(Color::Red)
        } else {
            Cell::new("")
        };
        table.add_row(vec![
            Cell::new(run.id),
            Cell::new(run.started_at.format("%Y-%m-%d %H:%M")),
            Cell::new(format!("{:.1}%", drift.score)),
            Cell::new(format!("{:.1}", drift.window_mean)),
            Cell::new(format!("{:.2}", drift.window_std_dev)),
            Cell::new(format!("{:.2}", drift.deviation_from_mean)),
            flag,
        ]);
    }
    println!("{table}");

    let drifted = checked.iter().filter(|(_, d)| d.is_drift_detected).count();
    if drifted > 0 {
        println!("{} of {} runs deviate from their baseline", drifted, checked.len());
    }
    Ok(())
}

/// Finished runs of `model` that produced a best score, oldest first.
fn scored_runs(mut runs: Vec<RunRecord>, model: &str) -> Vec<RunRecord> {
    runs.retain(|run| {
        run.model_path == model && run.status != RunStatus::Running && run.best_score.is_some()
    });
    runs.sort_by_key(|run| run.id);
    runs
}
