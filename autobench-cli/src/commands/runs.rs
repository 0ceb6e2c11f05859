//! Inspect and export stored benchmark runs.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use autobench_core::export::render_csv;
use autobench_core::{BenchmarkStore, RunId, RunRecord};
use chrono::{DateTime, Local, Utc};
use clap::{Args, Subcommand};
use comfy_table::Cell;

use super::{StoreArgs, new_table, print_configuration, truncate_str};
use crate::config::ConfigLoader;

/// Runs management arguments
#[derive(Args, Debug)]
pub struct RunsArgs {
    #[command(subcommand)]
    pub command: RunsCommands,

    #[command(flatten)]
    pub store: StoreArgs,
}

/// Runs subcommands
#[derive(Subcommand, Debug)]
pub enum RunsCommands {
    /// List all runs, newest first
    List,
    /// Show a run and its best results
    Show {
        /// Run ID
        id: i64,

        /// Number of results to show
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// Export a run's results as CSV
    Export {
        /// Run ID
        id: i64,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Run runs command
pub async fn run(args: RunsArgs) -> Result<()> {
    let config = ConfigLoader::load()?;
    let store = args.store.open(&config).await?;

    match args.command {
        RunsCommands::List => list_runs(store.as_ref()).await,
        RunsCommands::Show { id, limit } => show_run(store.as_ref(), RunId(id), limit).await,
        RunsCommands::Export { id, output } => export_run(store.as_ref(), RunId(id), output).await,
    }
}

async fn list_runs(store: &dyn BenchmarkStore) -> Result<()> {
    let runs = store.get_all_runs().await?;
    if runs.is_empty() {
        println!("No runs recorded yet.");
        return Ok(());
    }

    let mut table = new_table(&[
        "ID", "Model", "Mode", "Status", "Started", "Configs", "Tests", "Best",
    ]);
    for run in &runs {
        table.add_row(vec![
            Cell::new(run.id),
            Cell::new(truncate_str(&run.model_name, 32)),
            Cell::new(run.sweep_mode.as_str()),
            Cell::new(run.status.as_str()),
            Cell::new(format_timestamp(run.started_at)),
            Cell::new(run.total_configs),
            Cell::new(run.total_tests),
            Cell::new(format_score(run.best_score)),
        ]);
    }
    println!("{table}");
    Ok(())
}

async fn show_run(store: &dyn BenchmarkStore, run_id: RunId, limit: usize) -> Result<()> {
    let run = require_run(store, run_id).await?;
    let results = store.get_results_for_run(run_id).await?;

    print_run_header(&run, results.len());

    if results.is_empty() {
        println!();
        println!("No results recorded.");
        return Ok(());
    }

    let mut table = new_table(&[
        "Test case",
        "Configuration",
        "Score",
        "Pass",
        "tok/s",
        "TTFT ms",
        "Response",
    ]);
    for result in results.iter().take(limit) {
        table.add_row(vec![
            Cell::new(truncate_str(&result.test_case_name, 24)),
            Cell::new(result.config.to_short_string()),
            Cell::new(format!("{:.1}%", result.match_percentage)),
            Cell::new(if result.is_pass { "yes" } else { "no" }),
            Cell::new(format!("{:.1}", result.metrics.tokens_per_second)),
            Cell::new(format!("{:.0}", result.metrics.time_to_first_token_ms)),
            Cell::new(truncate_str(&result.response, 40)),
        ]);
    }
    println!();
    println!("{table}");
    if results.len() > limit {
        println!("({} more results; use --limit or export)", results.len() - limit);
    }
    Ok(())
}

async fn export_run(
    store: &dyn BenchmarkStore,
    run_id: RunId,
    output: Option<PathBuf>,
) -> Result<()> {
    require_run(store, run_id).await?;
    let results = store.get_results_for_run(run_id).await?;
    let csv = render_csv(&results);

    match output {
        Some(path) => {
            std::fs::write(&path, csv)
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!("Exported {} results to {}", results.len(), path.display());
        }
        None => print!("{}", csv),
    }
    Ok(())
}

async fn require_run(store: &dyn BenchmarkStore, run_id: RunId) -> Result<RunRecord> {
    match store.get_run(run_id).await? {
        Some(run) => Ok(run),
        None => bail!("Run {} not found", run_id),
    }
}

fn print_run_header(run: &RunRecord, result_count: usize) {
    println!("Run {}", run.id);
    println!("{}", "─".repeat(60));
    println!("Model:    {} ({})", run.model_name, run.model_path);
    println!("Mode:     {}", run.sweep_mode.as_str());
    println!("Status:   {}", run.status.as_str());
    println!("Started:  {}", format_timestamp(run.started_at));
    if let Some(finished) = run.finished_at {
        println!("Finished: {}", format_timestamp(finished));
    }
    println!(
        "Results:  {}/{} ({} configurations x {} test cases)",
        result_count,
        run.total_runs(),
        run.total_configs,
        run.total_tests
    );
    if let Some(best) = &run.best_config {
        println!();
        println!("Best configuration ({}):", format_score(run.best_score));
        print_configuration(best);
    }
}

fn format_timestamp(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

fn format_score(score: Option<f64>) -> String {
    score.map_or_else(|| "-".to_string(), |s| format!("{:.1}%", s))
}
