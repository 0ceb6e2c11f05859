pub mod best;
pub mod config;
pub mod count;
pub mod dataset;
pub mod history;
pub mod neighbors;
pub mod run;
pub mod runs;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use autobench_core::{Configuration, TestDataset, TursoBenchmarkStore};
use clap::Args;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};

use crate::config::AutobenchConfig;

/// Database selection shared by every command that touches stored runs.
#[derive(Args, Debug, Default)]
pub struct StoreArgs {
    /// Results database (defaults to the configured or XDG data location)
    #[arg(long)]
    pub database: Option<PathBuf>,
}

impl StoreArgs {
    /// Open the database, creating its directory on first use.
    pub async fn open(&self, config: &AutobenchConfig) -> Result<Arc<TursoBenchmarkStore>> {
        let path = self
            .database
            .clone()
            .unwrap_or_else(|| config.storage.database_path());
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let store = TursoBenchmarkStore::new_local(&path)
            .await
            .with_context(|| format!("failed to open database {}", path.display()))?;
        Ok(Arc::new(store))
    }
}

/// Load a dataset file, or the built-in dataset when none is given.
pub fn load_dataset(path: Option<&Path>) -> Result<TestDataset> {
    match path {
        Some(path) => TestDataset::load_from_file(path)
            .with_context(|| format!("failed to load dataset {}", path.display())),
        None => Ok(TestDataset::builtin()),
    }
}

/// A table with the house style and the given header.
pub fn new_table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(header.iter().map(|h| Cell::new(h).fg(Color::Cyan)));
    table
}

/// Print every field of a configuration, one per line.
pub fn print_configuration(config: &Configuration) {
    println!("  temperature:       {:.2}", config.temperature);
    println!("  top_p:             {:.2}", config.top_p);
    println!("  top_k:             {}", config.top_k);
    println!("  min_p:             {:.2}", config.min_p);
    println!("  repeat_penalty:    {:.2}", config.repeat_penalty);
    println!("  frequency_penalty: {:.2}", config.frequency_penalty);
    println!("  presence_penalty:  {:.2}", config.presence_penalty);
    println!("  max_tokens:        {}", config.max_tokens);
    println!("  seed:              {}", config.seed);
}

/// Compact duration such as `1h02m03s`, `4m05s` or `12s`.
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    let (hours, minutes, seconds) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if hours > 0 {
        format!("{}h{:02}m{:02}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m{:02}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

/// Truncate to `max` characters, marking the cut with an ellipsis.
pub fn truncate_str(s: &str, max: usize) -> String {
    let single_line = s.replace('\n', " ");
    if single_line.chars().count() <= max {
        single_line
    } else {
        let kept: String = single_line.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", kept)
    }
}
