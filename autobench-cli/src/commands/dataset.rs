//! Create and inspect dataset files.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use autobench_core::TestDataset;
use clap::{Args, Subcommand};
use comfy_table::Cell;

use super::{new_table, truncate_str};

/// Dataset management arguments
#[derive(Args, Debug)]
pub struct DatasetArgs {
    #[command(subcommand)]
    pub command: DatasetCommands,
}

/// Dataset subcommands
#[derive(Subcommand, Debug)]
pub enum DatasetCommands {
    /// Write the built-in dataset to a file as a starting point
    Init {
        /// Destination JSON file
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
    /// Validate a dataset file and list its test cases
    Show {
        /// Dataset JSON file
        path: PathBuf,
    },
}

/// Run dataset command
pub fn run(args: DatasetArgs) -> Result<()> {
    match args.command {
        DatasetCommands::Init { path, force } => init_dataset(path, force),
        DatasetCommands::Show { path } => show_dataset(path),
    }
}

fn init_dataset(path: PathBuf, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    let dataset = TestDataset::builtin();
    dataset
        .save_to_file(&path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    println!(
        "Wrote {} test cases to {}",
        dataset.test_cases.len(),
        path.display()
    );
    Ok(())
}

fn show_dataset(path: PathBuf) -> Result<()> {
    let dataset = TestDataset::load_from_file(&path)
        .with_context(|| format!("failed to load dataset {}", path.display()))?;

    println!("Dataset: {} ({} test cases)", dataset.name, dataset.test_cases.len());
    if dataset.test_cases.is_empty() {
        return Ok(());
    }

    let mut table = new_table(&["Name", "Difficulty", "Match", "Threshold", "Prompt"]);
    for case in &dataset.test_cases {
        table.add_row(vec![
            Cell::new(&case.name),
            Cell::new(case.difficulty.as_str()),
            Cell::new(case.match_mode.as_str()),
            Cell::new(format!("{:.0}", case.similarity_threshold)),
            Cell::new(truncate_str(&case.prompt, 48)),
        ]);
    }
    println!("{table}");
    Ok(())
}
