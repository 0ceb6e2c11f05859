//! Report how many configurations a sweep expands to.

use std::path::PathBuf;

use anyhow::Result;
use autobench_core::sweep;
use clap::Args;

use super::load_dataset;
use super::run::SweepOverrides;
use crate::config::ConfigLoader;

/// Count command arguments
#[derive(Args, Debug)]
pub struct CountArgs {
    /// Also report total runs for this dataset
    #[arg(short, long)]
    pub dataset: Option<PathBuf>,

    #[command(flatten)]
    pub sweep: SweepOverrides,
}

/// Run the count command
pub fn run(args: CountArgs) -> Result<()> {
    let config = ConfigLoader::load()?;
    let mut sweep_config = config.sweep.clone();
    args.sweep.apply(&mut sweep_config);

    let configs = sweep::count(&sweep_config)?;
    println!("{} configurations ({})", configs, sweep_config.mode.as_str());

    let dataset_path = args.dataset.or(config.benchmark.dataset);
    let dataset = load_dataset(dataset_path.as_deref())?;
    println!(
        "{} test cases in '{}' -> {} inference calls",
        dataset.test_cases.len(),
        dataset.name,
        configs * dataset.test_cases.len()
    );
    Ok(())
}
