//! Hill-climb candidates around a model's best configuration.

use anyhow::{Result, bail};
use autobench_core::BenchmarkStore;
use autobench_core::optimization::{DEFAULT_STEP, neighbors};
use clap::Args;
use comfy_table::Cell;

use super::{StoreArgs, new_table};
use crate::config::ConfigLoader;

/// Neighbors command arguments
#[derive(Args, Debug)]
pub struct NeighborsArgs {
    /// Model path or tag, as given to `autobench run`
    #[arg(short, long)]
    pub model: String,

    /// Adjustment applied to each parameter
    #[arg(long, default_value_t = DEFAULT_STEP)]
    pub step: f64,

    /// Print the candidates as JSON
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub store: StoreArgs,
}

/// Run the neighbors command
pub async fn run(args: NeighborsArgs) -> Result<()> {
    if !(args.step.is_finite() && args.step > 0.0) {
        bail!("--step must be a positive number");
    }

    let config = ConfigLoader::load()?;
    let store = args.store.open(&config).await?;

    let Some(base) = store.get_best_config_for_model(&args.model).await? else {
        bail!("No best configuration stored for {}; run a sweep first", args.model);
    };
    let candidates = neighbors(&base, args.step);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&candidates)?);
        return Ok(());
    }

    println!("Base: {}", base.to_short_string());
    let mut table = new_table(&["#", "Configuration"]);
    for (i, candidate) in candidates.iter().enumerate() {
        table.add_row(vec![Cell::new(i + 1), Cell::new(candidate.to_short_string())]);
    }
    println!("{table}");
    Ok(())
}
