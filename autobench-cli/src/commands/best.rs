//! Show the best stored configuration for a model.

use anyhow::Result;
use autobench_core::BenchmarkStore;
use clap::Args;

use super::{StoreArgs, print_configuration};
use crate::config::ConfigLoader;

/// Best command arguments
#[derive(Args, Debug)]
pub struct BestArgs {
    /// Model path or tag, as given to `autobench run`
    #[arg(short, long)]
    pub model: String,

    /// Print the configuration as JSON
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub store: StoreArgs,
}

/// Run the best command
pub async fn run(args: BestArgs) -> Result<()> {
    let config = ConfigLoader::load()?;
    let store = args.store.open(&config).await?;

    let Some(best) = store.get_best_config_for_model(&args.model).await? else {
        println!("No finished run with a best configuration for {}", args.model);
        return Ok(());
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&best)?);
    } else {
        println!("Best configuration for {}:", args.model);
        print_configuration(&best);
    }
    Ok(())
}
