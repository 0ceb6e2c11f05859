use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod config;

#[derive(Parser)]
#[command(name = "autobench", about = "Sampling-parameter sweeps for local LLMs")]
#[command(version, propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a parameter sweep against a model
    Run(commands::run::RunArgs),
    /// Count the configurations a sweep expands to
    Count(commands::count::CountArgs),
    /// Inspect and export stored runs
    Runs(commands::runs::RunsArgs),
    /// Show the best stored configuration for a model
    Best(commands::best::BestArgs),
    /// Create and inspect dataset files
    Dataset(commands::dataset::DatasetArgs),
    /// Check a model's score history for drift
    History(commands::history::HistoryArgs),
    /// List hill-climb candidates around the best configuration
    Neighbors(commands::neighbors::NeighborsArgs),
    /// Manage configuration
    Config(commands::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run(args) => commands::run::run(args).await,
        Commands::Count(args) => commands::count::run(args),
        Commands::Runs(args) => commands::runs::run(args).await,
        Commands::Best(args) => commands::best::run(args).await,
        Commands::Dataset(args) => commands::dataset::run(args),
        Commands::History(args) => commands::history::run(args).await,
        Commands::Neighbors(args) => commands::neighbors::run(args).await,
        Commands::Config(args) => commands::config::run(args),
    }
}
