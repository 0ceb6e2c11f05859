//! Inspect the merged configuration.

use std::path::Path;

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::config::ConfigLoader;

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the merged configuration with defaults filled in
    Show,
    /// Show configuration layers and the database location
    Path,
}

pub fn run(args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommands::Show => show_config(),
        ConfigCommands::Path => show_paths(),
    }
}

fn show_config() -> Result<()> {
    let config = ConfigLoader::load()?;
    print!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

fn show_paths() -> Result<()> {
    let config = ConfigLoader::load()?;
    let user = ConfigLoader::user_config_path();
    let project = ConfigLoader::project_config_path();

    println!("User config:    {}{}", user.display(), presence(&user));
    println!("Project config: {}{}", project.display(), presence(&project));
    println!("Database:       {}", config.storage.database_path().display());
    Ok(())
}

fn presence(path: &Path) -> &'static str {
    if path.exists() { "" } else { " (not found)" }
}
