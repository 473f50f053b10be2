//! Footref - static pages with ordered, deferred footnotes.

mod build;
mod cli;
mod config;
mod content;
mod footnote;
mod logger;
mod render;
mod resolve;
mod utils;
mod watch;

use anyhow::{Result, bail};
use build::{build_site, resolve_site};
use clap::Parser;
use cli::{Cli, Commands};
use config::SiteConfig;
use std::path::Path;
use watch::watch_for_changes_blocking;

fn main() -> Result<()> {
    let cli: &'static Cli = Box::leak(Box::new(Cli::parse()));
    let config: &'static SiteConfig = Box::leak(Box::new(load_config(cli)?));

    match &cli.command {
        Commands::Build { .. } => {
            build_site(config, config.build.footnotes.resolve).map(|_| ())
        }
        Commands::Resolve => {
            if !config.build.output.exists() {
                bail!(
                    "Output directory `{}` not found, run `footref build` first",
                    config.build.output.display()
                );
            }
            resolve_site(config).map(|_| ())
        }
        Commands::Watch => watch_for_changes_blocking(config),
    }
}

/// Load and validate configuration from CLI arguments
fn load_config(cli: &'static Cli) -> Result<SiteConfig> {
    let root = cli.root.as_deref().unwrap_or(Path::new("./"));
    let config_path = root.join(&cli.config);

    if !config_path.exists() {
        bail!("Config file `{}` not found.", config_path.display());
    }

    let mut config = SiteConfig::from_path(&config_path)?;
    config.update_with_cli(cli);
    config.validate()?;

    Ok(config)
}
