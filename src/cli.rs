//! Command-line interface definitions.
//!
//! Defines all CLI arguments and subcommands using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Footref: a static page builder with ordered, deferred footnotes
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Project root directory (default: current directory)
    #[arg(short, long)]
    pub root: Option<PathBuf>,

    /// Output directory path (relative to project root)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Content directory path (relative to project root)
    #[arg(short, long)]
    pub content: Option<PathBuf>,

    /// Config file name (default: footref.toml)
    #[arg(short = 'C', long, default_value = "footref.toml")]
    pub config: PathBuf,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Render every page, then fill in deferred footnote numbers
    Build {
        /// Clean output directory completely before building
        #[arg(long)]
        clean: bool,

        /// Run the deferred footnote pass after rendering
        #[arg(long, action = clap::ArgAction::Set, num_args = 0..=1, default_missing_value = "true", require_equals = false)]
        resolve: Option<bool>,
    },

    /// Fill in deferred footnote numbers of an existing output directory
    Resolve,

    /// Rebuild on change. Deferred footnotes keep the placeholder number
    Watch,
}

#[allow(unused)]
impl Cli {
    pub const fn is_build(&self) -> bool {
        matches!(self.command, Commands::Build { .. })
    }
    pub const fn is_resolve(&self) -> bool {
        matches!(self.command, Commands::Resolve)
    }
    pub const fn is_watch(&self) -> bool {
        matches!(self.command, Commands::Watch)
    }
}
