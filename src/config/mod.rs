//! Site configuration management for `footref.toml`.
//!
//! # Sections
//!
//! | Section             | Purpose                                        |
//! |---------------------|------------------------------------------------|
//! | `[base]`            | Site metadata (title, language)                |
//! | `[build]`           | Content/output paths, extensions, clean        |
//! | `[build.footnotes]` | Deferred footnote resolution and report        |
//! | `[watch]`           | File watcher debounce                          |
//! | `[[pages]]`         | Pages, their articles and deferred footnotes   |
//!
//! # Example
//!
//! ```toml
//! [base]
//! title = "Footnote Demo"
//!
//! [build]
//! content = "content"
//! output = "public"
//!
//! [[pages]]
//! path = ""
//! articles = "by-order"
//! deferred = ["intro-note"]
//! additional = [{ collection = "footnotes", slug = "intro" }]
//! ```

mod base;
mod build;
pub mod defaults;
mod error;
mod page;
mod watch;

pub use page::{ArticleSelection, ArticleStrategy, EntryRef, PageConfig};

use base::BaseConfig;
use build::BuildConfig;
use error::ConfigError;
use watch::WatchConfig;

use crate::cli::{Cli, Commands};
use anyhow::{Result, bail};
use educe::Educe;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration structure representing footref.toml
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct SiteConfig {
    /// CLI arguments reference
    #[serde(skip)]
    pub cli: Option<&'static Cli>,

    /// Absolute path to the config file (set after loading)
    #[serde(skip)]
    pub config_path: PathBuf,

    /// Basic site information
    #[serde(default)]
    pub base: BaseConfig,

    /// Build settings
    #[serde(default)]
    pub build: BuildConfig,

    /// File watcher settings
    #[serde(default)]
    pub watch: WatchConfig,

    /// Pages to render
    #[serde(default)]
    pub pages: Vec<PageConfig>,
}

impl SiteConfig {
    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: SiteConfig = toml::from_str(content).map_err(ConfigError::Toml)?;
        Ok(config)
    }

    /// Load configuration from file path
    pub fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        Self::from_str(&content)
    }

    /// Get the root directory path
    pub fn get_root(&self) -> &Path {
        self.build.root.as_deref().unwrap_or(Path::new("./"))
    }

    /// Set the root directory path
    pub fn set_root(&mut self, path: &Path) {
        self.build.root = Some(path.to_path_buf())
    }

    /// Absolute path of the numbering report.
    pub fn report_path(&self) -> PathBuf {
        self.build.output.join(&self.build.footnotes.report)
    }

    /// Title for `page`, falling back to the site title.
    pub fn page_title<'a>(&'a self, page: &'a PageConfig) -> &'a str {
        page.title.as_deref().unwrap_or(&self.base.title)
    }

    /// Update configuration with CLI arguments
    pub fn update_with_cli(&mut self, cli: &'static Cli) {
        self.cli = Some(cli);

        let root = cli
            .root
            .as_ref()
            .cloned()
            .unwrap_or_else(|| self.get_root().to_owned());

        self.update_path_with_root(cli, &root);

        if let Commands::Build { clean, resolve } = &cli.command {
            self.build.clean |= *clean;
            Self::update_option(&mut self.build.footnotes.resolve, resolve.as_ref());
        }
    }

    /// Update config option if CLI value is provided
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    /// Update all paths relative to root directory and normalize to absolute paths
    fn update_path_with_root(&mut self, cli: &Cli, root: &Path) {
        // Apply CLI overrides first
        Self::update_option(&mut self.build.content, cli.content.as_ref());
        Self::update_option(&mut self.build.output, cli.output.as_ref());

        // Normalize root to absolute path
        let root = Self::normalize_path(root);
        self.set_root(&root);

        self.config_path = Self::normalize_path(&root.join(&cli.config));
        self.build.content = Self::normalize_path(&root.join(&self.build.content));
        self.build.output = Self::normalize_path(&root.join(&self.build.output));
    }

    /// Normalize a path to absolute, using canonicalize if the path exists
    fn normalize_path(path: &Path) -> PathBuf {
        path.canonicalize().unwrap_or_else(|_| {
            // For non-existent paths, manually make them absolute
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                std::env::current_dir()
                    .map(|cwd| cwd.join(path))
                    .unwrap_or_else(|_| path.to_path_buf())
            }
        })
    }

    /// Validate configuration for the current command
    pub fn validate(&self) -> Result<()> {
        let resolve_only = self.cli.is_some_and(Cli::is_resolve);

        if self.build.extensions.is_empty() {
            bail!(ConfigError::Validation(
                "[build.extensions] must have at least one element".into()
            ));
        }

        if let Some(ext) = self.build.extensions.iter().find(|ext| ext.starts_with('.')) {
            bail!(ConfigError::Validation(format!(
                "[build.extensions] entry `{ext}` must not start with a dot"
            )));
        }

        if self.watch.debounce_ms == 0 {
            bail!(ConfigError::Validation(
                "[watch.debounce_ms] must be greater than 0".into()
            ));
        }

        if self.build.content == self.build.output {
            bail!(ConfigError::Validation(
                "[build.content] and [build.output] must be different directories".into()
            ));
        }

        let mut seen = FxHashSet::default();
        for page in &self.pages {
            if !seen.insert(page.normalized_path()) {
                bail!(ConfigError::Validation(format!(
                    "[[pages]] path `{}` is defined more than once",
                    page.display_name()
                )));
            }
        }

        if !resolve_only {
            if !self.build.content.exists() {
                bail!(ConfigError::Validation(format!(
                    "[build.content] `{}` not found",
                    self.build.content.display()
                )));
            }
            if !self.build.content.is_dir() {
                bail!(ConfigError::Validation(format!(
                    "[build.content] `{}` is not a directory",
                    self.build.content.display()
                )));
            }
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
