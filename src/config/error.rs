//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or validating `footref.toml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse config file")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Validation(String),
}
