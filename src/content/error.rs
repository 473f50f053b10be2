//! Content loading errors.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or looking up content entries.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("IO error when reading `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Invalid front matter in `{path}`")]
    FrontMatter {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Unclosed front matter in `{0}`")]
    UnclosedFrontMatter(PathBuf),

    #[error("Entry `{slug}` not found in collection `{collection}`")]
    EntryNotFound { collection: String, slug: String },

    #[error("Article with id `{0}` not found")]
    ArticleNotFound(String),

    #[error("Collection `{0}` not found")]
    CollectionNotFound(String),
}
