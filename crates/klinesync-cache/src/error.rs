use std::path::PathBuf;

use thiserror::Error;

/// Persistence failures surfaced by the store.
///
/// Read-side problems never appear here: a missing or corrupt resource is
/// reported as an empty load, not an error.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to create cache directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to stage cache file for '{resource}': {source}")]
    Stage {
        resource: String,
        source: std::io::Error,
    },

    #[error("failed to encode cache rows for '{resource}': {source}")]
    Encode {
        resource: String,
        source: csv::Error,
    },

    #[error("failed to replace cache file for '{resource}': {source}")]
    Replace {
        resource: String,
        source: std::io::Error,
    },
}
