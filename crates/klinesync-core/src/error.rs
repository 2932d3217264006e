use klinesync_cache::StoreError;
use thiserror::Error;

use crate::domain::CacheKey;
use crate::exchange::SourceError;

/// Validation errors for domain type construction.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol length {len} exceeds max {max}")]
    SymbolTooLong { len: usize, max: usize },
    #[error("symbol must start with an ASCII letter or digit: '{ch}'")]
    SymbolInvalidStart { ch: char },
    #[error("symbol contains invalid character '{ch}' at index {index}")]
    SymbolInvalidChar { ch: char, index: usize },

    #[error("invalid interval '{value}', expected one of 1m, 5m, 15m, 30m, 1h, 1d, 1w, 1M")]
    InvalidInterval { value: String },

    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },
}

/// Terminal sync failures surfaced to the caller.
///
/// Each variant names the key and the stage that failed. Transient fetch
/// errors are retried inside the engine and only reach here once retries
/// are exhausted and no cached fallback exists.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("fetch failed for {key} with no cached fallback: {source}")]
    Fetch { key: CacheKey, source: SourceError },

    #[error("persist failed for {key}: {source}")]
    Persist { key: CacheKey, source: StoreError },
}
