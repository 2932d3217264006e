//! Remote bar source contract and its request/error types.
//!
//! A source returns one page of ascending bars per call. Fewer rows than
//! the requested limit signal end-of-available-data in the direction being
//! paged; the sync engine owns cursor advancement and pagination.

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use crate::domain::{Bar, Interval, Symbol};

/// Default per-request network timeout for bar fetches.
pub const DEFAULT_FETCH_TIMEOUT_MS: u64 = 30_000;

/// Classification of a remote source failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    Unavailable,
    RateLimited,
    Timeout,
    InvalidRequest,
    MalformedPayload,
    Internal,
}

/// Structured source error; `retryable` drives the engine's retry loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    retryable: bool,
}

impl SourceError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Unavailable,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::RateLimited,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Timeout,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::InvalidRequest,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn malformed_payload(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::MalformedPayload,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Internal,
            message: message.into(),
            retryable: false,
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for SourceError {}

/// One paginated bar request against a remote source.
///
/// At most one of `since`/`until` is set: `since` pages forward from a
/// millisecond cursor (inclusive), `until` pages backward (inclusive).
/// Callers pass `tail + 1` or `head - 1` so boundary bars are not
/// re-fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub symbol: Symbol,
    pub interval: Interval,
    pub since: Option<i64>,
    pub until: Option<i64>,
    pub limit: usize,
    pub timeout_ms: u64,
}

impl FetchRequest {
    /// Request the most recent page.
    pub fn latest(symbol: Symbol, interval: Interval, limit: usize) -> Result<Self, SourceError> {
        if limit == 0 {
            return Err(SourceError::invalid_request(
                "fetch request limit must be greater than zero",
            ));
        }
        Ok(Self {
            symbol,
            interval,
            since: None,
            until: None,
            limit,
            timeout_ms: DEFAULT_FETCH_TIMEOUT_MS,
        })
    }

    /// Page forward: rows at or after `since`.
    pub fn since(
        symbol: Symbol,
        interval: Interval,
        since: i64,
        limit: usize,
    ) -> Result<Self, SourceError> {
        let mut request = Self::latest(symbol, interval, limit)?;
        request.since = Some(since);
        Ok(request)
    }

    /// Page backward: rows at or before `until`.
    pub fn until(
        symbol: Symbol,
        interval: Interval,
        until: i64,
        limit: usize,
    ) -> Result<Self, SourceError> {
        let mut request = Self::latest(symbol, interval, limit)?;
        request.until = Some(until);
        Ok(request)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = timeout.as_millis() as u64;
        self
    }
}

/// Remote bar source contract.
///
/// Implementations must be `Send + Sync`; one source instance serves
/// concurrent syncs for independent keys.
pub trait BarSource: Send + Sync {
    /// Fetch one page of bars in ascending time order.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] on transport failure, remote rejection, or an
    /// unparseable payload. The `retryable` flag tells the engine whether
    /// another attempt can succeed.
    fn fetch_bars<'a>(
        &'a self,
        req: FetchRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Bar>, SourceError>> + Send + 'a>>;
}
