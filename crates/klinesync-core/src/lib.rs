//! # klinesync-core
//!
//! Incremental market-data synchronization for OHLCV bar histories.
//!
//! ## Overview
//!
//! Given an exchange symbol and a bar interval, the [`SyncEngine`] keeps a
//! durable local cache current by fetching only the data missing since the
//! last sync, and hands downstream consumers a gap-free, deduplicated,
//! time-ascending [`BarSeries`]. The engine reconciles a paginated remote
//! API with the local store under partial failure: network errors are
//! retried with bounded backoff, a stale cache is served when the remote is
//! unreachable, and a corrupt cache degrades to a fresh backfill.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Exchange source adapters (Binance klines) |
//! | [`domain`] | Domain models (Symbol, Interval, Bar, BarSeries) |
//! | [`error`] | Validation and sync error types |
//! | [`exchange`] | `BarSource` contract and fetch request types |
//! | [`http_client`] | HTTP transport seam |
//! | [`pacing`] | Inter-page pacing |
//! | [`retry`] | Bounded retry with backoff |
//! | [`sync`] | The sync engine |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::str::FromStr;
//! use std::sync::Arc;
//!
//! use klinesync_core::{
//!     BarStore, BinanceAdapter, Interval, Symbol, SyncConfig, SyncEngine,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let source = Arc::new(BinanceAdapter::default());
//!     let store = BarStore::new("cache");
//!     let engine = SyncEngine::new(source, store, SyncConfig::default());
//!
//!     let series = engine
//!         .sync(Symbol::parse("BTC/USDT")?, Interval::from_str("5m")?)
//!         .await?;
//!
//!     println!("{} bars for {}", series.len(), series.symbol);
//!     Ok(())
//! }
//! ```
//!
//! ## Failure Policy
//!
//! The availability/correctness trade-off is asymmetric by design:
//!
//! - Remote unreachable, non-empty cache → the cached series is returned
//!   unchanged (stale-but-available), nothing is persisted.
//! - Remote unreachable, no cache → [`SyncError::Fetch`] names the key;
//!   there is no truth to fall back on.
//! - The engine never returns a partially-merged, unsorted, or
//!   duplicate-bearing sequence.

pub mod adapters;
pub mod domain;
pub mod error;
pub mod exchange;
pub mod http_client;
pub mod pacing;
pub mod retry;
pub mod sync;

// Adapter implementations
pub use adapters::BinanceAdapter;

// Domain models
pub use domain::{format_ts, to_datetime, Bar, BarSeries, CacheKey, Interval, Symbol};

// Error types
pub use error::{SyncError, ValidationError};

// Source contract
pub use exchange::{BarSource, FetchRequest, SourceError, SourceErrorKind};

// HTTP transport
pub use http_client::{HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient};

// Pacing
pub use pacing::PagePacer;

// Retry logic
pub use retry::{Backoff, RetryPolicy};

// Sync engine
pub use sync::{SyncConfig, SyncEngine};

// Cache store (re-exported from klinesync-cache)
pub use klinesync_cache::{BarRecord, BarStore, StoreError};
