//! # klinesync-cache
//!
//! Flat-file storage layer for klinesync bar histories.
//!
//! ## Overview
//!
//! One cache resource holds the full bar history for a single
//! (symbol, interval) pair as a CSV file with the header
//! `timestamp,open,high,low,close,volume`, timestamps in integer
//! milliseconds since the Unix epoch. The format is the durable contract:
//! it is how sync state survives process restarts.
//!
//! Design points:
//!
//! - A missing resource is a valid empty state, never an error.
//! - A corrupt or unreadable resource is downgraded to empty and logged,
//!   so the sync layer re-backfills instead of failing.
//! - Saves replace the whole resource through a write-to-temp-then-rename
//!   swap; a concurrent reader observes fully-old or fully-new contents.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use klinesync_cache::{BarRecord, BarStore};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = BarStore::new("cache");
//!
//!     let rows = vec![BarRecord {
//!         timestamp: 1_700_000_000_000,
//!         open: 100.0,
//!         high: 101.5,
//!         low: 99.0,
//!         close: 101.0,
//!         volume: 1_250.0,
//!     }];
//!     store.save("BTC_USDT_5m", &rows)?;
//!
//!     assert_eq!(store.load("BTC_USDT_5m"), rows);
//!     assert_eq!(store.latest_timestamp("BTC_USDT_5m"), Some(1_700_000_000_000));
//!
//!     Ok(())
//! }
//! ```

mod csv_store;
mod error;
mod models;

pub use csv_store::BarStore;
pub use error::StoreError;
pub use models::BarRecord;
