//! Incremental sync engine: pagination, retry, merge, persist.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use klinesync_cache::{BarRecord, BarStore};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};

use crate::domain::{format_ts, Bar, BarSeries, CacheKey, Interval, Symbol};
use crate::error::SyncError;
use crate::exchange::{BarSource, FetchRequest, SourceError};
use crate::pacing::PagePacer;
use crate::retry::RetryPolicy;

/// Tunables for the sync engine.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Maximum rows per remote page.
    pub page_limit: usize,
    /// Historical depth to backfill when no cache exists.
    pub target_depth: usize,
    /// Per-request network timeout.
    pub timeout: Duration,
    /// Retry policy applied to each page fetch.
    pub retry: RetryPolicy,
    /// Minimum gap between consecutive page fetches.
    pub page_delay: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            page_limit: 1_000,
            target_depth: 100_000,
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            page_delay: Duration::from_millis(100),
        }
    }
}

/// Orchestrates cache-aware incremental bar synchronization.
///
/// One engine serves any number of (symbol, interval) keys. Syncs for
/// different keys run independently; syncs for the same key are serialized
/// through a per-key lock so a save never races another sync of that key.
pub struct SyncEngine {
    source: Arc<dyn BarSource>,
    store: BarStore,
    config: SyncConfig,
    pacer: Option<PagePacer>,
    key_locks: Mutex<HashMap<CacheKey, Arc<AsyncMutex<()>>>>,
}

impl SyncEngine {
    pub fn new(source: Arc<dyn BarSource>, store: BarStore, config: SyncConfig) -> Self {
        let pacer = PagePacer::new(config.page_delay);
        Self {
            source,
            store,
            config,
            pacer,
            key_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Sync a key using the configured backfill depth.
    pub async fn sync(&self, symbol: Symbol, interval: Interval) -> Result<BarSeries, SyncError> {
        self.sync_with_depth(symbol, interval, self.config.target_depth)
            .await
    }

    /// Sync a key, bounding the initial backfill at `target_depth` bars.
    ///
    /// Returns the merged, ascending, deduplicated series. When the remote
    /// is unreachable and a non-empty cache exists, the cached series is
    /// returned unchanged instead of an error; with no cache to fall back
    /// on, the fetch failure is surfaced.
    pub async fn sync_with_depth(
        &self,
        symbol: Symbol,
        interval: Interval,
        target_depth: usize,
    ) -> Result<BarSeries, SyncError> {
        let key = CacheKey::new(symbol, interval);
        let lock = self.key_lock(&key);
        let _guard = lock.lock().await;

        let resource = key.resource();
        let cached: Vec<Bar> = self
            .store
            .load(&resource)
            .into_iter()
            .map(Bar::from)
            .collect();
        let last_ts = cached.last().map(|bar| bar.ts);
        if let Some(last) = last_ts {
            info!(key = %key, rows = cached.len(), latest = %format_ts(last), "loaded cached bars");
        }

        let fetched = match last_ts {
            Some(last) => self.fetch_incremental(&key, last).await,
            None => self.fetch_backfill(&key, target_depth).await,
        };

        let new_bars = match fetched {
            Ok(bars) => bars,
            Err(err) => {
                if cached.is_empty() {
                    return Err(SyncError::Fetch { key, source: err });
                }
                warn!(key = %key, error = %err, "fetch failed, serving cached bars");
                return Ok(BarSeries::new(key.symbol, key.interval, cached));
            }
        };

        if new_bars.is_empty() {
            debug!(key = %key, "no new bars, cache is current");
            return Ok(BarSeries::new(key.symbol, key.interval, cached));
        }

        let merged = merge_bars(cached, new_bars);
        let records: Vec<BarRecord> = merged.iter().copied().map(BarRecord::from).collect();
        self.store
            .save(&resource, &records)
            .map_err(|source| SyncError::Persist {
                key: key.clone(),
                source,
            })?;

        info!(key = %key, rows = merged.len(), "synced and persisted bars");
        Ok(BarSeries::new(key.symbol, key.interval, merged))
    }

    /// Fetch pages strictly newer than the cached tail.
    async fn fetch_incremental(
        &self,
        key: &CacheKey,
        last_ts: i64,
    ) -> Result<Vec<Bar>, SourceError> {
        let mut new_bars = Vec::new();
        // cursor starts one past the cached tail so the boundary bar is not re-fetched
        let mut since = last_ts + 1;

        loop {
            let request =
                FetchRequest::since(key.symbol.clone(), key.interval, since, self.config.page_limit)?
                    .with_timeout(self.config.timeout);
            let page = self.fetch_page(key, request).await?;

            let Some(page_last) = page.last().map(|bar| bar.ts) else {
                break;
            };
            let page_len = page.len();
            new_bars.extend(page);
            debug!(key = %key, fetched = new_bars.len(), "incremental page received");

            // a short page means we've reached the present
            if page_len < self.config.page_limit {
                break;
            }
            since = page_last + 1;
        }

        Ok(new_bars)
    }

    /// Page backward from now until `target_depth` bars are held or history
    /// is exhausted, keeping the most recent bars on overshoot.
    async fn fetch_backfill(
        &self,
        key: &CacheKey,
        target_depth: usize,
    ) -> Result<Vec<Bar>, SourceError> {
        info!(key = %key, target_depth, "no cache, backfilling");

        let request = FetchRequest::latest(key.symbol.clone(), key.interval, self.config.page_limit)?
            .with_timeout(self.config.timeout);
        let mut new_bars = self.fetch_page(key, request).await?;

        while new_bars.len() < target_depth {
            let Some(first_ts) = new_bars.first().map(|bar| bar.ts) else {
                break;
            };
            let request = FetchRequest::until(
                key.symbol.clone(),
                key.interval,
                first_ts - 1,
                self.config.page_limit,
            )?
            .with_timeout(self.config.timeout);
            let page = self.fetch_page(key, request).await?;
            if page.is_empty() {
                break; // history exhausted
            }

            debug!(
                key = %key,
                fetched = new_bars.len() + page.len(),
                target_depth,
                "backfill page received"
            );
            let mut next = page;
            next.extend(new_bars);
            new_bars = next;
        }

        if new_bars.len() > target_depth {
            let excess = new_bars.len() - target_depth;
            new_bars.drain(..excess);
        }

        Ok(new_bars)
    }

    /// One paced page fetch under the retry policy.
    async fn fetch_page(&self, key: &CacheKey, request: FetchRequest) -> Result<Vec<Bar>, SourceError> {
        if let Some(pacer) = &self.pacer {
            pacer.pause().await;
        }

        let policy = &self.config.retry;
        let mut attempt = 0;
        loop {
            match self.source.fetch_bars(request.clone()).await {
                Ok(page) => return Ok(page),
                Err(err) => {
                    attempt += 1;
                    if attempt >= policy.max_attempts || !err.retryable() {
                        return Err(err);
                    }
                    warn!(key = %key, attempt, error = %err, "page fetch failed, retrying");
                    tokio::time::sleep(policy.delay_for_attempt(attempt - 1)).await;
                }
            }
        }
    }

    fn key_lock(&self, key: &CacheKey) -> Arc<AsyncMutex<()>> {
        let mut locks = self
            .key_locks
            .lock()
            .expect("key lock table is not poisoned");
        locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }
}

/// Union of cached and fetched bars keyed by timestamp, later-fetched wins,
/// ascending.
fn merge_bars(cached: Vec<Bar>, fetched: Vec<Bar>) -> Vec<Bar> {
    let mut by_ts: BTreeMap<i64, Bar> = BTreeMap::new();
    for bar in cached.into_iter().chain(fetched) {
        by_ts.insert(bar.ts, bar);
    }
    by_ts.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(ts: i64, close: f64) -> Bar {
        Bar {
            ts,
            open: close,
            high: close,
            low: close,
            close,
            volume: 0.0,
        }
    }

    #[test]
    fn merge_sorts_and_deduplicates_by_timestamp() {
        let cached = vec![bar(1, 10.0), bar(3, 30.0)];
        let fetched = vec![bar(2, 20.0), bar(3, 31.0)];

        let merged = merge_bars(cached, fetched);

        let timestamps: Vec<i64> = merged.iter().map(|b| b.ts).collect();
        assert_eq!(timestamps, vec![1, 2, 3]);
        // later-fetched value wins on a duplicate timestamp
        assert_eq!(merged[2].close, 31.0);
    }

    #[test]
    fn merge_of_disjoint_ranges_is_their_concatenation() {
        let cached = vec![bar(1, 1.0), bar(2, 2.0)];
        let fetched = vec![bar(3, 3.0), bar(4, 4.0)];

        let merged = merge_bars(cached, fetched);
        assert_eq!(merged.iter().map(|b| b.ts).collect::<Vec<_>>(), vec![1, 2, 3, 4]);
    }
}
