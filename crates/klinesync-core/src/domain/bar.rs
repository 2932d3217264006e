use std::fmt::{Display, Formatter};

use klinesync_cache::BarRecord;
use serde::{Deserialize, Serialize};

use crate::{Interval, Symbol, ValidationError};

/// One OHLCV observation for a fixed interval.
///
/// `ts` is milliseconds since the Unix epoch, UTC. Within a cached series
/// there is exactly one bar per distinct timestamp. Beyond requiring finite
/// numeric fields, the layer does not interpret bar semantics; range checks
/// belong to the analysis consumer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub ts: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    pub fn new(
        ts: i64,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Result<Self, ValidationError> {
        for (field, value) in [
            ("open", open),
            ("high", high),
            ("low", low),
            ("close", close),
            ("volume", volume),
        ] {
            if !value.is_finite() {
                return Err(ValidationError::NonFiniteValue { field });
            }
        }

        Ok(Self {
            ts,
            open,
            high,
            low,
            close,
            volume,
        })
    }
}

impl From<BarRecord> for Bar {
    fn from(record: BarRecord) -> Self {
        Self {
            ts: record.timestamp,
            open: record.open,
            high: record.high,
            low: record.low,
            close: record.close,
            volume: record.volume,
        }
    }
}

impl From<Bar> for BarRecord {
    fn from(bar: Bar) -> Self {
        Self {
            timestamp: bar.ts,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
        }
    }
}

/// Identifies one cached bar history.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub symbol: Symbol,
    pub interval: Interval,
}

impl CacheKey {
    pub fn new(symbol: Symbol, interval: Interval) -> Self {
        Self { symbol, interval }
    }

    /// Resource name handed to the cache store: `BTC/USDT` at 5m →
    /// `BTC_USDT_5m`.
    pub fn resource(&self) -> String {
        format!("{}_{}", self.symbol.cache_name(), self.interval)
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.symbol, self.interval)
    }
}

/// Ordered, deduplicated bar sequence plus its identifying metadata.
///
/// This is what the engine hands the downstream analysis consumer; the raw
/// persisted form never leaves the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarSeries {
    pub symbol: Symbol,
    pub interval: Interval,
    pub bars: Vec<Bar>,
}

impl BarSeries {
    pub fn new(symbol: Symbol, interval: Interval, bars: Vec<Bar>) -> Self {
        Self {
            symbol,
            interval,
            bars,
        }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Timestamp of the newest bar, if any.
    pub fn latest_ts(&self) -> Option<i64> {
        self.bars.last().map(|bar| bar.ts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_finite_fields() {
        let err = Bar::new(1_000, f64::NAN, 1.0, 1.0, 1.0, 0.0).expect_err("must fail");
        assert!(matches!(
            err,
            ValidationError::NonFiniteValue { field: "open" }
        ));
    }

    #[test]
    fn bar_and_record_roundtrip() {
        let bar = Bar::new(1_000, 1.0, 2.0, 0.5, 1.5, 42.0).expect("bar");
        assert_eq!(Bar::from(BarRecord::from(bar)), bar);
    }

    #[test]
    fn cache_key_resource_is_path_safe() {
        let key = CacheKey::new(
            Symbol::parse("BTC/USDT").expect("symbol"),
            Interval::FiveMinutes,
        );
        assert_eq!(key.resource(), "BTC_USDT_5m");
    }
}
