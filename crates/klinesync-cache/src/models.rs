use serde::{Deserialize, Serialize};

/// Flat persisted bar row, one per CSV line.
///
/// Field order matches the on-disk header:
/// `timestamp,open,high,low,close,volume`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BarRecord {
    /// Milliseconds since the Unix epoch, UTC.
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}
