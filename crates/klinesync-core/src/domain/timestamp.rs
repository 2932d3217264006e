use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// Convert a millisecond epoch timestamp to a UTC datetime.
///
/// Returns `None` when the value falls outside the representable range.
pub fn to_datetime(ts_ms: i64) -> Option<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(ts_ms) * 1_000_000).ok()
}

/// Human-readable RFC3339 form for logs and error messages.
///
/// Falls back to the raw millisecond value if the timestamp cannot be
/// represented as a datetime.
pub fn format_ts(ts_ms: i64) -> String {
    to_datetime(ts_ms)
        .and_then(|dt| dt.format(&Rfc3339).ok())
        .unwrap_or_else(|| format!("{ts_ms}ms"))
}
