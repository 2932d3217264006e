use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;
use tracing::warn;

use crate::domain::Bar;
use crate::exchange::{BarSource, FetchRequest, SourceError};
use crate::http_client::{HttpClient, HttpRequest, ReqwestHttpClient};

const DEFAULT_BASE_URL: &str = "https://api.binance.com";

/// Binance spot klines source.
///
/// Talks to `GET /api/v3/klines`, which returns a JSON array of arrays:
/// `[[openTime, "open", "high", "low", "close", "volume", closeTime, ...], ...]`
/// with prices encoded as strings. Only the first six fields are consumed.
#[derive(Clone)]
pub struct BinanceAdapter {
    http: Arc<dyn HttpClient>,
    base_url: String,
    strict: bool,
}

impl BinanceAdapter {
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self {
            http,
            base_url: DEFAULT_BASE_URL.to_owned(),
            strict: false,
        }
    }

    /// Point the adapter at a different endpoint (testnet, mirror).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Fail a whole page on the first malformed row instead of dropping it.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    fn klines_url(&self, req: &FetchRequest) -> String {
        let mut url = format!(
            "{}/api/v3/klines?symbol={}&interval={}&limit={}",
            self.base_url,
            req.symbol.exchange_name(),
            req.interval,
            req.limit
        );
        if let Some(since) = req.since {
            url.push_str(&format!("&startTime={since}"));
        }
        if let Some(until) = req.until {
            url.push_str(&format!("&endTime={until}"));
        }
        url
    }

    fn parse_page(&self, body: &str) -> Result<Vec<Bar>, SourceError> {
        let rows: Vec<Value> = serde_json::from_str(body).map_err(|err| {
            SourceError::malformed_payload(format!("klines response is not a JSON array: {err}"))
        })?;

        let mut bars = Vec::with_capacity(rows.len());
        for (index, row) in rows.iter().enumerate() {
            match parse_kline_row(row) {
                Ok(bar) => bars.push(bar),
                Err(reason) if self.strict => {
                    return Err(SourceError::malformed_payload(format!(
                        "malformed kline row {index}: {reason}"
                    )));
                }
                Err(reason) => {
                    warn!(index, %reason, "dropping malformed kline row");
                }
            }
        }
        Ok(bars)
    }
}

impl Default for BinanceAdapter {
    fn default() -> Self {
        Self::new(Arc::new(ReqwestHttpClient::new()))
    }
}

fn parse_kline_row(row: &Value) -> Result<Bar, String> {
    let fields = row.as_array().ok_or("row is not an array")?;
    if fields.len() < 6 {
        return Err(format!("expected at least 6 fields, got {}", fields.len()));
    }

    let ts = fields[0]
        .as_i64()
        .ok_or("open time is not an integer millisecond timestamp")?;
    let open = parse_decimal(&fields[1], "open")?;
    let high = parse_decimal(&fields[2], "high")?;
    let low = parse_decimal(&fields[3], "low")?;
    let close = parse_decimal(&fields[4], "close")?;
    let volume = parse_decimal(&fields[5], "volume")?;

    Bar::new(ts, open, high, low, close, volume).map_err(|err| err.to_string())
}

fn parse_decimal(value: &Value, field: &str) -> Result<f64, String> {
    match value {
        Value::String(raw) => raw
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("{field} is not numeric: '{raw}'")),
        Value::Number(num) => num
            .as_f64()
            .ok_or_else(|| format!("{field} is not representable as f64")),
        other => Err(format!("{field} has unexpected type: {other}")),
    }
}

impl BarSource for BinanceAdapter {
    fn fetch_bars<'a>(
        &'a self,
        req: FetchRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Bar>, SourceError>> + Send + 'a>> {
        Box::pin(async move {
            let request = HttpRequest::get(self.klines_url(&req)).with_timeout_ms(req.timeout_ms);
            let response = self.http.execute(request).await.map_err(|err| {
                if err.timed_out() {
                    SourceError::timeout(format!("klines request timed out: {}", err.message()))
                } else if err.retryable() {
                    SourceError::unavailable(format!("klines request failed: {}", err.message()))
                } else {
                    SourceError::internal(format!("klines request failed: {}", err.message()))
                }
            })?;

            // 418 is Binance's IP-ban escalation of 429
            if response.status == 429 || response.status == 418 {
                return Err(SourceError::rate_limited(format!(
                    "binance rate limit, status {}",
                    response.status
                )));
            }
            if !response.is_success() {
                if response.status >= 500 {
                    return Err(SourceError::unavailable(format!(
                        "binance returned status {}",
                        response.status
                    )));
                }
                return Err(SourceError::invalid_request(format!(
                    "binance rejected request with status {}: {}",
                    response.status,
                    response.body.trim()
                )));
            }

            self.parse_page(&response.body)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Interval, Symbol};
    use crate::exchange::SourceErrorKind;
    use crate::http_client::{HttpError, HttpResponse};

    struct StaticHttpClient {
        status: u16,
        body: String,
    }

    impl StaticHttpClient {
        fn ok(body: &str) -> Arc<Self> {
            Arc::new(Self {
                status: 200,
                body: body.to_owned(),
            })
        }

        fn status(status: u16) -> Arc<Self> {
            Arc::new(Self {
                status,
                body: String::new(),
            })
        }
    }

    impl HttpClient for StaticHttpClient {
        fn execute<'a>(
            &'a self,
            _request: HttpRequest,
        ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
            let response = HttpResponse {
                status: self.status,
                body: self.body.clone(),
            };
            Box::pin(async move { Ok(response) })
        }
    }

    fn request() -> FetchRequest {
        FetchRequest::since(
            Symbol::parse("BTC/USDT").expect("symbol"),
            Interval::FiveMinutes,
            1_000,
            500,
        )
        .expect("request")
    }

    const PAGE: &str = r#"[
        [1700000000000, "42000.1", "42100.0", "41900.5", "42050.0", "12.5", 1700000299999, "0", 10, "0", "0", "0"],
        [1700000300000, "42050.0", "42200.0", "42000.0", "42150.2", "8.25", 1700000599999, "0", 7, "0", "0", "0"]
    ]"#;

    #[tokio::test]
    async fn parses_string_encoded_prices() {
        let adapter = BinanceAdapter::new(StaticHttpClient::ok(PAGE));

        let bars = adapter.fetch_bars(request()).await.expect("bars");

        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].ts, 1_700_000_000_000);
        assert_eq!(bars[0].open, 42_000.1);
        assert_eq!(bars[1].close, 42_150.2);
        assert_eq!(bars[1].volume, 8.25);
    }

    #[tokio::test]
    async fn lenient_mode_drops_malformed_rows() {
        let body = r#"[
            [1700000000000, "42000.1", "42100.0", "41900.5", "42050.0", "12.5"],
            [1700000300000, "not-a-price", "42200.0", "42000.0", "42150.2", "8.25"]
        ]"#;
        let adapter = BinanceAdapter::new(StaticHttpClient::ok(body));

        let bars = adapter.fetch_bars(request()).await.expect("bars");

        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].ts, 1_700_000_000_000);
    }

    #[tokio::test]
    async fn strict_mode_fails_the_page_on_a_malformed_row() {
        let body = r#"[[1700000000000, "x", "1", "1", "1", "1"]]"#;
        let adapter = BinanceAdapter::new(StaticHttpClient::ok(body)).strict(true);

        let err = adapter.fetch_bars(request()).await.expect_err("must fail");

        assert_eq!(err.kind(), SourceErrorKind::MalformedPayload);
        assert!(!err.retryable());
    }

    #[tokio::test]
    async fn rate_limit_statuses_map_to_retryable_errors() {
        for status in [429, 418] {
            let adapter = BinanceAdapter::new(StaticHttpClient::status(status));
            let err = adapter.fetch_bars(request()).await.expect_err("must fail");
            assert_eq!(err.kind(), SourceErrorKind::RateLimited);
            assert!(err.retryable());
        }
    }

    #[tokio::test]
    async fn server_errors_are_retryable_but_client_errors_are_not() {
        let adapter = BinanceAdapter::new(StaticHttpClient::status(502));
        let err = adapter.fetch_bars(request()).await.expect_err("must fail");
        assert!(err.retryable());

        let adapter = BinanceAdapter::new(StaticHttpClient::status(400));
        let err = adapter.fetch_bars(request()).await.expect_err("must fail");
        assert!(!err.retryable());
    }

    #[test]
    fn url_carries_cursor_and_normalized_symbol() {
        let adapter =
            BinanceAdapter::new(StaticHttpClient::ok("[]")).with_base_url("https://testnet.local");

        let url = adapter.klines_url(&request());
        assert_eq!(
            url,
            "https://testnet.local/api/v3/klines?symbol=BTCUSDT&interval=5m&limit=500&startTime=1000"
        );

        let backward = FetchRequest::until(
            Symbol::parse("ETH/USDT").expect("symbol"),
            Interval::OneDay,
            999,
            100,
        )
        .expect("request");
        assert!(adapter.klines_url(&backward).ends_with("&endTime=999"));
    }
}
