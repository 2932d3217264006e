//! Shared fixtures for klinesync behavior tests.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::time::Duration;

use klinesync_core::{Bar, BarSource, FetchRequest, RetryPolicy, SourceError, SyncConfig};

type ScriptedResponse = Result<Vec<Bar>, SourceError>;

/// Scripted in-memory bar source: pops one canned response per fetch and
/// records every request it sees.
///
/// Responses can be scripted globally ([`ScriptedSource::new`]) or per
/// symbol ([`ScriptedSource::keyed`] plus [`ScriptedSource::script_for`])
/// when a test runs syncs for several keys concurrently.
#[derive(Default)]
pub struct ScriptedSource {
    global: Mutex<VecDeque<ScriptedResponse>>,
    by_symbol: Mutex<HashMap<String, VecDeque<ScriptedResponse>>>,
    requests: Mutex<Vec<FetchRequest>>,
}

impl ScriptedSource {
    pub fn new(responses: Vec<ScriptedResponse>) -> Self {
        Self {
            global: Mutex::new(responses.into()),
            ..Self::default()
        }
    }

    pub fn keyed() -> Self {
        Self::default()
    }

    pub fn script_for(&self, symbol: &str, responses: Vec<ScriptedResponse>) {
        self.by_symbol
            .lock()
            .unwrap()
            .insert(symbol.to_owned(), responses.into());
    }

    /// Every request seen so far, in arrival order.
    pub fn request_log(&self) -> Vec<FetchRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn next_response(&self, symbol: &str) -> ScriptedResponse {
        let mut by_symbol = self.by_symbol.lock().unwrap();
        if let Some(queue) = by_symbol.get_mut(symbol) {
            return queue
                .pop_front()
                .unwrap_or_else(|| Err(SourceError::internal("scripted source exhausted")));
        }
        self.global
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(SourceError::internal("scripted source exhausted")))
    }
}

impl BarSource for ScriptedSource {
    fn fetch_bars<'a>(
        &'a self,
        req: FetchRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Bar>, SourceError>> + Send + 'a>> {
        let response = self.next_response(req.symbol.as_str());
        self.requests.lock().unwrap().push(req);
        Box::pin(async move { response })
    }
}

/// Bar with flat prices at `ts`, good enough for ordering assertions.
pub fn bar(ts: i64) -> Bar {
    Bar {
        ts,
        open: 1.0,
        high: 1.0,
        low: 1.0,
        close: 1.0,
        volume: 0.0,
    }
}

/// `count` bars at consecutive `step`-ms marks starting at `start`.
pub fn bars_range(start: i64, count: usize, step: i64) -> Vec<Bar> {
    (0..count).map(|i| bar(start + i as i64 * step)).collect()
}

/// Zero-delay engine config for deterministic tests.
pub fn fast_config(page_limit: usize, target_depth: usize) -> SyncConfig {
    SyncConfig {
        page_limit,
        target_depth,
        timeout: Duration::from_secs(5),
        retry: RetryPolicy::fixed(Duration::ZERO, 3),
        page_delay: Duration::ZERO,
    }
}
