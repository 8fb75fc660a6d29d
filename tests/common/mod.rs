//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{json, Value};

use fill_recon::backfill::{BackfillEngine, ManualClock, RetryPolicy};
use fill_recon::exchange::{InfoRequest, InfoResponse, InfoTransport};

/// Upstream stand-in: serves `start_time <= time <= end_time`, at most `page_cap` per call.
pub struct TimelineTransport {
    timeline: Vec<Value>,
    page_cap: usize,
    calls: Mutex<usize>,
}

impl TimelineTransport {
    pub fn new(timeline: Vec<Value>, page_cap: usize) -> Self {
        Self {
            timeline,
            page_cap,
            calls: Mutex::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock()
    }
}

impl InfoTransport for TimelineTransport {
    fn post_info(&self, request: &InfoRequest) -> anyhow::Result<InfoResponse> {
        *self.calls.lock() += 1;
        let start = request.start_time();
        let end = request.end_time().unwrap_or(i64::MAX);
        let page: Vec<&Value> = self
            .timeline
            .iter()
            .filter(|f| {
                let t = f["time"].as_i64().unwrap_or_default();
                t >= start && t <= end
            })
            .take(self.page_cap)
            .collect();
        Ok(InfoResponse::ok(serde_json::to_string(&page)?))
    }
}

pub fn raw_fill(coin: &str, side: &str, px: &str, time: i64, tid: i64) -> Value {
    json!({
        "coin": coin,
        "side": side,
        "px": px,
        "sz": "0.5",
        "time": time,
        "tid": tid,
        "hash": format!("0x{:x}", tid),
        "crossed": tid % 2 == 0,
    })
}

pub fn engine(transport: TimelineTransport, now_ms: i64) -> BackfillEngine<TimelineTransport> {
    BackfillEngine::new(transport, RetryPolicy::default())
        .with_clock(Arc::new(ManualClock::new(now_ms)))
}
