//! Paged fill backfill.
//!
//! The upstream caps records per call and takes no page-size argument, so pages are walked by
//! moving the start cursor one millisecond past the last record seen. Two drivers sit on top of
//! [`BackfillEngine::fetch_page`]: a single-window walk and a chunked, checkpointed walk for long
//! histories that is meant to be invoked periodically.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::clock::{Clock, SystemClock};
use super::retry::RetryPolicy;
use crate::domain::{Fill, TimeWindow};
use crate::error::{BackfillError, Result};
use crate::exchange::models::decode_page;
use crate::exchange::{InfoRequest, InfoTransport, RawFill};
use crate::normalize::parse_fill;
use crate::sink::FillSink;
use crate::state::StateRepository;

pub const DEFAULT_CHUNK_MS: i64 = 86_400_000;
pub const DEFAULT_AHEAD_SAFETY_MS: i64 = 300_000;
pub const DEFAULT_MAX_EMPTY_CHUNKS: u32 = 7;

// ============================================================================
// Chunked run plan and summary
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkPlan {
    /// Default start when the wallet has no saved cursor.
    pub start_ms: i64,
    pub chunk_ms: i64,
    /// Chunks starting closer than this to "now" are left for a later run.
    pub ahead_safety_ms: i64,
    pub max_empty_chunks: u32,
    /// Wins over both the saved cursor and `start_ms`.
    pub start_ms_override: Option<i64>,
}

impl ChunkPlan {
    pub fn new(start_ms: i64) -> Self {
        Self {
            start_ms,
            chunk_ms: DEFAULT_CHUNK_MS,
            ahead_safety_ms: DEFAULT_AHEAD_SAFETY_MS,
            max_empty_chunks: DEFAULT_MAX_EMPTY_CHUNKS,
            start_ms_override: None,
        }
    }

    pub fn with_chunk_ms(mut self, chunk_ms: i64) -> Self {
        self.chunk_ms = chunk_ms;
        self
    }

    pub fn with_ahead_safety_ms(mut self, ahead_safety_ms: i64) -> Self {
        self.ahead_safety_ms = ahead_safety_ms;
        self
    }

    pub fn with_max_empty_chunks(mut self, max_empty_chunks: u32) -> Self {
        self.max_empty_chunks = max_empty_chunks;
        self
    }

    pub fn with_override(mut self, start_ms: Option<i64>) -> Self {
        self.start_ms_override = start_ms;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_ms <= 0 {
            return Err(BackfillError::InvalidPlan(format!(
                "chunk_ms must be positive, got {}",
                self.chunk_ms
            )));
        }
        if self.ahead_safety_ms < 0 {
            return Err(BackfillError::InvalidPlan(format!(
                "ahead_safety_ms must not be negative, got {}",
                self.ahead_safety_ms
            )));
        }
        if self.max_empty_chunks == 0 {
            return Err(BackfillError::InvalidPlan(
                "max_empty_chunks must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Why a chunked run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkStop {
    /// Saved state was already finished; nothing was fetched.
    AlreadyFinished,
    /// The cursor reached the live edge.
    LiveEdge,
    /// `max_empty_chunks` consecutive chunks produced no fills.
    EmptyStreak,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChunkedRun {
    pub rows: usize,
    pub chunks: u32,
    /// Chunks cut short because the page cursor stopped moving.
    pub stalled_chunks: u32,
    pub empty_streak: u32,
    pub stop: ChunkStop,
    /// Cursor as last persisted (or as loaded, when nothing ran).
    pub next_start_ms: Option<i64>,
    /// The starting cursor came from saved state rather than the plan.
    pub resumed: bool,
}

/// Summary of a single-window walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WindowRun {
    /// Fills handed to the sink.
    pub rows: usize,
    /// Records the upstream returned, including spot rows dropped during parsing.
    pub raw_rows: usize,
    pub stalled: bool,
}

// ============================================================================
// Engine
// ============================================================================

enum Attempt {
    Page(Vec<RawFill>),
    Retry(String),
}

enum ChunkStep {
    CheckEdge,
    Drain,
    Finished(ChunkStop),
}

/// Result of walking one bounded (or open) range page by page.
struct RangeWalk {
    rows: usize,
    /// Records returned upstream, spot rows included.
    raw_rows: usize,
    stalled: bool,
    sample: Option<Fill>,
}

pub struct BackfillEngine<T> {
    transport: T,
    retry: RetryPolicy,
    clock: Arc<dyn Clock>,
}

impl<T: InfoTransport> BackfillEngine<T> {
    pub fn new(transport: T, retry: RetryPolicy) -> Self {
        Self {
            transport,
            retry,
            clock: Arc::new(SystemClock),
        }
    }

    /// Swaps the wall clock, used for both backoff sleeps and the live-edge check.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// One page of fills with `start_ms <= time < end_ms`.
    ///
    /// Retryable statuses, transport failures and undecodable bodies are retried with backoff.
    /// Any other non-200 status fails at once.
    pub fn fetch_page(
        &self,
        wallet: &str,
        start_ms: i64,
        end_ms: Option<i64>,
    ) -> Result<Vec<RawFill>> {
        if matches!(end_ms, Some(end) if end <= start_ms) {
            return Ok(Vec::new());
        }
        let request = InfoRequest::user_fills_by_time(wallet, start_ms, end_ms.map(|e| e - 1));

        let max_attempts = self.retry.max_attempts;
        let mut last = String::new();
        for attempt in 0..max_attempts {
            match self.attempt(&request)? {
                Attempt::Page(rows) => {
                    debug!(wallet = %wallet, start_ms, rows = rows.len(), "page fetched");
                    return Ok(rows);
                }
                Attempt::Retry(reason) if attempt + 1 < max_attempts => {
                    let delay = self.retry.delay(attempt);
                    warn!(
                        wallet = %wallet,
                        attempt = attempt + 1,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        reason = %reason,
                        "userFillsByTime failed, retrying"
                    );
                    self.clock.sleep(delay);
                    last = reason;
                }
                Attempt::Retry(reason) => {
                    warn!(
                        wallet = %wallet,
                        attempt = attempt + 1,
                        max_attempts,
                        reason = %reason,
                        "userFillsByTime failed, giving up"
                    );
                    last = reason;
                }
            }
        }

        Err(BackfillError::Transient {
            attempts: max_attempts,
            last,
        })
    }

    fn attempt(&self, request: &InfoRequest) -> Result<Attempt> {
        let response = match self.transport.post_info(request) {
            Ok(response) => response,
            Err(e) => return Ok(Attempt::Retry(format!("transport error: {:#}", e))),
        };

        if response.is_success() {
            return Ok(match decode_page(&response.body) {
                Ok(rows) => Attempt::Page(rows),
                Err(e) => Attempt::Retry(format!("undecodable body: {}", e)),
            });
        }
        if self.retry.is_retryable_status(response.status) {
            return Ok(Attempt::Retry(format!("HTTP {}", response.status)));
        }
        Err(BackfillError::fatal(response.status, &response.body))
    }

    /// Pages through `[start_ms, end_ms)` feeding parsed fills to `sink`.
    ///
    /// Stops on an empty page, once the cursor reaches `end_ms`, or when the cursor would not
    /// move forward.
    fn drain_range(
        &self,
        wallet: &str,
        start_ms: i64,
        end_ms: Option<i64>,
        sink: &mut dyn FillSink,
    ) -> Result<RangeWalk> {
        let mut walk = RangeWalk {
            rows: 0,
            raw_rows: 0,
            stalled: false,
            sample: None,
        };
        let mut cursor = start_ms;

        loop {
            if matches!(end_ms, Some(end) if cursor >= end) {
                break;
            }
            let page = self.fetch_page(wallet, cursor, end_ms)?;
            let Some(last_time) = page.last().map(|raw| raw.time) else {
                break;
            };
            walk.raw_rows += page.len();

            for raw in &page {
                let Some(fill) = parse_fill(wallet, raw)? else {
                    continue;
                };
                if walk.sample.is_none() {
                    walk.sample = Some(fill.clone());
                }
                sink.add(fill)?;
                walk.rows += 1;
                if sink.should_flush() {
                    sink.flush()?;
                }
            }

            let next = last_time.saturating_add(1);
            if next <= cursor {
                warn!(
                    wallet = %wallet,
                    cursor,
                    last_time,
                    "cursor did not advance, abandoning range"
                );
                walk.stalled = true;
                break;
            }
            cursor = next;
        }

        Ok(walk)
    }

    /// Backfills one window to completion and returns the number of fills delivered.
    pub fn process_wallet(
        &self,
        wallet: &str,
        window: &TimeWindow,
        sink: &mut dyn FillSink,
    ) -> Result<usize> {
        Ok(self.backfill_window(wallet, window, sink)?.rows)
    }

    /// Same walk as [`Self::process_wallet`], reporting upstream record counts as well.
    pub fn backfill_window(
        &self,
        wallet: &str,
        window: &TimeWindow,
        sink: &mut dyn FillSink,
    ) -> Result<WindowRun> {
        let walk = self.drain_range(wallet, window.start_ms(), Some(window.end_ms()), sink)?;
        sink.flush()?;

        info!(
            wallet = %wallet,
            start_ms = window.start_ms(),
            end_ms = window.end_ms(),
            rows = walk.rows,
            raw_rows = walk.raw_rows,
            stalled = walk.stalled,
            "window backfill complete"
        );
        Ok(WindowRun {
            rows: walk.rows,
            raw_rows: walk.raw_rows,
            stalled: walk.stalled,
        })
    }

    /// Resumable backfill in fixed-size chunks, checkpointing after every chunk.
    ///
    /// The starting cursor is the plan override, else the saved cursor, else `plan.start_ms`.
    /// A wallet already marked finished is left untouched.
    pub fn process_wallet_chunked(
        &self,
        wallet_id: i64,
        wallet: &str,
        plan: &ChunkPlan,
        sink: &mut dyn FillSink,
        state_repo: &dyn StateRepository,
    ) -> Result<ChunkedRun> {
        plan.validate()?;

        let state = state_repo.load(wallet_id)?;
        if state.finished {
            info!(wallet = %wallet, wallet_id, "wallet already finished");
            return Ok(ChunkedRun {
                rows: 0,
                chunks: 0,
                stalled_chunks: 0,
                empty_streak: 0,
                stop: ChunkStop::AlreadyFinished,
                next_start_ms: state.next_start_ms,
                resumed: false,
            });
        }

        let resumed = plan.start_ms_override.is_none() && state.next_start_ms.is_some();
        let mut cursor = plan
            .start_ms_override
            .or(state.next_start_ms)
            .unwrap_or(plan.start_ms);

        let mut run = ChunkedRun {
            rows: 0,
            chunks: 0,
            stalled_chunks: 0,
            empty_streak: 0,
            stop: ChunkStop::LiveEdge,
            next_start_ms: Some(cursor),
            resumed,
        };

        let mut step = ChunkStep::CheckEdge;
        loop {
            step = match step {
                ChunkStep::CheckEdge => {
                    let now_ms = self.clock.now_ms();
                    if now_ms.saturating_sub(cursor) < plan.ahead_safety_ms {
                        state_repo.save(wallet_id, cursor, true)?;
                        debug!(wallet = %wallet, cursor, now_ms, "reached live edge");
                        ChunkStep::Finished(ChunkStop::LiveEdge)
                    } else {
                        ChunkStep::Drain
                    }
                }
                ChunkStep::Drain => {
                    let chunk_start = cursor;
                    let chunk_end = chunk_start.saturating_add(plan.chunk_ms);
                    let walk = self.drain_range(wallet, chunk_start, Some(chunk_end), sink)?;
                    sink.flush()?;

                    run.chunks += 1;
                    run.rows += walk.rows;
                    if walk.stalled {
                        run.stalled_chunks += 1;
                        warn!(
                            wallet = %wallet,
                            chunk_start,
                            chunk_end,
                            rows = walk.rows,
                            "chunk cut short by cursor stall, moving to next chunk"
                        );
                    }
                    if walk.rows == 0 {
                        run.empty_streak += 1;
                    } else {
                        run.empty_streak = 0;
                        if let Some(sample) = &walk.sample {
                            info!("sample={}", sample_json(sample));
                        }
                        info!(wallet = %wallet, chunk_start, rows = walk.rows, "chunk complete");
                    }

                    cursor = chunk_end;
                    state_repo.save(wallet_id, cursor, false)?;
                    run.next_start_ms = Some(cursor);

                    if run.empty_streak >= plan.max_empty_chunks {
                        state_repo.save(wallet_id, cursor, true)?;
                        ChunkStep::Finished(ChunkStop::EmptyStreak)
                    } else {
                        ChunkStep::CheckEdge
                    }
                }
                ChunkStep::Finished(stop) => {
                    run.stop = stop;
                    break;
                }
            };
        }

        info!(
            wallet = %wallet,
            wallet_id,
            rows = run.rows,
            chunks = run.chunks,
            stop = ?run.stop,
            "chunked backfill complete"
        );
        Ok(run)
    }
}

/// Compact one-line rendering of a fill for chunk logs.
fn sample_json(fill: &Fill) -> String {
    serde_json::json!({
        "ts_ms": fill.ts_ms,
        "coin": fill.coin,
        "side": fill.side.as_str(),
        "px": fill.px.to_string(),
        "sz": fill.sz.to_string(),
        "base_tid": fill.base_tid,
        "trade_id": fill.trade_id,
        "hash": fill.hash,
    })
    .to_string()
}
