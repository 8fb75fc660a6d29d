//! Wallet verification use case and the fetch summary used for quick upstream checks.

use std::collections::{BTreeSet, HashSet};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::compare::{CompareReport, CompareService};
use crate::domain::{Fill, Side, TimeWindow, TradeRow};
use crate::matching::{MatchMode, Tolerances};
use crate::normalize::to_trade_row;
use crate::providers::FillProvider;

// ============================================================================
// Verify
// ============================================================================

/// Invocation payload, as accepted on stdin by the `event` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyRequest {
    pub wallet: String,
    pub start_ms: i64,
    pub end_ms: i64,
    #[serde(default)]
    pub coin: Option<String>,
    #[serde(default)]
    pub mode: Option<String>,
}

impl VerifyRequest {
    pub fn mode(&self) -> MatchMode {
        self.mode.as_deref().map(MatchMode::parse).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct VerifyResponse {
    pub wallet: String,
    pub mode: MatchMode,
    pub window: TimeWindow,
    pub coin: Option<String>,
    /// Fills that could not become comparison rows (no exchange trade id).
    pub skipped_warehouse: usize,
    pub skipped_exchange: usize,
    #[serde(flatten)]
    pub report: CompareReport,
}

/// Fetches both sides, normalizes them and compares under the requested mode.
pub fn run(
    request: &VerifyRequest,
    warehouse: &dyn FillProvider,
    exchange: &dyn FillProvider,
    tolerances: Tolerances,
) -> Result<VerifyResponse> {
    let window = TimeWindow::new(request.start_ms, request.end_ms)?;
    let coin = request.coin.as_deref();
    let mode = request.mode();

    let warehouse_fills = warehouse
        .fetch_fills(&request.wallet, &window, coin)
        .context("Failed to fetch warehouse fills")?;
    let exchange_fills = exchange
        .fetch_fills(&request.wallet, &window, coin)
        .context("Failed to fetch exchange fills")?;

    let (warehouse_rows, skipped_warehouse) = normalize_all(&warehouse_fills);
    let (exchange_rows, skipped_exchange) = normalize_all(&exchange_fills);
    if skipped_warehouse + skipped_exchange > 0 {
        warn!(
            wallet = %request.wallet,
            skipped_warehouse,
            skipped_exchange,
            "fills without base_tid left out of comparison"
        );
    }

    let strategy = mode.strategy(tolerances);
    let report = CompareService::new(strategy.as_ref()).compare(&warehouse_rows, &exchange_rows);

    info!(
        wallet = %request.wallet,
        mode = %mode,
        clean = report.is_clean(),
        "verification finished"
    );

    Ok(VerifyResponse {
        wallet: request.wallet.clone(),
        mode,
        window,
        coin: request.coin.clone(),
        skipped_warehouse,
        skipped_exchange,
        report,
    })
}

fn normalize_all(fills: &[Fill]) -> (Vec<TradeRow>, usize) {
    let rows: Vec<TradeRow> = fills.iter().filter_map(to_trade_row).collect();
    let skipped = fills.len() - rows.len();
    (rows, skipped)
}

// ============================================================================
// Fetch summary
// ============================================================================

/// Compact rendering of one fill for the summary head/tail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SampleRow {
    pub ts_ms: i64,
    pub coin: String,
    pub side: Side,
    pub px: String,
    pub sz: String,
    pub base_tid: Option<i64>,
    pub trade_id: Option<i64>,
    pub notional_usd: Option<String>,
    pub hash: Option<String>,
}

impl From<&Fill> for SampleRow {
    fn from(fill: &Fill) -> Self {
        Self {
            ts_ms: fill.ts_ms,
            coin: fill.coin.clone(),
            side: fill.side.clone(),
            px: fill.px.to_string(),
            sz: fill.sz.to_string(),
            base_tid: fill.base_tid,
            trade_id: fill.trade_id,
            notional_usd: fill.notional_usd.map(|n| n.to_string()),
            hash: fill.hash.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchSummary {
    pub wallet: String,
    pub window: TimeWindow,
    pub fills_total: usize,
    pub distinct_base_tid: usize,
    pub distinct_trade_id: usize,
    pub distinct_hash: usize,
    pub distinct_hash_coin_side: usize,
    pub unique_coins: Vec<String>,
    pub contains_spot_rows: bool,
    pub first_rows: Vec<SampleRow>,
    pub last_rows: Vec<SampleRow>,
}

impl FetchSummary {
    pub fn from_fills(wallet: &str, window: TimeWindow, fills: &[Fill], sample: usize) -> Self {
        let base_tids: HashSet<i64> = fills.iter().filter_map(|f| f.base_tid).collect();
        let trade_ids: HashSet<i64> = fills.iter().filter_map(|f| f.trade_id).collect();
        let hashed = || fills.iter().filter(|f| f.hash.as_deref().is_some_and(|h| !h.is_empty()));
        let hashes: HashSet<&str> = hashed().filter_map(|f| f.hash.as_deref()).collect();
        let triples: HashSet<(&str, &str, &Side)> = hashed()
            .filter_map(|f| f.hash.as_deref().map(|h| (h, f.coin.as_str(), &f.side)))
            .collect();
        let coins: BTreeSet<&str> = fills.iter().map(|f| f.coin.as_str()).collect();

        let head = sample.min(fills.len());
        let tail = fills.len() - head;

        Self {
            wallet: wallet.to_string(),
            window,
            fills_total: fills.len(),
            distinct_base_tid: base_tids.len(),
            distinct_trade_id: trade_ids.len(),
            distinct_hash: hashes.len(),
            distinct_hash_coin_side: triples.len(),
            unique_coins: coins.into_iter().map(str::to_string).collect(),
            contains_spot_rows: fills.iter().any(|f| Fill::is_spot_symbol(&f.coin)),
            first_rows: fills[..head].iter().map(SampleRow::from).collect(),
            last_rows: fills[tail..].iter().map(SampleRow::from).collect(),
        }
    }
}
