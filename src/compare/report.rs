use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::TradeRow;
use crate::matching::{MatchKey, Tolerances};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompareCounts {
    pub warehouse_rows: usize,
    pub exchange_rows: usize,
    pub matched: usize,
    pub mismatched: usize,
    pub only_in_warehouse: usize,
    pub only_in_exchange: usize,
}

/// Warehouse minus exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowDeltas {
    pub px: Decimal,
    pub sz: Decimal,
    pub ts_ms: i64,
}

/// Two rows that share a key but fail the strategy's equality test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mismatch {
    pub key: MatchKey,
    pub warehouse: TradeRow,
    pub exchange: TradeRow,
    pub deltas: RowDeltas,
}

impl Mismatch {
    pub fn new(key: MatchKey, warehouse: &TradeRow, exchange: &TradeRow) -> Self {
        Self {
            key,
            deltas: RowDeltas {
                px: warehouse.px - exchange.px,
                sz: warehouse.sz - exchange.sz,
                ts_ms: warehouse.ts_ms - exchange.ts_ms,
            },
            warehouse: warehouse.clone(),
            exchange: exchange.clone(),
        }
    }
}

/// Diagnostic outcome of a comparison. Matched rows are only counted; every
/// discrepancy is listed in full.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompareReport {
    pub strategy: &'static str,
    pub tolerances: Tolerances,
    pub counts: CompareCounts,
    pub mismatched: Vec<Mismatch>,
    pub only_in_warehouse: Vec<TradeRow>,
    pub only_in_exchange: Vec<TradeRow>,
}

impl CompareReport {
    pub fn new(
        strategy: &'static str,
        tolerances: Tolerances,
        warehouse_rows: usize,
        exchange_rows: usize,
    ) -> Self {
        Self {
            strategy,
            tolerances,
            counts: CompareCounts {
                warehouse_rows,
                exchange_rows,
                ..CompareCounts::default()
            },
            mismatched: Vec::new(),
            only_in_warehouse: Vec::new(),
            only_in_exchange: Vec::new(),
        }
    }

    pub fn push_mismatch(&mut self, mismatch: Mismatch) {
        self.counts.mismatched += 1;
        self.mismatched.push(mismatch);
    }

    pub fn push_only_in_warehouse(&mut self, row: TradeRow) {
        self.counts.only_in_warehouse += 1;
        self.only_in_warehouse.push(row);
    }

    pub fn push_only_in_exchange(&mut self, row: TradeRow) {
        self.counts.only_in_exchange += 1;
        self.only_in_exchange.push(row);
    }

    /// Every row on both sides was matched.
    pub fn is_clean(&self) -> bool {
        self.counts.mismatched == 0
            && self.counts.only_in_warehouse == 0
            && self.counts.only_in_exchange == 0
    }
}
