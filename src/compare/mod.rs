//! Reconciliation of warehouse rows against exchange rows.
//!
//! Both sides are partitioned by the strategy's key. Inside a bucket, rows are paired
//! greedily with `equals`; leftovers on both sides are paired as mismatches, and whatever
//! is still unpaired is reported as present on one side only.

mod report;

pub use report::{CompareCounts, CompareReport, Mismatch, RowDeltas};

use std::collections::BTreeMap;

use tracing::info;

use crate::domain::TradeRow;
use crate::matching::{MatchKey, MatchStrategy};

#[derive(Default)]
struct Bucket<'a> {
    warehouse: Vec<&'a TradeRow>,
    exchange: Vec<&'a TradeRow>,
}

pub struct CompareService<'s> {
    strategy: &'s dyn MatchStrategy,
}

impl<'s> CompareService<'s> {
    pub fn new(strategy: &'s dyn MatchStrategy) -> Self {
        Self { strategy }
    }

    pub fn compare(&self, warehouse: &[TradeRow], exchange: &[TradeRow]) -> CompareReport {
        let mut buckets: BTreeMap<MatchKey, Bucket<'_>> = BTreeMap::new();
        for row in warehouse {
            buckets
                .entry(self.strategy.key(row))
                .or_default()
                .warehouse
                .push(row);
        }
        for row in exchange {
            buckets
                .entry(self.strategy.key(row))
                .or_default()
                .exchange
                .push(row);
        }

        let mut report = CompareReport::new(
            self.strategy.name(),
            self.strategy.tolerances().clone(),
            warehouse.len(),
            exchange.len(),
        );

        for (key, bucket) in buckets {
            let mut unpaired_exchange = bucket.exchange;
            let mut unpaired_warehouse = Vec::new();

            for w in bucket.warehouse {
                match unpaired_exchange
                    .iter()
                    .position(|e| self.strategy.equals(w, e))
                {
                    Some(pos) => {
                        unpaired_exchange.remove(pos);
                        report.counts.matched += 1;
                    }
                    None => unpaired_warehouse.push(w),
                }
            }

            let paired = unpaired_warehouse.len().min(unpaired_exchange.len());
            let extra_warehouse = unpaired_warehouse.split_off(paired);
            let extra_exchange = unpaired_exchange.split_off(paired);

            for (w, e) in unpaired_warehouse.into_iter().zip(unpaired_exchange) {
                report.push_mismatch(Mismatch::new(key.clone(), w, e));
            }
            for w in extra_warehouse {
                report.push_only_in_warehouse(w.clone());
            }
            for e in extra_exchange {
                report.push_only_in_exchange(e.clone());
            }
        }

        info!(
            strategy = report.strategy,
            matched = report.counts.matched,
            mismatched = report.counts.mismatched,
            only_in_warehouse = report.counts.only_in_warehouse,
            only_in_exchange = report.counts.only_in_exchange,
            "comparison complete"
        );
        report
    }
}
