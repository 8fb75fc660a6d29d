use super::{MatchKey, MatchStrategy, Tolerances};
use crate::domain::TradeRow;

/// Per-fill comparison keyed on the derived trade id. Price, size and time may drift
/// within tolerance.
#[derive(Debug, Clone, Default)]
pub struct DefaultMatchStrategy {
    tolerances: Tolerances,
}

impl DefaultMatchStrategy {
    pub fn new(tolerances: Tolerances) -> Self {
        Self { tolerances }
    }
}

impl MatchStrategy for DefaultMatchStrategy {
    fn name(&self) -> &'static str {
        "default"
    }

    fn tolerances(&self) -> &Tolerances {
        &self.tolerances
    }

    fn key(&self, row: &TradeRow) -> MatchKey {
        MatchKey::Trade {
            coin: row.coin.clone(),
            side: row.side.clone(),
            trade_id: row.trade_id,
        }
    }

    fn equals(&self, a: &TradeRow, b: &TradeRow) -> bool {
        let tol = &self.tolerances;
        a.coin == b.coin
            && a.side == b.side
            && (a.px - b.px).abs() <= tol.px
            && (a.sz - b.sz).abs() <= tol.sz
            && a.ts_ms.abs_diff(b.ts_ms) <= tol.ts_ms.unsigned_abs()
    }
}
