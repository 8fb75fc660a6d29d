//! Comparison strategies: how rows are bucketed and when two rows count as the same trade.

mod default;
mod hash_coin_side;

pub use default::DefaultMatchStrategy;
pub use hash_coin_side::HashCoinSideMatchStrategy;

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{Side, TradeRow};

/// Partition key produced by a strategy. Ordered so reports come out deterministic.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchKey {
    Trade {
        coin: String,
        side: Side,
        trade_id: i64,
    },
    Group {
        hash: String,
        coin: String,
        side: Side,
    },
}

impl fmt::Display for MatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchKey::Trade {
                coin,
                side,
                trade_id,
            } => write!(f, "{}/{}/{}", coin, side, trade_id),
            MatchKey::Group { hash, coin, side } => write!(f, "{}/{}/{}", hash, coin, side),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tolerances {
    pub px: Decimal,
    pub sz: Decimal,
    pub ts_ms: i64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            px: Decimal::new(1, 6),
            sz: Decimal::new(1, 8),
            ts_ms: 2000,
        }
    }
}

pub trait MatchStrategy {
    fn name(&self) -> &'static str;

    fn tolerances(&self) -> &Tolerances;

    fn key(&self, row: &TradeRow) -> MatchKey;

    /// Only ever asked about two rows that share a key.
    fn equals(&self, a: &TradeRow, b: &TradeRow) -> bool;
}

/// Comparison mode requested by a caller. `grouped` selects [`HashCoinSideMatchStrategy`],
/// anything else the per-fill [`DefaultMatchStrategy`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    #[default]
    Fills,
    Grouped,
}

impl MatchMode {
    pub fn parse(mode: &str) -> Self {
        if mode.trim().eq_ignore_ascii_case("grouped") {
            MatchMode::Grouped
        } else {
            MatchMode::Fills
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchMode::Fills => "fills",
            MatchMode::Grouped => "grouped",
        }
    }

    pub fn strategy(self, tolerances: Tolerances) -> Box<dyn MatchStrategy> {
        match self {
            MatchMode::Fills => Box::new(DefaultMatchStrategy::new(tolerances)),
            MatchMode::Grouped => Box::new(HashCoinSideMatchStrategy::new(tolerances)),
        }
    }
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::str::FromStr;

    use super::*;
    use crate::domain::Role;

    pub(crate) fn row(trade_id: i64, hash: &str, px: &str, ts_ms: i64) -> TradeRow {
        TradeRow {
            trade_id,
            base_tid: trade_id / 10,
            wallet: "0xabc".to_string(),
            role: Role::Taker,
            counterparty: None,
            coin: "BTC".to_string(),
            side: if trade_id % 10 == 1 { Side::Bid } else { Side::Ask },
            px: Decimal::from_str(px).unwrap(),
            sz: Decimal::ONE,
            notional_usd: Decimal::from_str(px).unwrap(),
            hash: Some(hash.to_string()),
            ts_ms,
        }
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!(MatchMode::parse("grouped"), MatchMode::Grouped);
        assert_eq!(MatchMode::parse(" GROUPED "), MatchMode::Grouped);
        assert_eq!(MatchMode::parse("fills"), MatchMode::Fills);
        assert_eq!(MatchMode::parse("anything"), MatchMode::Fills);
    }

    #[test]
    fn test_mode_selects_strategy() {
        let tol = Tolerances::default();
        assert_eq!(MatchMode::Fills.strategy(tol.clone()).name(), "default");
        assert_eq!(MatchMode::Grouped.strategy(tol).name(), "hash_coin_side");
    }

    #[test]
    fn test_default_tolerances() {
        let tol = Tolerances::default();
        assert_eq!(tol.px.to_string(), "0.000001");
        assert_eq!(tol.sz.to_string(), "0.00000001");
        assert_eq!(tol.ts_ms, 2000);
    }

    #[test]
    fn test_keys_order_deterministically() {
        let a = MatchKey::Trade {
            coin: "BTC".to_string(),
            side: Side::Bid,
            trade_id: 11,
        };
        let b = MatchKey::Trade {
            coin: "BTC".to_string(),
            side: Side::Bid,
            trade_id: 21,
        };
        assert!(a < b);
        assert_eq!(a.to_string(), "BTC/B/11");
    }
}
