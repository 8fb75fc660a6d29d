use super::{MatchKey, MatchStrategy, Tolerances};
use crate::domain::TradeRow;

/// Coarse identity comparison on `(hash, coin, side)`, for data where only the
/// exchange hash survives in both sources. Tolerances are carried but not consulted.
#[derive(Debug, Clone, Default)]
pub struct HashCoinSideMatchStrategy {
    tolerances: Tolerances,
}

impl HashCoinSideMatchStrategy {
    pub fn new(tolerances: Tolerances) -> Self {
        Self { tolerances }
    }
}

impl MatchStrategy for HashCoinSideMatchStrategy {
    fn name(&self) -> &'static str {
        "hash_coin_side"
    }

    fn tolerances(&self) -> &Tolerances {
        &self.tolerances
    }

    fn key(&self, row: &TradeRow) -> MatchKey {
        MatchKey::Group {
            hash: row.hash.clone().unwrap_or_default(),
            coin: row.coin.clone(),
            side: row.side.clone(),
        }
    }

    fn equals(&self, a: &TradeRow, b: &TradeRow) -> bool {
        a.coin == b.coin && a.side == b.side && a.hash == b.hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::tests::row;

    #[test]
    fn test_ignores_price_and_time() {
        let strategy = HashCoinSideMatchStrategy::default();
        let a = row(11, "0xfeed", "100", 0);
        let b = row(11, "0xfeed", "250", 90_000);
        assert_eq!(strategy.key(&a), strategy.key(&b));
        assert!(strategy.equals(&a, &b));
    }

    #[test]
    fn test_missing_hash_keys_as_empty() {
        let strategy = HashCoinSideMatchStrategy::default();
        let mut a = row(11, "", "1", 0);
        a.hash = None;
        match strategy.key(&a) {
            MatchKey::Group { hash, .. } => assert!(hash.is_empty()),
            other => panic!("unexpected key {other:?}"),
        }
        // None and Some("") share a bucket but are not the same trade
        assert!(!strategy.equals(&a, &row(11, "", "1", 0)));
    }
}
