use rust_decimal::{Decimal, RoundingStrategy};

use crate::domain::{Fill, Role, Side, TradeRow};

/// Scale shared by px, sz and notional in the comparison record (numeric(18,6) in the warehouse).
pub const DECIMAL_SCALE: u32 = 6;

/// `base_tid * 10 + 1` for bids, `base_tid * 10 + 2` for everything else.
///
/// Both legs of one trade share `base_tid`; the suffix keeps them apart.
/// `None` when the result does not fit in an `i64`.
pub fn compute_trade_id(base_tid: i64, side: &Side) -> Option<i64> {
    base_tid
        .checked_mul(10)
        .and_then(|id| id.checked_add(side.trade_id_suffix()))
}

/// Quantise to 6 places, half-up, always carrying exactly 6 fractional digits.
pub fn round6(x: Decimal) -> Decimal {
    let mut q = x.round_dp_with_strategy(DECIMAL_SCALE, RoundingStrategy::MidpointAwayFromZero);
    q.rescale(DECIMAL_SCALE);
    q
}

/// `crossed = true` means the order took liquidity. Absent leaves the role untouched.
pub fn with_role_from_crossed(fill: Fill, crossed: Option<bool>) -> Fill {
    match crossed {
        Some(crossed) => Fill {
            role: Some(Role::from_crossed(crossed)),
            ..fill
        },
        None => fill,
    }
}

/// Builds the comparison record. Returns `None` when the fill has no `base_tid`,
/// or when the join key cannot be derived from it.
pub fn to_trade_row(fill: &Fill) -> Option<TradeRow> {
    let base_tid = fill.base_tid?;
    let trade_id = match fill.trade_id {
        Some(id) => id,
        None => compute_trade_id(base_tid, &fill.side)?,
    };
    let notional = fill.notional_usd.unwrap_or(fill.px * fill.sz);

    Some(TradeRow {
        trade_id,
        base_tid,
        wallet: fill.wallet.clone(),
        role: fill.role.unwrap_or(Role::Taker),
        counterparty: fill.counterparty.clone(),
        coin: fill.coin.clone(),
        side: fill.side.clone(),
        px: round6(fill.px),
        sz: round6(fill.sz),
        notional_usd: round6(notional),
        hash: fill.hash.clone(),
        ts_ms: fill.ts_ms,
    })
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn fill(side: Side, base_tid: Option<i64>) -> Fill {
        Fill {
            wallet: "0xabc".to_string(),
            coin: "BTC".to_string(),
            side,
            px: dec("100.1234567"),
            sz: dec("2"),
            ts_ms: 1_000,
            hash: Some("0xh".to_string()),
            base_tid,
            role: None,
            counterparty: None,
            trade_id: None,
            notional_usd: None,
        }
    }

    #[test]
    fn test_trade_id_encodes_side() {
        assert_eq!(compute_trade_id(639119470331929, &Side::Bid), Some(6391194703319291));
        assert_eq!(compute_trade_id(639119470331929, &Side::Ask), Some(6391194703319292));
        assert_eq!(compute_trade_id(7, &Side::Bid), Some(71));
        assert_eq!(compute_trade_id(7, &Side::Ask), Some(72));
    }

    #[test]
    fn test_trade_id_never_collides_across_sides() {
        let mut seen = std::collections::HashSet::new();
        for tid in 0..500 {
            assert!(seen.insert(compute_trade_id(tid, &Side::Bid)));
            assert!(seen.insert(compute_trade_id(tid, &Side::Ask)));
        }
    }

    #[test]
    fn test_trade_id_rejects_overflowing_tid() {
        assert_eq!(compute_trade_id(1_000_000_000_000_000_000, &Side::Bid), None);
        assert_eq!(compute_trade_id(i64::MAX, &Side::Ask), None);
        assert_eq!(compute_trade_id(i64::MAX / 10, &Side::Bid), Some(i64::MAX / 10 * 10 + 1));
        assert!(to_trade_row(&fill(Side::Bid, Some(i64::MAX))).is_none());
    }

    #[test]
    fn test_round6_pads_and_rounds_half_up() {
        assert_eq!(round6(dec("100")).to_string(), "100.000000");
        assert_eq!(round6(dec("100.123456789")).to_string(), "100.123457");
        assert_eq!(round6(dec("0.0000005")).to_string(), "0.000001");
        assert_eq!(round6(dec("0.0000004")).to_string(), "0.000000");
    }

    #[test]
    fn test_role_from_crossed_builds_new_fill() {
        let base = fill(Side::Bid, Some(1));
        let taker = with_role_from_crossed(base.clone(), Some(true));
        assert_eq!(taker.role, Some(Role::Taker));
        let maker = with_role_from_crossed(base.clone(), Some(false));
        assert_eq!(maker.role, Some(Role::Maker));
        let untouched = with_role_from_crossed(base.clone(), None);
        assert_eq!(untouched, base);
    }

    #[test]
    fn test_to_trade_row_derives_missing_fields() {
        let row = to_trade_row(&fill(Side::Ask, Some(42))).unwrap();
        assert_eq!(row.trade_id, 422);
        assert_eq!(row.role, Role::Taker);
        assert_eq!(row.px.to_string(), "100.123457");
        assert_eq!(row.sz.to_string(), "2.000000");
        assert_eq!(row.notional_usd.to_string(), "200.246913");
    }

    #[test]
    fn test_to_trade_row_keeps_supplied_fields() {
        let mut f = fill(Side::Bid, Some(42));
        f.trade_id = Some(999);
        f.role = Some(Role::Maker);
        f.notional_usd = Some(dec("1.5"));
        let row = to_trade_row(&f).unwrap();
        assert_eq!(row.trade_id, 999);
        assert_eq!(row.role, Role::Maker);
        assert_eq!(row.notional_usd.to_string(), "1.500000");
    }

    #[test]
    fn test_to_trade_row_requires_base_tid() {
        assert!(to_trade_row(&fill(Side::Bid, None)).is_none());
    }
}
