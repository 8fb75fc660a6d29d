use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::Value;

use super::trade_row::{compute_trade_id, round6, with_role_from_crossed};
use crate::domain::{Fill, Side};
use crate::error::{BackfillError, Result};
use crate::exchange::RawFill;

fn decimal_field(name: &str, value: Option<&Value>) -> Result<Decimal> {
    let text = match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        other => {
            return Err(BackfillError::Decode(format!(
                "fill field {name} is not numeric: {other:?}"
            )))
        }
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|e| BackfillError::Decode(format!("fill field {name}={text}: {e}")))
}

/// Maps one raw exchange record into a [`Fill`].
///
/// Spot instruments (`@`-prefixed) yield `Ok(None)`. Missing or malformed px/sz is a
/// decode error; every other optional field simply stays unset.
pub fn parse_fill(wallet: &str, raw: &RawFill) -> Result<Option<Fill>> {
    if Fill::is_spot_symbol(&raw.coin) {
        return Ok(None);
    }

    let side = raw
        .side
        .as_deref()
        .map(Side::parse)
        .unwrap_or_else(|| Side::Other(String::new()));
    let px = decimal_field("px", raw.px.as_ref())?;
    let sz = decimal_field("sz", raw.sz.as_ref())?;
    let notional = px
        .checked_mul(sz)
        .map(round6)
        .ok_or_else(|| BackfillError::Decode(format!("notional overflow: {px} * {sz}")))?;

    let base = Fill {
        wallet: wallet.to_string(),
        coin: raw.coin.clone(),
        side,
        px,
        sz,
        ts_ms: raw.time,
        hash: raw.hash.clone(),
        base_tid: raw.tid,
        role: None,
        counterparty: None,
        trade_id: None,
        notional_usd: None,
    };
    let with_role = with_role_from_crossed(base, raw.crossed);
    let trade_id = match with_role.base_tid {
        Some(tid) => Some(compute_trade_id(tid, &with_role.side).ok_or_else(|| {
            BackfillError::Decode(format!("tid {tid} overflows trade_id"))
        })?),
        None => None,
    };

    Ok(Some(Fill {
        trade_id,
        notional_usd: Some(notional),
        ..with_role
    }))
}
