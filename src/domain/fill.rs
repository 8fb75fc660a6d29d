use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Trade side. `A` is ask/sell, `B` is bid/buy.
///
/// Tokens that are not recognised are kept verbatim in `Other` rather than coerced.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Side {
    Ask,
    Bid,
    Other(String),
}

impl Side {
    /// Case-insensitive normalisation of upstream side tokens.
    pub fn parse(token: &str) -> Self {
        match token.to_ascii_lowercase().as_str() {
            "ask" | "a" => Side::Ask,
            "bid" | "b" => Side::Bid,
            _ => Side::Other(token.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Side::Ask => "A",
            Side::Bid => "B",
            Side::Other(raw) => raw,
        }
    }

    /// Suffix appended to `base_tid` when deriving `trade_id`.
    pub fn trade_id_suffix(&self) -> i64 {
        match self {
            Side::Bid => 1,
            _ => 2,
        }
    }
}

impl From<String> for Side {
    fn from(value: String) -> Self {
        Side::parse(&value)
    }
}

impl From<Side> for String {
    fn from(value: Side) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Maker,
    Taker,
}

impl Role {
    pub fn from_crossed(crossed: bool) -> Self {
        if crossed {
            Role::Taker
        } else {
            Role::Maker
        }
    }

    pub fn parse(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "maker" => Some(Role::Maker),
            "taker" => Some(Role::Taker),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Maker => "maker",
            Role::Taker => "taker",
        }
    }
}

/// One executed trade leg for a wallet, as read from either source.
///
/// Derived fields (`role`, `trade_id`, `notional_usd`) are filled by normalisation,
/// which always builds a new value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fill {
    pub wallet: String,
    pub coin: String,
    pub side: Side,
    pub px: Decimal,
    pub sz: Decimal,
    pub ts_ms: i64,
    pub hash: Option<String>,
    pub base_tid: Option<i64>,
    pub role: Option<Role>,
    pub counterparty: Option<String>,
    pub trade_id: Option<i64>,
    pub notional_usd: Option<Decimal>,
}

impl Fill {
    /// Spot-market instruments are prefixed with `@` and never materialised as fills.
    pub fn is_spot_symbol(coin: &str) -> bool {
        coin.starts_with('@')
    }
}

/// Fully normalised comparison record derived from a [`Fill`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeRow {
    pub trade_id: i64,
    pub base_tid: i64,
    pub wallet: String,
    pub role: Role,
    pub counterparty: Option<String>,
    pub coin: String,
    pub side: Side,
    pub px: Decimal,
    pub sz: Decimal,
    pub notional_usd: Decimal,
    pub hash: Option<String>,
    pub ts_ms: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_parse_is_case_insensitive() {
        assert_eq!(Side::parse("ASK"), Side::Ask);
        assert_eq!(Side::parse("a"), Side::Ask);
        assert_eq!(Side::parse("Bid"), Side::Bid);
        assert_eq!(Side::parse("B"), Side::Bid);
    }

    #[test]
    fn test_side_keeps_unknown_tokens() {
        let side = Side::parse("Sell");
        assert_eq!(side, Side::Other("Sell".to_string()));
        assert_eq!(side.as_str(), "Sell");
    }

    #[test]
    fn test_side_serializes_as_letter() {
        let json = serde_json::to_string(&Side::Bid).unwrap();
        assert_eq!(json, "\"B\"");
        let back: Side = serde_json::from_str("\"A\"").unwrap();
        assert_eq!(back, Side::Ask);
    }

    #[test]
    fn test_role_from_crossed() {
        assert_eq!(Role::from_crossed(true), Role::Taker);
        assert_eq!(Role::from_crossed(false), Role::Maker);
        assert_eq!(Role::parse("MAKER"), Some(Role::Maker));
        assert_eq!(Role::parse("unknown"), None);
    }

    #[test]
    fn test_spot_symbol_detection() {
        assert!(Fill::is_spot_symbol("@107"));
        assert!(!Fill::is_spot_symbol("BTC"));
    }
}
