//! Normalisation from raw upstream records to [`Fill`](crate::domain::Fill) and
//! [`TradeRow`](crate::domain::TradeRow).

mod parse;
mod trade_row;

pub use parse::parse_fill;
pub use trade_row::{compute_trade_id, round6, to_trade_row, with_role_from_crossed};
