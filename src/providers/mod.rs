//! Fill sources for reconciliation: the internal warehouse and the exchange.

mod exchange;
mod warehouse;

pub use exchange::ExchangeFillProvider;
pub use warehouse::WarehouseFillProvider;

use anyhow::Result;

use crate::domain::{Fill, TimeWindow};

/// Fetches every fill for `wallet` inside `window`, optionally restricted to one instrument.
/// Spot instruments never come back from either source.
pub trait FillProvider {
    fn fetch_fills(
        &self,
        wallet: &str,
        window: &TimeWindow,
        coin: Option<&str>,
    ) -> Result<Vec<Fill>>;
}
