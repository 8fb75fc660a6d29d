use anyhow::{Context, Result};
use tracing::debug;

use super::FillProvider;
use crate::backfill::{BackfillEngine, FillCountPolicy};
use crate::domain::{Fill, TimeWindow};
use crate::exchange::InfoTransport;
use crate::sink::MemorySink;

/// Exchange-side provider: one full `process_wallet` walk into a memory sink.
///
/// The fill cap is checked against every record the upstream returned, spot rows included,
/// before the instrument filter, since the upstream cap applies to the unfiltered query.
pub struct ExchangeFillProvider<T> {
    engine: BackfillEngine<T>,
    policy: FillCountPolicy,
}

impl<T: InfoTransport> ExchangeFillProvider<T> {
    pub fn new(engine: BackfillEngine<T>, policy: FillCountPolicy) -> Self {
        Self { engine, policy }
    }
}

impl<T: InfoTransport> FillProvider for ExchangeFillProvider<T> {
    fn fetch_fills(
        &self,
        wallet: &str,
        window: &TimeWindow,
        coin: Option<&str>,
    ) -> Result<Vec<Fill>> {
        let mut sink = MemorySink::default();
        let run = self
            .engine
            .backfill_window(wallet, window, &mut sink)
            .with_context(|| format!("Exchange backfill failed for {}", wallet))?;
        self.policy.check_window(wallet, run.raw_rows)?;

        let mut fills = sink.into_rows();
        if let Some(coin) = coin {
            fills.retain(|f| f.coin == coin);
        }
        debug!(
            wallet = %wallet,
            fetched = run.raw_rows,
            parsed = run.rows,
            kept = fills.len(),
            "exchange fills ready"
        );
        Ok(fills)
    }
}
