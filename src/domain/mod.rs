//! Core value types shared by the backfill engine and the reconciliation side.

mod fill;
mod window;

pub use fill::{Fill, Role, Side, TradeRow};
pub use window::TimeWindow;

use serde::{Deserialize, Serialize};

/// Durable backfill cursor for one wallet.
///
/// `finished` means "caught up as of the last run"; a later run may still be asked to continue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletState {
    pub wallet_id: i64,
    pub next_start_ms: Option<i64>,
    pub finished: bool,
}

impl WalletState {
    /// State for a wallet that has never been backfilled.
    pub fn fresh(wallet_id: i64) -> Self {
        Self {
            wallet_id,
            next_start_ms: None,
            finished: false,
        }
    }
}
