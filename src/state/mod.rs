//! Durable per-wallet backfill progress.

mod memory;
mod sqlite;

pub use memory::MemoryStateRepository;
pub use sqlite::SqliteStateRepository;

use anyhow::Result;

use crate::domain::WalletState;

/// Keyed by wallet id. Callers never drive the same wallet concurrently, so no
/// cross-call locking is implied beyond what each implementation needs internally.
pub trait StateRepository {
    /// Unknown wallets load as [`WalletState::fresh`], never as an error.
    fn load(&self, wallet_id: i64) -> Result<WalletState>;

    /// Full overwrite, last write wins.
    fn save(&self, wallet_id: i64, next_start_ms: i64, finished: bool) -> Result<()>;
}

impl<T: StateRepository + ?Sized> StateRepository for &T {
    fn load(&self, wallet_id: i64) -> Result<WalletState> {
        (**self).load(wallet_id)
    }

    fn save(&self, wallet_id: i64, next_start_ms: i64, finished: bool) -> Result<()> {
        (**self).save(wallet_id, next_start_ms, finished)
    }
}
