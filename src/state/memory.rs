use std::collections::HashMap;

use anyhow::Result;
use parking_lot::Mutex;

use super::StateRepository;
use crate::domain::WalletState;

#[derive(Debug, Default)]
pub struct MemoryStateRepository {
    states: Mutex<HashMap<i64, WalletState>>,
    saves: Mutex<Vec<WalletState>>,
}

impl MemoryStateRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every save in call order.
    pub fn history(&self) -> Vec<WalletState> {
        self.saves.lock().clone()
    }
}

impl StateRepository for MemoryStateRepository {
    fn load(&self, wallet_id: i64) -> Result<WalletState> {
        Ok(self
            .states
            .lock()
            .get(&wallet_id)
            .copied()
            .unwrap_or_else(|| WalletState::fresh(wallet_id)))
    }

    fn save(&self, wallet_id: i64, next_start_ms: i64, finished: bool) -> Result<()> {
        let state = WalletState {
            wallet_id,
            next_start_ms: Some(next_start_ms),
            finished,
        };
        self.states.lock().insert(wallet_id, state);
        self.saves.lock().push(state);
        Ok(())
    }
}
