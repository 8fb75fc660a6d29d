//! Classification of suspicious fill counts on top of the engine's results.

use super::engine::{ChunkStop, ChunkedRun};
use crate::error::{BackfillError, Result};

/// The engine only reports counts. This turns the two suspicious outcomes into errors:
/// a window that hit the upstream per-query cap, and a fresh chunked run that never
/// saw a fill before the empty streak ended it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FillCountPolicy {
    pub fill_cap: Option<usize>,
}

impl FillCountPolicy {
    pub fn new(fill_cap: Option<usize>) -> Self {
        Self { fill_cap }
    }

    pub fn check_window(&self, wallet: &str, rows: usize) -> Result<()> {
        match self.fill_cap {
            Some(cap) if rows >= cap => Err(BackfillError::TooManyFills {
                wallet: wallet.to_string(),
                count: rows,
                cap,
            }),
            _ => Ok(()),
        }
    }

    /// Only the empty-streak check applies here; a chunked run spans many queries, so its
    /// total is not bounded by the per-query cap. Resumed runs are exempt, since a caught-up
    /// wallet legitimately yields nothing new.
    pub fn check_chunked(&self, wallet: &str, run: &ChunkedRun) -> Result<()> {
        if run.stop == ChunkStop::EmptyStreak && run.rows == 0 && !run.resumed {
            return Err(BackfillError::NoResults {
                wallet: wallet.to_string(),
                empty_chunks: run.empty_streak,
            });
        }
        Ok(())
    }
}
