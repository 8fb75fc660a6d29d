use anyhow::Result;

use super::FillSink;
use crate::domain::Fill;

pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Keeps every fill in arrival order. Flushing only resets the batch counter.
#[derive(Debug, Clone)]
pub struct MemorySink {
    rows: Vec<Fill>,
    batch_size: usize,
    pending: usize,
    flushes: usize,
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_SIZE)
    }
}

impl MemorySink {
    pub fn new(batch_size: usize) -> Self {
        Self {
            rows: Vec::new(),
            batch_size: batch_size.max(1),
            pending: 0,
            flushes: 0,
        }
    }

    pub fn rows(&self) -> &[Fill] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Fill> {
        self.rows
    }

    pub fn flushes(&self) -> usize {
        self.flushes
    }
}

impl FillSink for MemorySink {
    fn add(&mut self, fill: Fill) -> Result<()> {
        self.rows.push(fill);
        self.pending += 1;
        Ok(())
    }

    fn should_flush(&self) -> bool {
        self.pending >= self.batch_size
    }

    fn flush(&mut self) -> Result<()> {
        self.pending = 0;
        self.flushes += 1;
        Ok(())
    }
}
