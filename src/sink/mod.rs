//! Incremental fill sinks with caller-driven batching.

mod memory;
mod sqlite;

pub use memory::MemorySink;
pub use sqlite::SqliteFillSink;

use anyhow::Result;

use crate::domain::Fill;

/// `add` never drops a record. `flush` is called at least once after the last `add`
/// of a run, whatever `should_flush` says.
pub trait FillSink {
    fn add(&mut self, fill: Fill) -> Result<()>;

    fn should_flush(&self) -> bool;

    fn flush(&mut self) -> Result<()>;
}
