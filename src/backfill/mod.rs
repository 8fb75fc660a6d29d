//! Resumable fill backfill against the exchange's time-ordered query API.

pub mod clock;
pub mod engine;
pub mod policy;
pub mod retry;

pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{BackfillEngine, ChunkPlan, ChunkStop, ChunkedRun, WindowRun};
pub use policy::FillCountPolicy;
pub use retry::{RetryPolicy, RETRYABLE_STATUSES};
