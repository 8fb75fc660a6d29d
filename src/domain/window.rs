use anyhow::{bail, Result};
use serde::Serialize;

/// Half-open millisecond interval `[start_ms, end_ms)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TimeWindow {
    start_ms: i64,
    end_ms: i64,
}

impl TimeWindow {
    pub fn new(start_ms: i64, end_ms: i64) -> Result<Self> {
        if start_ms > end_ms {
            bail!("invalid window: start_ms {} > end_ms {}", start_ms, end_ms);
        }
        Ok(Self { start_ms, end_ms })
    }

    pub fn start_ms(&self) -> i64 {
        self.start_ms
    }

    pub fn end_ms(&self) -> i64 {
        self.end_ms
    }

    pub fn contains(&self, ts_ms: i64) -> bool {
        ts_ms >= self.start_ms && ts_ms < self.end_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_rejects_inverted_bounds() {
        assert!(TimeWindow::new(10, 5).is_err());
        assert!(TimeWindow::new(5, 5).is_ok());
    }

    #[test]
    fn test_window_is_half_open() {
        let w = TimeWindow::new(1_000, 2_000).unwrap();
        assert!(w.contains(1_000));
        assert!(w.contains(1_999));
        assert!(!w.contains(2_000));
        assert!(!w.contains(999));
    }
}
