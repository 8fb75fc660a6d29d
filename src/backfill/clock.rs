//! Time source used by the engine for backoff sleeps and the live-edge check.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

pub trait Clock: Send + Sync {
    /// Current wall time in epoch milliseconds.
    fn now_ms(&self) -> i64;

    /// Blocks the calling thread.
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or_default()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

#[derive(Debug, Default)]
struct ManualState {
    now_ms: i64,
    sleeps: Vec<Duration>,
}

/// Deterministic clock. Sleeping records the duration and advances time instead of blocking.
#[derive(Debug, Default)]
pub struct ManualClock {
    state: Mutex<ManualState>,
}

impl ManualClock {
    pub fn new(now_ms: i64) -> Self {
        Self {
            state: Mutex::new(ManualState {
                now_ms,
                sleeps: Vec::new(),
            }),
        }
    }

    pub fn set(&self, now_ms: i64) {
        self.state.lock().now_ms = now_ms;
    }

    pub fn advance(&self, ms: i64) {
        self.state.lock().now_ms += ms;
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.state.lock().sleeps.clone()
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.state.lock().now_ms
    }

    fn sleep(&self, duration: Duration) {
        let mut state = self.state.lock();
        state.now_ms += duration.as_millis() as i64;
        state.sleeps.push(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_sleep_advances_time() {
        let clock = ManualClock::new(1_000);
        clock.sleep(Duration::from_millis(250));
        clock.advance(50);
        assert_eq!(clock.now_ms(), 1_300);
        assert_eq!(clock.sleeps(), vec![Duration::from_millis(250)]);
        clock.set(5);
        assert_eq!(clock.now_ms(), 5);
    }

    #[test]
    fn test_system_clock_is_after_2020() {
        assert!(SystemClock.now_ms() > 1_577_836_800_000);
    }
}
