//! Time adapters.
//!
//! [`MonotonicClock`] provides monotonic time for deadlines and pauses:
//!
//! - **`target_os = "espidf"`** — wraps `esp_timer_get_time()` from the
//!   ESP-IDF high-resolution timer (microsecond precision, monotonic).
//! - **`not(target_os = "espidf")`** — uses `std::time::Instant`.
//!
//! [`ManualClock`] (host only) is a hand-stepped clock whose `sleep_ms`
//! consumes fake time, so bring-up budgets run instantly in tests.

use crate::ports::TimePort;

/// Monotonic wall-clock adapter.
pub struct MonotonicClock {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }
}

impl TimePort for MonotonicClock {
    #[cfg(target_os = "espidf")]
    fn now_ms(&self) -> u64 {
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64 / 1_000
    }

    #[cfg(not(target_os = "espidf"))]
    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    fn sleep_ms(&self, ms: u64) {
        std::thread::sleep(std::time::Duration::from_millis(ms));
    }
}

// ───────────────────────────────────────────────────────────────
// Manual clock (host-side tests)
// ───────────────────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
pub use manual::ManualClock;

#[cfg(not(target_os = "espidf"))]
mod manual {
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    use crate::ports::TimePort;

    /// Hand-stepped clock for deterministic tests.
    ///
    /// `sleep_ms` advances fake time instead of blocking (plus a 1 ms
    /// real yield so spinning monitor threads don't peg a test CPU).
    /// Clones share the same timeline.
    #[derive(Clone)]
    pub struct ManualClock {
        now: Arc<AtomicU64>,
    }

    impl Default for ManualClock {
        fn default() -> Self {
            Self::new()
        }
    }

    impl ManualClock {
        pub fn new() -> Self {
            Self {
                now: Arc::new(AtomicU64::new(0)),
            }
        }

        /// Step the shared timeline forward.
        pub fn advance(&self, ms: u64) {
            self.now.fetch_add(ms, Ordering::SeqCst);
        }

        /// Shared cell, for mocks that charge fake time to operations.
        pub fn cell(&self) -> Arc<AtomicU64> {
            Arc::clone(&self.now)
        }
    }

    impl TimePort for ManualClock {
        fn now_ms(&self) -> u64 {
            self.now.load(Ordering::SeqCst)
        }

        fn sleep_ms(&self, ms: u64) {
            self.advance(ms);
            std::thread::sleep(std::time::Duration::from_millis(1));
        }
    }
}
