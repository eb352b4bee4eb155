//! Bounded retry — the one timeout/attempt primitive shared by every
//! bring-up stage.
//!
//! Each modem stage and the WiFi connect loop is "try until it works,
//! within a wall-clock budget, sometimes with a ceiling on consecutive
//! failures".  [`Bounded`] captures that shape once.
//!
//! The elapsed check runs **before** every attempt: a budget that
//! expires exactly at an attempt boundary aborts instead of squeezing in
//! one more attempt.

use crate::error::Error;
use crate::ports::TimePort;

/// Why a bounded retry loop gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryError {
    /// The wall-clock budget elapsed.
    TimeoutExceeded,
    /// The consecutive-failure ceiling was breached.
    AttemptsExhausted,
}

impl RetryError {
    /// Attach the owning stage's name for the crate-level error.
    pub fn at_stage(self, stage: &'static str) -> Error {
        match self {
            Self::TimeoutExceeded => Error::Timeout(stage),
            Self::AttemptsExhausted => Error::AttemptsExhausted(stage),
        }
    }
}

/// A deadline-first retry loop.
#[derive(Debug, Clone, Copy)]
pub struct Bounded {
    budget_ms: u64,
    max_failures: Option<u32>,
    pause_ms: u64,
}

impl Bounded {
    /// Retry for at most `budget_ms`, with no failure ceiling or pause.
    pub fn new(budget_ms: u64) -> Self {
        Self {
            budget_ms,
            max_failures: None,
            pause_ms: 0,
        }
    }

    /// Abort once more than `max` consecutive attempts have failed.
    pub fn with_failure_ceiling(mut self, max: u32) -> Self {
        self.max_failures = Some(max);
        self
    }

    /// Sleep `pause_ms` after each failed attempt.
    pub fn with_pause_ms(mut self, pause_ms: u64) -> Self {
        self.pause_ms = pause_ms;
        self
    }

    /// Run `attempt` until it returns `true` or a bound trips.
    ///
    /// Deadline check precedes each attempt; the ceiling counts failures,
    /// so `with_failure_ceiling(2)` aborts on the third failed attempt.
    pub fn run(
        &self,
        clock: &dyn TimePort,
        mut attempt: impl FnMut() -> bool,
    ) -> Result<(), RetryError> {
        let start = clock.now_ms();
        let mut failures: u32 = 0;
        loop {
            if clock.now_ms().saturating_sub(start) >= self.budget_ms {
                return Err(RetryError::TimeoutExceeded);
            }
            if attempt() {
                return Ok(());
            }
            failures += 1;
            if let Some(max) = self.max_failures {
                if failures > max {
                    return Err(RetryError::AttemptsExhausted);
                }
            }
            if self.pause_ms > 0 {
                clock.sleep_ms(self.pause_ms);
            }
        }
    }
}
