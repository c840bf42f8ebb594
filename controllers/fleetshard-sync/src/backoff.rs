//! # Fibonacci Backoff
//!
//! Per-central retry throttling for the runtime loop. A central whose
//! reconciliation fails is skipped until its backoff elapses; the wait grows
//! along the Fibonacci sequence in minutes (1m, 1m, 2m, 3m, 5m, 8m, 10m max).

use std::time::{Duration, Instant};

/// Fibonacci backoff calculator, stepping in whole minutes
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    min_minutes: u64,
    prev_minutes: u64,
    current_minutes: u64,
    max_minutes: u64,
}

impl FibonacciBackoff {
    /// # Arguments
    ///
    /// * `min_minutes` - first (and second) wait, typically 1
    /// * `max_minutes` - cap for the sequence, typically 10
    #[must_use]
    pub fn new(min_minutes: u64, max_minutes: u64) -> Self {
        Self {
            min_minutes,
            prev_minutes: 0,
            current_minutes: min_minutes,
            max_minutes,
        }
    }

    /// Current wait, then advance the sequence
    pub fn next_backoff(&mut self) -> Duration {
        let wait = Duration::from_secs(self.current_minutes * 60);
        let next_minutes = self.prev_minutes + self.current_minutes;
        self.prev_minutes = self.current_minutes;
        self.current_minutes = next_minutes.min(self.max_minutes);
        wait
    }

    pub fn reset(&mut self) {
        self.prev_minutes = 0;
        self.current_minutes = self.min_minutes;
    }
}

/// Error bookkeeping for one central
#[derive(Debug, Clone)]
pub struct BackoffState {
    backoff: FibonacciBackoff,
    error_count: u32,
    retry_at: Option<Instant>,
}

impl Default for BackoffState {
    fn default() -> Self {
        Self::new()
    }
}

impl BackoffState {
    pub fn new() -> Self {
        Self {
            backoff: FibonacciBackoff::new(1, 10),
            error_count: 0,
            retry_at: None,
        }
    }

    /// Record a failure observed at `now`; returns the wait before the next attempt
    pub fn record_failure(&mut self, now: Instant) -> Duration {
        self.error_count += 1;
        let wait = self.backoff.next_backoff();
        self.retry_at = Some(now + wait);
        wait
    }

    pub fn record_success(&mut self) {
        self.error_count = 0;
        self.retry_at = None;
        self.backoff.reset();
    }

    /// Whether a new attempt is allowed at `now`
    pub fn ready(&self, now: Instant) -> bool {
        self.retry_at.is_none_or(|at| now >= at)
    }

    pub fn error_count(&self) -> u32 {
        self.error_count
    }
}
