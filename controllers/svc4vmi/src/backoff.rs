//! # Requeue Backoff
//!
//! Fibonacci-based delays for requeueing keys whose reconcile failed.
//! The sequence grows more slowly than exponential backoff, so a briefly
//! unavailable API server is retried quickly while a persistent failure
//! settles at the cap.
//!
//! Sequence for a 5s minimum and 300s cap: 5s, 5s, 10s, 15s, 25s, 40s, ... 300s.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Fibonacci backoff calculator
///
/// Each backoff is the sum of the previous two, starting from `min_secs` twice
/// and capped at `max_secs`.
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    /// Minimum backoff value in seconds (for reset)
    min_secs: u64,
    /// Previous backoff value in seconds
    prev_secs: u64,
    /// Current backoff value in seconds
    current_secs: u64,
    /// Maximum backoff value in seconds
    max_secs: u64,
}

impl FibonacciBackoff {
    /// Create a new Fibonacci backoff with minimum and maximum values in seconds
    #[must_use]
    pub fn new(min_secs: u64, max_secs: u64) -> Self {
        Self {
            min_secs,
            prev_secs: 0,
            current_secs: min_secs,
            max_secs,
        }
    }

    /// Get the next backoff duration and advance the sequence
    pub fn next_backoff(&mut self) -> Duration {
        let result = self.current_secs;

        let next_secs = self.prev_secs.saturating_add(self.current_secs);
        self.prev_secs = self.current_secs;
        self.current_secs = std::cmp::min(next_secs, self.max_secs);

        Duration::from_secs(result)
    }

    /// Reset the backoff to the initial state
    pub fn reset(&mut self) {
        self.prev_secs = 0;
        self.current_secs = self.min_secs;
    }
}

/// Per-key backoff state for the controller's error policy.
///
/// Failures for a key advance its sequence; a successful reconcile forgets it.
#[derive(Debug)]
pub struct RequeueBackoff {
    min: Duration,
    max: Duration,
    /// namespace/name -> backoff state
    states: Mutex<HashMap<String, FibonacciBackoff>>,
}

impl RequeueBackoff {
    /// Creates backoff state bounded by `min` and `max`.
    #[must_use]
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            min,
            max,
            states: Mutex::new(HashMap::new()),
        }
    }

    /// Shortest delay handed out.
    #[must_use]
    pub fn min_delay(&self) -> Duration {
        self.min
    }

    /// Records a failure for `key` and returns how long to wait before retrying.
    pub fn next_delay(&self, key: &str) -> Duration {
        let mut states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
        states
            .entry(key.to_string())
            .or_insert_with(|| FibonacciBackoff::new(self.min.as_secs(), self.max.as_secs()))
            .next_backoff()
    }

    /// Forgets the failure history of `key`.
    pub fn reset(&self, key: &str) {
        let mut states = self.states.lock().unwrap_or_else(PoisonError::into_inner);
        states.remove(key);
    }
}
