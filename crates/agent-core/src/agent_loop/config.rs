//! Configuration for the adaptive execution loop.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the adaptive (observe-evaluate-decide-act) loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    /// Maximum iterations before giving up.
    /// Default: 20
    pub max_iterations: u32,

    /// Consecutive failed actions that, together with a stuck evaluation,
    /// trigger a strategy adaptation. Also the number of consecutive
    /// iteration-level errors that abort the run.
    /// Default: 3
    pub max_consecutive_failures: u32,

    /// Progress score at which the objective counts as achieved.
    /// Default: 0.9
    pub completion_threshold: f64,

    /// Pause after a normal decide/execute cycle, in milliseconds.
    /// Default: 1000
    pub iteration_delay_ms: u64,

    /// Pause after an iteration-level error, in milliseconds.
    /// Default: 2000
    pub error_delay_ms: u64,

    /// Timeout for each oracle call in milliseconds (0 disables it).
    /// Default: 60000 (60 seconds)
    pub oracle_timeout_ms: u64,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            max_iterations: 20,
            max_consecutive_failures: 3,
            completion_threshold: 0.9,
            iteration_delay_ms: 1_000,
            error_delay_ms: 2_000,
            oracle_timeout_ms: 60_000,
        }
    }
}

impl LoopConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a minimal config for testing: no pauses, short timeouts.
    pub fn minimal() -> Self {
        Self {
            max_iterations: 10,
            max_consecutive_failures: 3,
            completion_threshold: 0.9,
            iteration_delay_ms: 0,
            error_delay_ms: 0,
            oracle_timeout_ms: 5_000,
        }
    }

    /// Builder: set max iterations.
    pub fn max_iterations(mut self, iterations: u32) -> Self {
        self.max_iterations = iterations;
        self
    }

    /// Builder: set the consecutive failure limit.
    pub fn max_consecutive_failures(mut self, failures: u32) -> Self {
        self.max_consecutive_failures = failures;
        self
    }

    /// Builder: set the completion threshold, clamped to `0.0..=1.0`.
    pub fn completion_threshold(mut self, threshold: f64) -> Self {
        self.completion_threshold = threshold.clamp(0.0, 1.0);
        self
    }

    /// Builder: set oracle timeout.
    pub fn oracle_timeout(mut self, ms: u64) -> Self {
        self.oracle_timeout_ms = ms;
        self
    }

    pub fn oracle_timeout_duration(&self) -> Option<Duration> {
        (self.oracle_timeout_ms > 0).then(|| Duration::from_millis(self.oracle_timeout_ms))
    }
}
