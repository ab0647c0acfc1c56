//! Executor timing and fallback configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for [`crate::DefaultActionExecutor`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Settle time after a navigation.
    /// Default: 3000
    pub navigate_settle_ms: u64,

    /// Settle time after a successful click.
    /// Default: 2000
    pub click_settle_ms: u64,

    /// Duration of a `wait` action whose target is not a number.
    /// Default: 3000
    pub default_wait_ms: u64,

    /// Upper bound for one browser call; 0 disables the bound.
    /// Default: 30000
    pub action_timeout_ms: u64,

    /// Derived alternative targets tried after a failed click.
    /// Default: 1
    pub max_click_alternatives: usize,

    /// Upper bound for a step's element wait condition.
    /// Default: 10000
    pub element_wait_timeout_ms: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            navigate_settle_ms: 3_000,
            click_settle_ms: 2_000,
            default_wait_ms: 3_000,
            action_timeout_ms: 30_000,
            max_click_alternatives: 1,
            element_wait_timeout_ms: 10_000,
        }
    }
}

impl ExecutorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// No settle delays; for tests and dry runs.
    pub fn minimal() -> Self {
        Self {
            navigate_settle_ms: 0,
            click_settle_ms: 0,
            default_wait_ms: 0,
            action_timeout_ms: 5_000,
            max_click_alternatives: 1,
            element_wait_timeout_ms: 1_000,
        }
    }

    /// Builder: set action timeout.
    pub fn action_timeout(mut self, millis: u64) -> Self {
        self.action_timeout_ms = millis;
        self
    }

    /// Builder: set the number of click alternatives.
    pub fn click_alternatives(mut self, count: usize) -> Self {
        self.max_click_alternatives = count;
        self
    }

    /// Builder: set the default wait duration.
    pub fn default_wait(mut self, millis: u64) -> Self {
        self.default_wait_ms = millis;
        self
    }

    pub fn action_timeout_duration(&self) -> Option<Duration> {
        (self.action_timeout_ms > 0).then(|| Duration::from_millis(self.action_timeout_ms))
    }
}
