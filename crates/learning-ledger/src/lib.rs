//! Append-only feedback log with success and failure pattern indices.
//!
//! Every executed action is recorded exactly once. Patterns are keyed by
//! [`PatternKey`], so the same action aimed at the same normalized target
//! accumulates into one pattern regardless of its description.

mod context;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::debug;
use webpilot_core_types::{Action, ActionResult, Feedback, LearningStats, PatternKey};

pub use context::ContextEntry;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// History length that triggers truncation.
    pub history_limit: usize,
    /// Entries kept after truncation, newest first.
    pub history_retain: usize,
    /// Entries kept per pattern key in each index.
    pub pattern_retention: usize,
    /// Patterns included in a success or failure context.
    pub context_limit: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            history_limit: 100,
            history_retain: 50,
            pattern_retention: 20,
            context_limit: 5,
        }
    }
}

#[derive(Debug, Default)]
struct PatternIndex {
    entries: HashMap<PatternKey, PatternEntry>,
}

#[derive(Debug, Default)]
struct PatternEntry {
    count: u64,
    recent: VecDeque<Feedback>,
}

impl PatternIndex {
    fn push(&mut self, key: PatternKey, feedback: Feedback, retention: usize) {
        let entry = self.entries.entry(key).or_default();
        entry.count += 1;
        entry.recent.push_back(feedback);
        while entry.recent.len() > retention.max(1) {
            entry.recent.pop_front();
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// The learning ledger. See the crate docs.
#[derive(Debug, Default)]
pub struct Ledger {
    config: LedgerConfig,
    history: Vec<Feedback>,
    successes: PatternIndex,
    failures: PatternIndex,
    next_sequence: u64,
}

impl Ledger {
    pub fn new() -> Self {
        Self::with_config(LedgerConfig::default())
    }

    pub fn with_config(config: LedgerConfig) -> Self {
        Self {
            config,
            history: Vec::new(),
            successes: PatternIndex::default(),
            failures: PatternIndex::default(),
            next_sequence: 1,
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Append feedback for an executed action and update the pattern indices.
    pub fn record(&mut self, action: &Action, result: &ActionResult) -> Feedback {
        let sequence = self.next_sequence.max(1);
        self.next_sequence = sequence + 1;
        let feedback = Feedback::new(sequence, action.clone(), result);
        let key = PatternKey::of(action);
        let retention = self.config.pattern_retention;

        if feedback.success {
            self.successes.push(key, feedback.clone(), retention);
        } else {
            self.failures.push(key, feedback.clone(), retention);
        }

        self.history.push(feedback.clone());
        if self.history.len() > self.config.history_limit {
            let keep = self.config.history_retain.min(self.history.len());
            let drop = self.history.len() - keep;
            self.history.drain(..drop);
            debug!(dropped = drop, kept = keep, "ledger history truncated");
        }
        feedback
    }

    pub fn history(&self) -> &[Feedback] {
        &self.history
    }

    /// The newest `n` entries, oldest first.
    pub fn recent(&self, n: usize) -> Vec<Feedback> {
        let start = self.history.len().saturating_sub(n);
        self.history[start..].to_vec()
    }

    /// Failures among the newest `n` entries, oldest first.
    pub fn recent_failures(&self, n: usize) -> Vec<Feedback> {
        self.recent(n).into_iter().filter(|f| !f.success).collect()
    }

    /// JSON array of the most relevant successful patterns for `objective`.
    pub fn success_context(&self, objective: &str) -> String {
        context::render(
            &self.successes.entries,
            objective,
            self.config.context_limit,
            context::Polarity::Success,
        )
    }

    /// JSON array of the most relevant failed patterns for `objective`.
    pub fn failure_context(&self, objective: &str) -> String {
        context::render(
            &self.failures.entries,
            objective,
            self.config.context_limit,
            context::Polarity::Failure,
        )
    }

    pub fn stats(&self) -> LearningStats {
        let total = self.history.len();
        let succeeded = self.history.iter().filter(|f| f.success).count();
        LearningStats {
            total_actions: total,
            success_pattern_count: self.successes.len(),
            failure_pattern_count: self.failures.len(),
            success_rate: if total > 0 {
                succeeded as f64 / total as f64
            } else {
                0.0
            },
        }
    }
}

/// Ledger handle shared across tasks. The lock is held for one call only.
#[derive(Debug, Clone, Default)]
pub struct SharedLedger {
    inner: Arc<RwLock<Ledger>>,
}

impl SharedLedger {
    pub fn new(ledger: Ledger) -> Self {
        Self {
            inner: Arc::new(RwLock::new(ledger)),
        }
    }

    pub fn record(&self, action: &Action, result: &ActionResult) -> Feedback {
        self.inner.write().record(action, result)
    }

    pub fn recent(&self, n: usize) -> Vec<Feedback> {
        self.inner.read().recent(n)
    }

    pub fn recent_failures(&self, n: usize) -> Vec<Feedback> {
        self.inner.read().recent_failures(n)
    }

    pub fn history(&self) -> Vec<Feedback> {
        self.inner.read().history().to_vec()
    }

    pub fn success_context(&self, objective: &str) -> String {
        self.inner.read().success_context(objective)
    }

    pub fn failure_context(&self, objective: &str) -> String {
        self.inner.read().failure_context(objective)
    }

    pub fn stats(&self) -> LearningStats {
        self.inner.read().stats()
    }
}
