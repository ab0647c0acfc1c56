//! Oracle-backed roles of the adaptive loop.
//!
//! Every role makes exactly one [`Planner`] call bounded by the oracle
//! timeout. Whatever goes wrong, the role answers with its conservative
//! fallback, so callers never see an error. Oracle unavailability is never
//! reported as completion.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::warn;

use webpilot_core_types::{
    Adaptation, Decision, Feedback, Observation, PageSnapshot, Progress,
};

use crate::errors::AgentError;
use crate::planner::Planner;

/// Feedback entries handed to the progress evaluator.
pub const EVALUATION_WINDOW: usize = 10;

/// Feedback entries handed to the decision engine.
pub const DECISION_WINDOW: usize = 5;

async fn consult<T, F>(role: &'static str, limit: Option<Duration>, call: F) -> Result<T, AgentError>
where
    F: Future<Output = Result<T, AgentError>>,
{
    let result = match limit {
        Some(limit) => timeout(limit, call)
            .await
            .unwrap_or_else(|_| Err(AgentError::Timeout(limit.as_millis() as u64))),
        None => call.await,
    };
    if let Err(err) = &result {
        warn!(role, reason = err.reason(), error = %err, "oracle call failed, using fallback");
    }
    result
}

fn tail(history: &[Feedback], window: usize) -> &[Feedback] {
    &history[history.len().saturating_sub(window)..]
}

/// Turns a raw page snapshot into an [`Observation`].
#[derive(Clone)]
pub struct StateObserver {
    planner: Arc<dyn Planner>,
    timeout: Option<Duration>,
}

impl StateObserver {
    pub fn new(planner: Arc<dyn Planner>, timeout: Option<Duration>) -> Self {
        Self { planner, timeout }
    }

    pub async fn observe(&self, snapshot: &PageSnapshot) -> Observation {
        consult("observe", self.timeout, self.planner.observe(snapshot))
            .await
            .unwrap_or_else(|_| Observation::unavailable())
    }
}

/// Scores progress toward the objective.
#[derive(Clone)]
pub struct ProgressEvaluator {
    planner: Arc<dyn Planner>,
    timeout: Option<Duration>,
}

impl ProgressEvaluator {
    pub fn new(planner: Arc<dyn Planner>, timeout: Option<Duration>) -> Self {
        Self { planner, timeout }
    }

    /// Evaluate with the last [`EVALUATION_WINDOW`] entries of `history`.
    pub async fn evaluate(
        &self,
        objective: &str,
        initial: &Observation,
        current: &Observation,
        history: &[Feedback],
    ) -> Progress {
        let window = tail(history, EVALUATION_WINDOW);
        consult(
            "evaluate",
            self.timeout,
            self.planner.evaluate(objective, initial, current, window),
        )
        .await
        .unwrap_or_else(|_| Progress::unavailable())
    }
}

/// Picks the next action.
#[derive(Clone)]
pub struct DecisionEngine {
    planner: Arc<dyn Planner>,
    timeout: Option<Duration>,
}

impl DecisionEngine {
    pub fn new(planner: Arc<dyn Planner>, timeout: Option<Duration>) -> Self {
        Self { planner, timeout }
    }

    /// Decide with the last [`DECISION_WINDOW`] entries of `history` and the
    /// ledger's success and failure context.
    pub async fn decide(
        &self,
        objective: &str,
        state: &Observation,
        history: &[Feedback],
        success_context: &str,
        failure_context: &str,
    ) -> Decision {
        let window = tail(history, DECISION_WINDOW);
        consult(
            "decide",
            self.timeout,
            self.planner
                .decide(objective, state, window, success_context, failure_context),
        )
        .await
        .unwrap_or_else(|_| Decision::unavailable())
    }
}

/// Proposes a strategy change after repeated failures.
#[derive(Clone)]
pub struct StrategyAdapter {
    planner: Arc<dyn Planner>,
    timeout: Option<Duration>,
}

impl StrategyAdapter {
    pub fn new(planner: Arc<dyn Planner>, timeout: Option<Duration>) -> Self {
        Self { planner, timeout }
    }

    pub async fn adapt(
        &self,
        objective: &str,
        state: &Observation,
        failures: &[Feedback],
    ) -> Adaptation {
        consult(
            "adapt",
            self.timeout,
            self.planner.adapt(objective, state, failures),
        )
        .await
        .unwrap_or_else(|_| Adaptation::unavailable(objective))
    }
}

/// The four roles sharing one planner.
#[derive(Clone)]
pub struct Roles {
    pub observer: StateObserver,
    pub evaluator: ProgressEvaluator,
    pub decider: DecisionEngine,
    pub adapter: StrategyAdapter,
}

impl Roles {
    pub fn new(planner: Arc<dyn Planner>, timeout: Option<Duration>) -> Self {
        Self {
            observer: StateObserver::new(planner.clone(), timeout),
            evaluator: ProgressEvaluator::new(planner.clone(), timeout),
            decider: DecisionEngine::new(planner.clone(), timeout),
            adapter: StrategyAdapter::new(planner, timeout),
        }
    }
}
