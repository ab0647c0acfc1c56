//! Terminal results of the adaptive loop and the linear plan runner.

use crate::action::ActionResult;
use crate::observation::Observation;
use crate::plan::Plan;
use serde::{Deserialize, Serialize};

/// Final status of an adaptive loop run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopStatus {
    /// The evaluator judged the objective achieved.
    Completed,
    /// The iteration budget ran out.
    Exhausted,
    /// The decision engine asked to stop.
    Stopped,
    /// Repeated iteration-level errors aborted the run.
    Failed,
}

/// Result of an adaptive loop execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoopResult {
    /// True only for [`LoopStatus::Completed`].
    pub success: bool,
    /// Terminal status.
    pub status: LoopStatus,
    /// Human-readable summary.
    pub message: String,
    /// Iterations started, never above the configured maximum.
    pub iterations: u32,
    /// Strategy adaptations performed.
    pub adaptations: u32,
    /// Last observed page state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_state: Option<Observation>,
    /// Page state observed before the most recent successful action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_successful_state: Option<Observation>,
}

impl LoopResult {
    pub fn completed(iterations: u32, adaptations: u32, final_state: Observation) -> Self {
        Self {
            success: true,
            status: LoopStatus::Completed,
            message: "Task completed successfully".to_string(),
            iterations,
            adaptations,
            final_state: Some(final_state),
            last_successful_state: None,
        }
    }

    pub fn exhausted(iterations: u32, adaptations: u32) -> Self {
        Self {
            success: false,
            status: LoopStatus::Exhausted,
            message: not_completed(iterations, adaptations),
            iterations,
            adaptations,
            final_state: None,
            last_successful_state: None,
        }
    }

    pub fn stopped(iterations: u32, adaptations: u32, reason: impl Into<String>) -> Self {
        Self {
            success: false,
            status: LoopStatus::Stopped,
            message: with_counts(reason.into(), iterations, adaptations),
            iterations,
            adaptations,
            final_state: None,
            last_successful_state: None,
        }
    }

    pub fn failed(iterations: u32, adaptations: u32, message: impl Into<String>) -> Self {
        Self {
            success: false,
            status: LoopStatus::Failed,
            message: with_counts(message.into(), iterations, adaptations),
            iterations,
            adaptations,
            final_state: None,
            last_successful_state: None,
        }
    }

    pub fn with_states(
        mut self,
        final_state: Option<Observation>,
        last_successful_state: Option<Observation>,
    ) -> Self {
        if self.final_state.is_none() {
            self.final_state = final_state;
        }
        self.last_successful_state = last_successful_state;
        self
    }
}

/// Final status of a linear plan run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    Completed,
    Failed,
    Cancelled,
}

/// Result of a linear plan execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanResult {
    pub status: PlanStatus,
    pub message: String,
    /// Index of the next step that would have run.
    pub cursor: usize,
    /// Steps of the final plan completed, equal to `cursor`.
    pub completed_steps: usize,
    pub total_steps: usize,
    pub replans: u32,
    pub step_executions: u32,
    /// The plan in force when the run ended.
    pub plan: Plan,
    /// Outcome of every step execution, in order.
    #[serde(default)]
    pub results: Vec<ActionResult>,
}

impl PlanResult {
    pub fn is_success(&self) -> bool {
        self.status == PlanStatus::Completed
    }
}

fn not_completed(iterations: u32, adaptations: u32) -> String {
    format!(
        "Task not completed after {iterations} iterations. {adaptations} strategy adaptations were attempted."
    )
}

/// `cause` followed by the run's iteration and adaptation counts.
fn with_counts(cause: String, iterations: u32, adaptations: u32) -> String {
    let cause = cause.trim().trim_end_matches('.');
    let summary = not_completed(iterations, adaptations);
    if cause.is_empty() {
        summary
    } else {
        format!("{cause}. {summary}")
    }
}
