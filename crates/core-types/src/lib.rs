//! Shared data model for the WebPilot execution loop.
//!
//! Every type that crosses the oracle boundary serializes with camelCase
//! field names and tolerates missing fields, so partially-formed oracle
//! output still deserializes into something usable.

pub mod action;
pub mod evaluation;
pub mod feedback;
pub mod lenient;
pub mod observation;
pub mod outcome;
pub mod plan;

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub use action::{Action, ActionResult, ActionTarget, ActionType};
pub use evaluation::{Adaptation, Decision, Progress, RiskLevel};
pub use feedback::{Feedback, LearningStats, PatternKey};
pub use observation::{
    FormField, NavigationOption, Observation, PageMessage, PageSnapshot, PageType, Readiness,
};
pub use outcome::{LoopResult, LoopStatus, PlanResult, PlanStatus};
pub use plan::{Plan, Step, WaitCondition};

/// Identifier of a single task run.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_ids_are_unique() {
        let a = TaskId::new();
        let b = TaskId::new();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 36);
    }
}
