//! Oracle verdicts: progress evaluation, next-action decisions and
//! strategy adaptations, each with a conservative fallback.

use crate::action::{Action, ActionType};
use crate::lenient;
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    #[default]
    Unknown,
}

impl RiskLevel {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "low" => RiskLevel::Low,
            "medium" | "moderate" => RiskLevel::Medium,
            "high" => RiskLevel::High,
            _ => RiskLevel::Unknown,
        }
    }
}

impl<'de> Deserialize<'de> for RiskLevel {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = lenient::string(deserializer)?;
        Ok(RiskLevel::parse(&raw))
    }
}

/// Progress toward the objective as judged by the evaluator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    #[serde(default, deserialize_with = "lenient::unit_interval")]
    pub progress_score: f64,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub is_completed: bool,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub stuck_indicator: bool,
    #[serde(default, deserialize_with = "lenient::string")]
    pub next_milestone: String,
    #[serde(default, deserialize_with = "lenient::count")]
    pub estimated_steps_remaining: u32,
    #[serde(default, deserialize_with = "lenient::unit_interval")]
    pub confidence: f64,
}

impl Progress {
    pub fn new(score: f64) -> Self {
        Self {
            progress_score: lenient::clamp_unit(score),
            is_completed: false,
            stuck_indicator: false,
            next_milestone: String::new(),
            estimated_steps_remaining: 0,
            confidence: 0.5,
        }
    }

    /// Fallback when evaluation failed. Never reports completion.
    pub fn unavailable() -> Self {
        Self {
            progress_score: 0.0,
            is_completed: false,
            stuck_indicator: true,
            next_milestone: "Unknown".to_string(),
            estimated_steps_remaining: 5,
            confidence: 0.1,
        }
    }

    pub fn completed(mut self) -> Self {
        self.is_completed = true;
        self
    }

    pub fn stuck(mut self) -> Self {
        self.stuck_indicator = true;
        self
    }

    /// True when the objective counts as achieved under `threshold`.
    pub fn reaches(&self, threshold: f64) -> bool {
        self.is_completed || self.progress_score >= threshold
    }
}

/// The decision engine's choice of next action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub action: Action,
    #[serde(default, deserialize_with = "lenient::list")]
    pub alternative_actions: Vec<Action>,
    #[serde(default)]
    pub risk_assessment: RiskLevel,
    #[serde(default, deserialize_with = "lenient::unit_interval")]
    pub progress_towards_goal: f64,
    #[serde(default = "default_true", deserialize_with = "lenient::flag_default_true")]
    pub should_continue: bool,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub adaptation_needed: bool,
}

fn default_true() -> bool {
    true
}

impl Decision {
    pub fn new(action: Action) -> Self {
        Self {
            action,
            alternative_actions: Vec::new(),
            risk_assessment: RiskLevel::Unknown,
            progress_towards_goal: 0.0,
            should_continue: true,
            adaptation_needed: false,
        }
    }

    /// Fallback when no decision could be obtained: pause and reassess.
    pub fn unavailable() -> Self {
        let action = Action::wait(3000, "Wait due to decision error")
            .with_reasoning("Decision unavailable, waiting to reassess")
            .with_confidence(0.1)
            .with_expected_outcome("Time to recover from error");
        Self {
            action,
            alternative_actions: Vec::new(),
            risk_assessment: RiskLevel::High,
            progress_towards_goal: 0.0,
            should_continue: true,
            adaptation_needed: true,
        }
    }

    pub fn stop(mut self) -> Self {
        self.should_continue = false;
        self
    }

    pub fn is_completion(&self) -> bool {
        self.action.kind == ActionType::Complete
    }
}

/// A change of strategy after repeated failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Adaptation {
    #[serde(default, deserialize_with = "lenient::string")]
    pub new_strategy: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub reasoning: String,
    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub alternative_objective: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub next_action: Option<Action>,
    #[serde(default)]
    pub risk_level: RiskLevel,
}

impl Adaptation {
    pub fn new(strategy: impl Into<String>) -> Self {
        Self {
            new_strategy: strategy.into(),
            reasoning: String::new(),
            alternative_objective: None,
            next_action: None,
            risk_level: RiskLevel::Unknown,
        }
    }

    pub fn with_next_action(mut self, action: Action) -> Self {
        self.next_action = Some(action);
        self
    }

    /// Fallback when the adapter could not produce a strategy.
    pub fn unavailable(objective: &str) -> Self {
        Self {
            new_strategy: "Wait and retry with basic navigation".to_string(),
            reasoning: "Strategy adaptation failed, falling back to simple approach".to_string(),
            alternative_objective: Some(objective.to_string()),
            next_action: Some(
                Action::wait(5000, "Wait before retrying").with_confidence(0.3),
            ),
            risk_level: RiskLevel::Medium,
        }
    }
}
