//! Execution feedback recorded by the learning ledger.

use crate::action::{Action, ActionResult, ActionTarget, ActionType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One executed action and what came of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    pub sequence: u64,
    pub action: Action,
    pub outcome: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Feedback {
    pub fn new(sequence: u64, action: Action, result: &ActionResult) -> Self {
        Self {
            sequence,
            action,
            outcome: result.outcome.clone(),
            success: result.success,
            error: result.error.clone(),
            timestamp: Utc::now(),
        }
    }
}

/// Identity of an action for pattern learning.
///
/// Targets are normalized: surrounding whitespace trimmed and inner runs
/// collapsed to one space. Navigation URLs are lowercased with a single
/// trailing `/` removed. Field-map targets reduce to their sorted field
/// names, so the values typed into a form do not split the pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PatternKey {
    pub kind: ActionType,
    pub target: String,
}

impl PatternKey {
    pub fn of(action: &Action) -> Self {
        let target = match &action.target {
            ActionTarget::Text(text) => {
                let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
                if action.kind == ActionType::Navigate {
                    let lowered = collapsed.to_lowercase();
                    match lowered.strip_suffix('/') {
                        Some(stripped) => stripped.to_string(),
                        None => lowered,
                    }
                } else {
                    collapsed
                }
            }
            ActionTarget::Fields(fields) => fields.keys().cloned().collect::<Vec<_>>().join(","),
        };
        Self {
            kind: action.kind.clone(),
            target,
        }
    }
}

impl fmt::Display for PatternKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.kind, self.target)
    }
}

/// Aggregate view over the ledger.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningStats {
    pub total_actions: usize,
    pub success_pattern_count: usize,
    pub failure_pattern_count: usize,
    pub success_rate: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    #[test]
    fn navigate_keys_ignore_case_and_trailing_slash() {
        let a = PatternKey::of(&Action::navigate("https://Example.com/"));
        let b = PatternKey::of(&Action::navigate("  https://example.com "));
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "navigate_https://example.com");
    }

    #[test]
    fn selector_keys_keep_case_but_collapse_whitespace() {
        let a = PatternKey::of(&Action::click("button   #Signup"));
        let b = PatternKey::of(&Action::click("button #Signup").with_description("other"));
        assert_eq!(a, b);
        assert_ne!(a, PatternKey::of(&Action::click("button #signup")));
    }

    #[test]
    fn form_keys_use_sorted_field_names() {
        let mut first = BTreeMap::new();
        first.insert("password".to_string(), json!("x"));
        first.insert("email".to_string(), json!("a@b.c"));
        let mut second = BTreeMap::new();
        second.insert("email".to_string(), json!("other@b.c"));
        second.insert("password".to_string(), json!("y"));
        let a = PatternKey::of(&Action::fill_form(first));
        let b = PatternKey::of(&Action::fill_form(second));
        assert_eq!(a, b);
        assert_eq!(a.target, "email,password");
    }
}
