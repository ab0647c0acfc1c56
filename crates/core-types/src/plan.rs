//! Linear execution plans.

use crate::action::{Action, ActionTarget, ActionType};
use crate::lenient;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One step of a [`Plan`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub action: ActionType,
    #[serde(default)]
    pub target: ActionTarget,
    #[serde(default, deserialize_with = "lenient::string")]
    pub description: String,
    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub wait_for: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(
        default,
        deserialize_with = "lenient::string_list",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub alternatives: Vec<String>,
}

/// Post-step settle condition named by `waitFor`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitCondition {
    PageLoad,
    Selector(String),
}

impl Step {
    pub fn new(action: ActionType, target: impl Into<ActionTarget>) -> Self {
        Self {
            action,
            target: target.into(),
            description: String::new(),
            wait_for: None,
            data: None,
            alternatives: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_wait_for(mut self, condition: impl Into<String>) -> Self {
        self.wait_for = Some(condition.into());
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_alternatives<I, S>(mut self, alternatives: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.alternatives = alternatives.into_iter().map(Into::into).collect();
        self
    }

    /// Executable action for this step. Form steps take their fields from
    /// `data` when it is an object; other steps use `data` as the typed value.
    pub fn to_action(&self) -> Action {
        let mut action = Action::new(self.action.clone(), self.target.clone())
            .with_description(self.description.clone());
        match (&self.action, &self.data) {
            (ActionType::FillForm, Some(Value::Object(map))) => {
                action.target = ActionTarget::Fields(
                    map.iter()
                        .map(|(key, value)| (key.clone(), value.clone()))
                        .collect(),
                );
            }
            (_, Some(data)) if !data.is_null() => {
                action.value = Some(lenient::value_to_text(data));
            }
            _ => {}
        }
        action
    }

    pub fn wait_condition(&self) -> Option<WaitCondition> {
        let raw = self.wait_for.as_deref()?.trim();
        if raw.is_empty() {
            return None;
        }
        let lowered = raw.to_ascii_lowercase();
        if matches!(lowered.as_str(), "page load" | "pageload" | "load" | "completion") {
            return Some(WaitCondition::PageLoad);
        }
        if lowered == "element" {
            return Some(WaitCondition::Selector("body".to_string()));
        }
        let selector = raw
            .strip_prefix("element:")
            .map(str::trim)
            .unwrap_or(raw);
        Some(WaitCondition::Selector(selector.to_string()))
    }
}

/// Ordered list of steps with the outcome the planner expects.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    #[serde(default, deserialize_with = "lenient::list")]
    pub steps: Vec<Step>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub expected_outcome: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub risk_level: String,
}

impl Plan {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps,
            expected_outcome: String::new(),
            risk_level: String::new(),
        }
    }

    pub fn with_expected_outcome(mut self, outcome: impl Into<String>) -> Self {
        self.expected_outcome = outcome.into();
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Plan used when the planner cannot draft one: open the first URL or
    /// domain in the objective, or a search engine.
    pub fn fallback(objective: &str) -> Self {
        let target = url_in(objective)
            .unwrap_or_else(|| "https://www.google.com".to_string());
        let step = Step::new(ActionType::Navigate, target.clone())
            .with_description(format!("Navigate to {target} to execute command: {objective}"))
            .with_wait_for("page load");
        let mut plan = Plan::new(vec![step])
            .with_expected_outcome(format!("Complete the task: {objective}"));
        plan.risk_level = "medium".to_string();
        plan
    }
}

/// First URL-looking token of `text`. An explicit `http(s)://` URL is kept
/// as written; a bare domain gets an `https://` scheme.
fn url_in(text: &str) -> Option<String> {
    text.split_whitespace().find_map(|token| {
        let token = token
            .trim_start_matches(|c: char| matches!(c, '"' | '\'' | '(' | '<' | '['))
            .trim_end_matches(|c: char| {
                matches!(c, '"' | '\'' | ')' | '>' | ']' | ',' | ';' | '.' | '!' | '?')
            });
        let (scheme, rest) = match token.split_once("://") {
            Some((scheme, rest))
                if scheme.eq_ignore_ascii_case("https") || scheme.eq_ignore_ascii_case("http") =>
            {
                (Some(scheme), rest)
            }
            Some(_) => return None,
            None => (None, token),
        };
        let host = rest
            .split(|c| matches!(c, '/' | '?' | '#'))
            .next()
            .unwrap_or_default();
        if !is_domain(host) {
            return None;
        }
        Some(match scheme {
            Some(_) => token.to_string(),
            None => format!("https://{rest}"),
        })
    })
}

fn is_domain(host: &str) -> bool {
    let host = host.split(':').next().unwrap_or_default();
    let Some((name, tld)) = host.rsplit_once('.') else {
        return false;
    };
    let valid_name = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');
    valid_name && tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic())
}
