//! Actions requested by the oracle and their normalized outcomes.

use crate::lenient;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Kind of browser operation. Unrecognized names are preserved so the
/// executor can report them instead of failing to parse the whole decision.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActionType {
    Navigate,
    Click,
    Type,
    Wait,
    Scroll,
    FillForm,
    SolveCaptcha,
    Complete,
    Other(String),
}

impl ActionType {
    pub fn parse(raw: &str) -> Self {
        let normalized = raw
            .trim()
            .to_ascii_lowercase()
            .replace(['-', ' '], "_");
        match normalized.as_str() {
            "navigate" | "goto" | "open" => ActionType::Navigate,
            "click" => ActionType::Click,
            "type" | "type_text" => ActionType::Type,
            "wait" => ActionType::Wait,
            "scroll" => ActionType::Scroll,
            "fill_form" | "fillform" => ActionType::FillForm,
            "solve_captcha" => ActionType::SolveCaptcha,
            "complete" | "done" => ActionType::Complete,
            _ => ActionType::Other(raw.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ActionType::Navigate => "navigate",
            ActionType::Click => "click",
            ActionType::Type => "type",
            ActionType::Wait => "wait",
            ActionType::Scroll => "scroll",
            ActionType::FillForm => "fill_form",
            ActionType::SolveCaptcha => "solve_captcha",
            ActionType::Complete => "complete",
            ActionType::Other(name) => name,
        }
    }

    /// Actions whose failure may be caused by bot detection on the page.
    pub fn touches_page(&self) -> bool {
        matches!(
            self,
            ActionType::Navigate | ActionType::Click | ActionType::Type
        )
    }
}

impl From<String> for ActionType {
    fn from(value: String) -> Self {
        ActionType::parse(&value)
    }
}

impl From<&str> for ActionType {
    fn from(value: &str) -> Self {
        ActionType::parse(value)
    }
}

impl From<ActionType> for String {
    fn from(value: ActionType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an action operates on: a selector, URL, duration or direction, or a
/// field map for form filling.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ActionTarget {
    Text(String),
    Fields(BTreeMap<String, Value>),
}

impl ActionTarget {
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => ActionTarget::Fields(map.into_iter().collect()),
            other => ActionTarget::Text(lenient::value_to_text(&other)),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ActionTarget::Text(text) => Some(text.as_str()),
            ActionTarget::Fields(_) => None,
        }
    }

    pub fn as_fields(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            ActionTarget::Fields(fields) => Some(fields),
            ActionTarget::Text(_) => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            ActionTarget::Text(text) => text.trim().is_empty(),
            ActionTarget::Fields(fields) => fields.is_empty(),
        }
    }
}

impl Default for ActionTarget {
    fn default() -> Self {
        ActionTarget::Text(String::new())
    }
}

impl<'de> Deserialize<'de> for ActionTarget {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(ActionTarget::from_value(value))
    }
}

impl From<&str> for ActionTarget {
    fn from(value: &str) -> Self {
        ActionTarget::Text(value.to_string())
    }
}

impl From<String> for ActionTarget {
    fn from(value: String) -> Self {
        ActionTarget::Text(value)
    }
}

impl From<BTreeMap<String, Value>> for ActionTarget {
    fn from(value: BTreeMap<String, Value>) -> Self {
        ActionTarget::Fields(value)
    }
}

impl fmt::Display for ActionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionTarget::Text(text) => f.write_str(text),
            ActionTarget::Fields(fields) => {
                let names: Vec<&str> = fields.keys().map(String::as_str).collect();
                write!(f, "{{{}}}", names.join(","))
            }
        }
    }
}

/// One atomic browser operation. Actions are not mutated once created; a
/// fallback attempt builds a new action via [`Action::retarget`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    #[serde(rename = "type")]
    pub kind: ActionType,
    #[serde(default)]
    pub target: ActionTarget,
    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub value: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub description: String,
    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub reasoning: Option<String>,
    #[serde(default, deserialize_with = "lenient::number")]
    pub confidence: f64,
    #[serde(default, deserialize_with = "lenient::string")]
    pub expected_outcome: String,
}

impl Action {
    pub fn new(kind: ActionType, target: impl Into<ActionTarget>) -> Self {
        Self {
            kind,
            target: target.into(),
            value: None,
            description: String::new(),
            reasoning: None,
            confidence: 0.0,
            expected_outcome: String::new(),
        }
    }

    pub fn navigate(url: impl Into<String>) -> Self {
        let url = url.into();
        Self::new(ActionType::Navigate, url.clone()).with_description(format!("Navigate to {url}"))
    }

    pub fn click(selector: impl Into<String>) -> Self {
        let selector = selector.into();
        Self::new(ActionType::Click, selector.clone())
            .with_description(format!("Click {selector}"))
    }

    pub fn type_text(selector: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(ActionType::Type, selector.into()).with_value(text)
    }

    pub fn wait(millis: u64, description: impl Into<String>) -> Self {
        Self::new(ActionType::Wait, millis.to_string()).with_description(description)
    }

    pub fn fill_form(fields: BTreeMap<String, Value>) -> Self {
        Self::new(ActionType::FillForm, fields).with_description("Fill form fields")
    }

    pub fn complete(description: impl Into<String>) -> Self {
        Self::new(ActionType::Complete, "").with_description(description)
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = Some(reasoning.into());
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_expected_outcome(mut self, outcome: impl Into<String>) -> Self {
        self.expected_outcome = outcome.into();
        self
    }

    /// Copy of this action aimed at a different target.
    pub fn retarget(&self, target: impl Into<ActionTarget>) -> Self {
        let mut next = self.clone();
        next.target = target.into();
        next
    }

    /// Short `kind target` label used in logs and history.
    pub fn label(&self) -> String {
        if self.target.is_empty() {
            self.kind.to_string()
        } else {
            format!("{} {}", self.kind, self.target)
        }
    }
}

/// Normalized outcome of executing one [`Action`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    pub outcome: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionResult {
    pub fn ok(outcome: impl Into<String>) -> Self {
        Self {
            success: true,
            outcome: outcome.into(),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            success: false,
            outcome: format!("Action failed: {error}"),
            error: Some(error),
        }
    }

    pub fn error_text(&self) -> &str {
        self.error.as_deref().unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_known_and_unknown_types() {
        assert_eq!(ActionType::parse("Fill-Form"), ActionType::FillForm);
        assert_eq!(ActionType::parse(" click "), ActionType::Click);
        assert_eq!(
            ActionType::parse("extract"),
            ActionType::Other("extract".into())
        );
        assert_eq!(ActionType::Other("extract".into()).to_string(), "extract");
    }

    #[test]
    fn scalar_targets_become_text() {
        let action: Action =
            serde_json::from_value(json!({"type": "wait", "target": 5000})).expect("action");
        assert_eq!(action.kind, ActionType::Wait);
        assert_eq!(action.target.as_text(), Some("5000"));
        assert_eq!(action.confidence, 0.0);
    }

    #[test]
    fn object_targets_become_fields() {
        let action: Action = serde_json::from_value(json!({
            "type": "fill_form",
            "target": {"email": "a@b.c", "age": 30},
            "description": "fill"
        }))
        .expect("action");
        let fields = action.target.as_fields().expect("fields");
        assert_eq!(fields.len(), 2);
        assert_eq!(fields["age"], json!(30));
    }

    #[test]
    fn serializes_with_wire_names() {
        let action = Action::click("button#signup").with_expected_outcome("form opens");
        let value = serde_json::to_value(&action).expect("serialize");
        assert_eq!(value["type"], "click");
        assert_eq!(value["target"], "button#signup");
        assert_eq!(value["expectedOutcome"], "form opens");
        assert!(value.get("value").is_none());
    }

    #[test]
    fn retarget_leaves_original_untouched() {
        let original = Action::click("#a");
        let alternative = original.retarget("#b");
        assert_eq!(original.target.as_text(), Some("#a"));
        assert_eq!(alternative.target.as_text(), Some("#b"));
        assert_eq!(alternative.kind, ActionType::Click);
    }

    #[test]
    fn failed_result_carries_error() {
        let result = ActionResult::failed("element not found");
        assert!(!result.success);
        assert_eq!(result.error_text(), "element not found");
    }
}
