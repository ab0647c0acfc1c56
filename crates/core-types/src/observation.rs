//! Structured view of the page as reported by the state observer.

use crate::action::Action;
use crate::lenient;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PageType {
    Login,
    Registration,
    Form,
    Dashboard,
    Error,
    Loading,
    Search,
    Product,
    Checkout,
    Other,
    #[default]
    Unknown,
}

impl PageType {
    pub fn parse(raw: &str) -> Self {
        match normalize_label(raw).as_str() {
            "login" | "signin" | "sign_in" => PageType::Login,
            "registration" | "signup" | "sign_up" | "register" => PageType::Registration,
            "form" => PageType::Form,
            "dashboard" => PageType::Dashboard,
            "error" => PageType::Error,
            "loading" => PageType::Loading,
            "search" => PageType::Search,
            "product" => PageType::Product,
            "checkout" => PageType::Checkout,
            "other" => PageType::Other,
            _ => PageType::Unknown,
        }
    }
}

impl<'de> Deserialize<'de> for PageType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = lenient::string(deserializer)?;
        Ok(PageType::parse(&raw))
    }
}

/// Whether the page can currently be acted upon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Readiness {
    Ready,
    Loading,
    Error,
    Blocked,
    #[default]
    Unknown,
}

impl Readiness {
    pub fn parse(raw: &str) -> Self {
        match normalize_label(raw).as_str() {
            "ready" | "loaded" | "complete" => Readiness::Ready,
            "loading" => Readiness::Loading,
            "error" => Readiness::Error,
            "blocked" => Readiness::Blocked,
            _ => Readiness::Unknown,
        }
    }
}

impl<'de> Deserialize<'de> for Readiness {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = lenient::string(deserializer)?;
        Ok(Readiness::parse(&raw))
    }
}

fn normalize_label(raw: &str) -> String {
    raw.trim().to_ascii_lowercase().replace(['-', ' '], "_")
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormField {
    #[serde(default, deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(rename = "type", default, deserialize_with = "lenient::string")]
    pub field_type: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub selector: String,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub required: bool,
    #[serde(
        default,
        deserialize_with = "lenient::opt_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub current_value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PageMessage {
    #[serde(rename = "type", default, deserialize_with = "lenient::string")]
    pub kind: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub text: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub selector: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NavigationOption {
    #[serde(default, deserialize_with = "lenient::string")]
    pub text: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub url: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub selector: String,
}

/// Structured snapshot of browser-visible state.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    #[serde(default)]
    pub page_type: PageType,
    #[serde(default, deserialize_with = "lenient::list")]
    pub available_actions: Vec<Action>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub form_fields: Vec<FormField>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub messages: Vec<PageMessage>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub navigation_options: Vec<NavigationOption>,
    #[serde(rename = "pageReadiness", default)]
    pub readiness: Readiness,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub captcha_present: bool,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub login_required: bool,
}

impl Observation {
    /// Fallback used when the page could not be observed.
    pub fn unavailable() -> Self {
        Self {
            readiness: Readiness::Error,
            ..Self::default()
        }
    }

    pub fn is_blocked(&self) -> bool {
        self.captcha_present || self.readiness == Readiness::Blocked
    }
}

/// Raw page data read from the browser before observation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageSnapshot {
    pub url: String,
    pub content: String,
    #[serde(default)]
    pub visible_elements: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
