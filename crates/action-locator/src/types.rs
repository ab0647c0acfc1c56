//! Candidate types for fallback resolution

use serde::{Deserialize, Serialize};

/// How a fallback candidate was derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackStrategy {
    /// Supplied with the step by the planner
    Declared,
    /// XPath matching the element's text content
    TextContains,
    /// CSS attribute match on `aria-label`
    AriaLabel,
    /// CSS attribute match on `title`
    Title,
}

impl FallbackStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            FallbackStrategy::Declared => "declared",
            FallbackStrategy::TextContains => "text_contains",
            FallbackStrategy::AriaLabel => "aria_label",
            FallbackStrategy::Title => "title",
        }
    }
}

/// A selector to try after the original target failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub selector: String,
    pub strategy: FallbackStrategy,
    /// Relative likelihood (0.0-1.0) that this candidate hits the intended element
    pub confidence: f64,
}

impl Candidate {
    pub fn new(selector: impl Into<String>, strategy: FallbackStrategy, confidence: f64) -> Self {
        Self {
            selector: selector.into(),
            strategy,
            confidence,
        }
    }
}
