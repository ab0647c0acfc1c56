//! Text signatures of bot detection in errors and page content.

use action_primitives::BrowserError;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

static CAPTCHA_PATTERNS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        "captcha",
        "recaptcha",
        "hcaptcha",
        "verify you're a human",
        "verify you are a human",
        "prove you're human",
        "enter the characters",
    ]
});

static RATE_LIMIT_PATTERNS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec!["too many requests", "unusual traffic", "rate limit", "429"]
});

static BLOCK_PATTERNS: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec!["blocked", "access denied", "403 forbidden", "forbidden"]
});

/// Kind of pushback recognized in an error message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureSignature {
    Captcha,
    RateLimited,
    Blocked,
}

impl FailureSignature {
    /// Signatures a fresh proxy may get past.
    pub fn wants_proxy(&self) -> bool {
        matches!(self, FailureSignature::RateLimited | FailureSignature::Blocked)
    }
}

/// Classify an action error message. Captcha wins over block signatures
/// since a challenge page usually also reads as blocked.
pub fn classify_failure(error: &str) -> Option<FailureSignature> {
    let lowered = error.to_lowercase();
    if CAPTCHA_PATTERNS.iter().any(|p| lowered.contains(p)) {
        return Some(FailureSignature::Captcha);
    }
    if RATE_LIMIT_PATTERNS.iter().any(|p| lowered.contains(p)) {
        return Some(FailureSignature::RateLimited);
    }
    if BLOCK_PATTERNS.iter().any(|p| lowered.contains(p)) {
        return Some(FailureSignature::Blocked);
    }
    None
}

/// Classify a driver error by the page or network text it carries.
/// Errors that only echo a selector never classify.
pub fn classify_browser_error(err: &BrowserError) -> Option<FailureSignature> {
    err.page_detail().and_then(classify_failure)
}

/// Detect whether captured page content looks like an access block.
/// Returns a short human-readable reason when one is found.
pub fn detect_block_reason(title: &str, body: &str, url: Option<&str>) -> Option<String> {
    let title_lower = title.to_lowercase();
    let body_lower = body.to_lowercase();
    let url_lower = url.unwrap_or("").to_lowercase();

    if url_lower.contains("/captcha") || url_lower.contains("challenge") {
        return Some("Redirected to a verification page".to_string());
    }
    if title_lower.contains("403") && title_lower.contains("forbidden")
        || body_lower.contains("403 forbidden")
    {
        return Some("Page reports 403 Forbidden".to_string());
    }
    if title_lower.contains("access denied") || body_lower.contains("access denied") {
        return Some("Access denied notice detected".to_string());
    }
    if CAPTCHA_PATTERNS
        .iter()
        .any(|pattern| body_lower.contains(pattern) || title_lower.contains(pattern))
    {
        return Some("Page requests captcha verification".to_string());
    }
    if RATE_LIMIT_PATTERNS
        .iter()
        .filter(|pattern| **pattern != "429")
        .any(|pattern| body_lower.contains(pattern) || title_lower.contains(pattern))
    {
        return Some("Page reports too many requests".to_string());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_error_messages() {
        assert_eq!(
            classify_failure("Element not found: CAPTCHA frame covers button"),
            Some(FailureSignature::Captcha)
        );
        assert_eq!(
            classify_failure("Navigation failed: request blocked by server"),
            Some(FailureSignature::Blocked)
        );
        assert_eq!(
            classify_failure("HTTP 429 Too Many Requests"),
            Some(FailureSignature::RateLimited)
        );
        assert_eq!(classify_failure("Element not found: #submit"), None);
    }

    #[test]
    fn selector_text_never_classifies() {
        for target in ["#order-429", "button.captcha-free-signup", "a.unblocked-link"] {
            assert_eq!(
                classify_browser_error(&BrowserError::ElementNotFound(target.into())),
                None
            );
            assert_eq!(
                classify_browser_error(&BrowserError::Timeout(format!("click {target}"))),
                None
            );
        }
        assert_eq!(
            classify_browser_error(&BrowserError::Interaction("captcha challenge displayed".into())),
            Some(FailureSignature::Captcha)
        );
    }

    #[test]
    fn block_signatures_want_proxy() {
        assert!(FailureSignature::Blocked.wants_proxy());
        assert!(!FailureSignature::Captcha.wants_proxy());
    }

    #[test]
    fn detects_block_pages() {
        assert_eq!(
            detect_block_reason("403 Forbidden", "", None).as_deref(),
            Some("Page reports 403 Forbidden")
        );
        assert!(detect_block_reason("Shop", "Please verify you are a human", None).is_some());
        assert!(detect_block_reason("Shop", "Welcome back", Some("https://shop.test")).is_none());
    }
}
