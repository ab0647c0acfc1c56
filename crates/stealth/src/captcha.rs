//! Captcha detection and the solver seam.

use crate::StealthError;
use action_primitives::BrowserDriver;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

static SITEKEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"data-sitekey\s*=\s*["']([^"']+)["']"#).expect("sitekey regex"));

static CAPTCHA_IMG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<img[^>]*\b(?:src|alt|id)\s*=\s*["'][^"']*captcha[^"']*["'][^>]*>"#)
        .expect("captcha image regex")
});

static IMG_SRC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\bsrc\s*=\s*["']([^"']+)["']"#).expect("image src regex"));

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptchaKind {
    Recaptcha,
    Hcaptcha,
    Image,
}

/// Captcha challenge found on a page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptchaChallenge {
    pub kind: CaptchaKind,
    pub page_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_src: Option<String>,
}

impl CaptchaChallenge {
    /// Form control that receives the solution token.
    pub fn response_selector(&self) -> &'static str {
        match self.kind {
            CaptchaKind::Recaptcha => "#g-recaptcha-response",
            CaptchaKind::Hcaptcha => "[name=\"h-captcha-response\"]",
            CaptchaKind::Image => "input[name*=\"captcha\"]",
        }
    }
}

/// Find captcha widgets in page HTML.
pub fn detect_captcha(html: &str, page_url: &str) -> Vec<CaptchaChallenge> {
    let mut challenges = Vec::new();
    let site_key = SITEKEY_RE
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string());

    if let Some(site_key) = site_key {
        let kind = if html.contains("h-captcha") {
            CaptchaKind::Hcaptcha
        } else {
            CaptchaKind::Recaptcha
        };
        challenges.push(CaptchaChallenge {
            kind,
            page_url: page_url.to_string(),
            site_key: Some(site_key),
            image_src: None,
        });
    }

    if let Some(tag) = CAPTCHA_IMG_RE.find(html) {
        let image_src = IMG_SRC_RE
            .captures(tag.as_str())
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string());
        if image_src.is_some() {
            challenges.push(CaptchaChallenge {
                kind: CaptchaKind::Image,
                page_url: page_url.to_string(),
                site_key: None,
                image_src,
            });
        }
    }

    challenges
}

/// External captcha-solving service.
#[async_trait]
pub trait CaptchaSolver: Send + Sync {
    /// Solve one challenge and return the response token.
    async fn solve(&self, challenge: &CaptchaChallenge) -> Result<String, StealthError>;

    /// Detect challenges on the current page and solve the first one that
    /// the service can handle. `Ok(true)` when no captcha is present or one
    /// was solved and its token applied.
    async fn solve_on_page(&self, browser: &dyn BrowserDriver) -> Result<bool, StealthError> {
        let content = browser.content().await?;
        let url = browser.current_url().await?;
        let challenges = detect_captcha(&content, &url);
        if challenges.is_empty() {
            info!(url = %url, "no captcha detected on page");
            return Ok(true);
        }

        for challenge in &challenges {
            match self.solve(challenge).await {
                Ok(token) => {
                    browser
                        .type_text(challenge.response_selector(), &token)
                        .await?;
                    info!(kind = ?challenge.kind, "captcha solved");
                    return Ok(true);
                }
                Err(err) => {
                    warn!(kind = ?challenge.kind, error = %err, "captcha solve failed");
                }
            }
        }
        Ok(false)
    }
}
