//! Action-support services invoked when the page pushes back.
//!
//! The executor consults these opportunistically after a failed action:
//! a captcha signature routes to a [`CaptchaSolver`], a block or rate-limit
//! signature routes to a [`ProxyRotator`]. Each is optional and gets at most
//! one attempt per action.

pub mod captcha;
pub mod proxy;
pub mod signatures;

pub use captcha::{detect_captcha, CaptchaChallenge, CaptchaKind, CaptchaSolver};
pub use proxy::{ProxyEndpoint, ProxyPool, ProxyRotator};
pub use signatures::{
    classify_browser_error, classify_failure, detect_block_reason, FailureSignature,
};

use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StealthError {
    #[error("captcha service failure: {0}")]
    Captcha(String),
    #[error("no usable proxy: {0}")]
    ProxyUnavailable(String),
    #[error("browser failure: {0}")]
    Browser(String),
}

impl From<action_primitives::BrowserError> for StealthError {
    fn from(err: action_primitives::BrowserError) -> Self {
        StealthError::Browser(err.to_string())
    }
}
