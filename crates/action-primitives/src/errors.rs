//! Error types for browser operations

use thiserror::Error;

/// Failures reported by a [`crate::BrowserDriver`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BrowserError {
    /// No browser session is available
    #[error("Browser not initialized")]
    NotInitialized,

    /// Navigation failed or the page did not load
    #[error("Navigation failed: {0}")]
    Navigation(String),

    /// Target element could not be located
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// Element was found but the interaction failed
    #[error("Interaction failed: {0}")]
    Interaction(String),

    /// Operation exceeded its time budget
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Driver protocol or transport error
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Session could not be created or was lost
    #[error("Session error: {0}")]
    Session(String),
}

impl BrowserError {
    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BrowserError::Timeout(_) | BrowserError::Interaction(_) | BrowserError::Protocol(_)
        )
    }

    /// Get error severity level (0=low, 1=medium, 2=high, 3=critical)
    pub fn severity(&self) -> u8 {
        match self {
            BrowserError::NotInitialized | BrowserError::Session(_) => 3,
            BrowserError::Navigation(_) | BrowserError::Protocol(_) => 2,
            BrowserError::Timeout(_) | BrowserError::ElementNotFound(_) => 1,
            BrowserError::Interaction(_) => 0,
        }
    }

    /// Text reported by the page or the network, for kinds that carry it.
    /// Lookup and timeout errors only echo the caller's own target.
    pub fn page_detail(&self) -> Option<&str> {
        match self {
            BrowserError::Navigation(detail)
            | BrowserError::Interaction(detail)
            | BrowserError::Protocol(detail) => Some(detail),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_errors_are_critical() {
        assert_eq!(BrowserError::NotInitialized.severity(), 3);
        assert_eq!(BrowserError::Session("gone".into()).severity(), 3);
        assert!(!BrowserError::ElementNotFound("#x".into()).is_retryable());
        assert!(BrowserError::Timeout("slow".into()).is_retryable());
    }

    #[test]
    fn only_page_facing_kinds_expose_detail() {
        assert_eq!(
            BrowserError::Navigation("403 forbidden".into()).page_detail(),
            Some("403 forbidden")
        );
        assert_eq!(
            BrowserError::Interaction("captcha shown".into()).page_detail(),
            Some("captcha shown")
        );
        assert_eq!(BrowserError::ElementNotFound("#order-429".into()).page_detail(), None);
        assert_eq!(BrowserError::Timeout("a.blocked".into()).page_detail(), None);
    }
}
