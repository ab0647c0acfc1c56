use thiserror::Error;

/// Errors emitted by the agent-core crate.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AgentError {
    /// The oracle could not be reached or returned an error.
    #[error("oracle unavailable: {0}")]
    Oracle(String),

    /// The oracle answered, but no usable JSON object could be recovered.
    #[error("malformed oracle response: {0}")]
    MalformedResponse(String),

    /// Raised when a request is missing required fields.
    #[error("invalid agent request: {0}")]
    InvalidRequest(String),

    /// An oracle call exceeded its time budget.
    #[error("oracle call timed out after {0}ms")]
    Timeout(u64),
}

impl AgentError {
    /// Helper for wrapping collaborator failures.
    pub fn oracle(message: impl Into<String>) -> Self {
        Self::Oracle(message.into())
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse(message.into())
    }

    /// Helper for wrapping static string errors.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// True when the oracle replied but the reply could not be parsed.
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::MalformedResponse(_))
    }

    /// Label used in logs to tell parse failures from collaborator failures.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::MalformedResponse(_) => "malformed_response",
            Self::InvalidRequest(_) => "invalid_request",
            Self::Oracle(_) | Self::Timeout(_) => "oracle_unavailable",
        }
    }
}
