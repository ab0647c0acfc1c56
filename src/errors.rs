//! Errors raised by the task service and its setup path.

use action_primitives::BrowserError;
use agent_core::AgentError;
use thiserror::Error;

/// Failures that prevent a task from producing a loop or plan result.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A second run was requested while one is in flight
    #[error("Task already executing")]
    AlreadyExecuting,

    /// Session initialization failed
    #[error("Setup failed: {0}")]
    Setup(String),

    /// Configuration is incomplete or invalid
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ServiceError {
    pub fn setup(message: impl Into<String>) -> Self {
        ServiceError::Setup(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        ServiceError::Config(message.into())
    }

    /// Whether the caller may simply try again later.
    pub fn is_busy(&self) -> bool {
        matches!(self, ServiceError::AlreadyExecuting)
    }
}

impl From<BrowserError> for ServiceError {
    fn from(err: BrowserError) -> Self {
        ServiceError::Setup(err.to_string())
    }
}

impl From<AgentError> for ServiceError {
    fn from(err: AgentError) -> Self {
        ServiceError::Config(err.to_string())
    }
}
