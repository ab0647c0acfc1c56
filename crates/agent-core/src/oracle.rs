use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

use crate::errors::AgentError;

/// Raw text completion service backing the planner roles.
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Answer `prompt` with free-form text, expected to contain a JSON object.
    async fn complete(&self, prompt: &str) -> Result<String, AgentError>;
}

#[async_trait]
impl<T: Oracle + ?Sized> Oracle for Arc<T> {
    async fn complete(&self, prompt: &str) -> Result<String, AgentError> {
        (**self).complete(prompt).await
    }
}

/// Deterministic oracle used for tests and offline development.
///
/// Replies are served in order; once the script runs out every call fails
/// with [`AgentError::Oracle`]. Prompts are recorded for inspection.
#[derive(Debug, Default, Clone)]
pub struct ScriptedOracle {
    replies: Arc<Mutex<VecDeque<Result<String, AgentError>>>>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, text: impl Into<String>) -> Self {
        self.replies.lock().push_back(Ok(text.into()));
        self
    }

    pub fn fail(self, error: AgentError) -> Self {
        self.replies.lock().push_back(Err(error));
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl Oracle for ScriptedOracle {
    async fn complete(&self, prompt: &str) -> Result<String, AgentError> {
        self.prompts.lock().push(prompt.to_string());
        self.replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(AgentError::oracle("script exhausted")))
    }
}
