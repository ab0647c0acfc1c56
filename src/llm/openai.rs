use agent_core::{AgentError, Oracle};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::OracleSettings;

const SYSTEM_PROMPT: &str = "You are the planning component of a browser automation agent. \
Answer every request with exactly one JSON object in the shape the request describes. \
Do not add commentary outside the JSON.";

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_keys: Vec<String>,
    pub model: String,
    pub api_base: String,
    pub temperature: f32,
    pub timeout: Duration,
    pub json_mode: bool,
}

impl From<&OracleSettings> for OpenAiConfig {
    fn from(settings: &OracleSettings) -> Self {
        Self {
            api_keys: settings.api_keys.clone(),
            model: settings.model.clone(),
            api_base: settings.api_base.clone(),
            temperature: settings.temperature,
            timeout: Duration::from_millis(settings.timeout_ms),
            json_mode: settings.json_mode,
        }
    }
}

/// [`Oracle`] backed by an OpenAI-compatible `/chat/completions` endpoint.
pub struct OpenAiOracle {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiOracle {
    pub fn new(config: OpenAiConfig) -> Result<Self, AgentError> {
        if config.api_keys.is_empty() {
            return Err(AgentError::invalid_request(
                "missing OpenAI API key for oracle",
            ));
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| {
                AgentError::invalid_request(format!("failed to build HTTP client: {err}"))
            })?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &OpenAiConfig {
        &self.config
    }

    fn request_body(&self, prompt: &str) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.config.model.clone(),
            temperature: self.config.temperature,
            response_format: self.config.json_mode.then(|| ResponseFormat {
                r#type: "json_object".to_string(),
            }),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
        }
    }
}

#[async_trait]
impl Oracle for OpenAiOracle {
    async fn complete(&self, prompt: &str) -> Result<String, AgentError> {
        let url = format!(
            "{}/chat/completions",
            self.config.api_base.trim_end_matches('/')
        );
        let body = self.request_body(prompt);

        let mut last_error: Option<AgentError> = None;
        for (index, key) in self.config.api_keys.iter().enumerate() {
            let response = self
                .client
                .post(&url)
                .bearer_auth(key)
                .json(&body)
                .send()
                .await;

            let response = match response {
                Ok(resp) => resp,
                Err(err) => {
                    last_error = Some(AgentError::oracle(format!("openai request failed: {err}")));
                    continue;
                }
            };

            if !response.status().is_success() {
                let status = response.status();
                let text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "<response unavailable>".to_string());
                if status.as_u16() == 429 && index + 1 < self.config.api_keys.len() {
                    let friendly = openai_rate_limit_message(&text);
                    warn!(
                        target: "openai",
                        message = %friendly,
                        attempt = index + 1,
                        remaining = self.config.api_keys.len() - index - 1,
                        "OpenAI rate limited oracle request; switching API key"
                    );
                    last_error = Some(AgentError::oracle(friendly));
                    continue;
                }
                if status.as_u16() == 429 {
                    return Err(AgentError::oracle(openai_rate_limit_message(&text)));
                }
                return Err(AgentError::oracle(format!(
                    "openai returned {}: {}",
                    status, text
                )));
            }

            let response: ChatCompletionResponse = response
                .json()
                .await
                .map_err(|err| AgentError::oracle(format!("openai response invalid: {err}")))?;

            if let Some(usage) = &response.usage {
                debug!(
                    target: "openai",
                    prompt_tokens = usage.prompt_tokens,
                    completion_tokens = usage.completion_tokens,
                    "oracle usage"
                );
            }

            return response
                .choices
                .first()
                .and_then(|choice| choice.message.content.as_text())
                .ok_or_else(|| AgentError::oracle("openai response missing content"));
        }

        Err(last_error
            .unwrap_or_else(|| AgentError::oracle("OpenAI request exhausted all API keys")))
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    r#type: String,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatCompletionChoice>,
    #[serde(default)]
    usage: Option<ChatCompletionUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChoice {
    message: ChatCompletionMessage,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionMessage {
    content: ChatCompletionContent,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ChatCompletionContent {
    Text(String),
    Parts(Vec<ChatCompletionPart>),
}

impl ChatCompletionContent {
    fn as_text(&self) -> Option<String> {
        match self {
            ChatCompletionContent::Text(value) => Some(value.clone()),
            ChatCompletionContent::Parts(parts) => {
                let text = parts
                    .iter()
                    .filter_map(|part| part.text.as_ref())
                    .cloned()
                    .collect::<Vec<_>>()
                    .join("\n");
                if text.is_empty() {
                    None
                } else {
                    Some(text)
                }
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionPart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorEnvelope {
    error: OpenAiErrorMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorMessage {
    message: Option<String>,
}

fn openai_rate_limit_message(raw: &str) -> String {
    if let Ok(envelope) = serde_json::from_str::<OpenAiErrorEnvelope>(raw) {
        if let Some(message) = envelope.error.message {
            return format!(
                "OpenAI rate limit exceeded: {}. Please retry later or configure a higher tier.",
                message.trim()
            );
        }
    }
    "OpenAI rate limit exceeded; please retry later or reduce usage.".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(keys: &[&str]) -> OpenAiConfig {
        OpenAiConfig {
            api_keys: keys.iter().map(|k| k.to_string()).collect(),
            model: "gpt-4o-mini".into(),
            api_base: "http://127.0.0.1:9/v1/".into(),
            temperature: 0.2,
            timeout: Duration::from_secs(1),
            json_mode: false,
        }
    }

    #[test]
    fn oracle_requires_a_key() {
        let err = OpenAiOracle::new(config(&[])).err().expect("no keys");
        assert!(matches!(err, AgentError::InvalidRequest(_)));
    }

    #[test]
    fn request_omits_response_format_outside_json_mode() {
        let oracle = OpenAiOracle::new(config(&["sk-test"])).expect("oracle");
        let body = serde_json::to_value(oracle.request_body("Plan it")).expect("body");
        assert!(body.get("response_format").is_none());
        assert_eq!(body["messages"][1]["content"], "Plan it");
        assert_eq!(body["messages"][0]["role"], "system");
    }

    #[test]
    fn content_parts_are_joined() {
        let parsed: ChatCompletionResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"content":[{"text":"{\"a\":"},{"type":"x"},{"text":"1}"}]}}]}"#,
        )
        .expect("parse");
        assert_eq!(
            parsed.choices[0].message.content.as_text().as_deref(),
            Some("{\"a\":\n1}")
        );
    }

    #[test]
    fn rate_limit_message_reads_error_envelope() {
        let text = openai_rate_limit_message(r#"{"error":{"message":" Too many requests "}}"#);
        assert!(text.contains("Too many requests."));
        assert!(openai_rate_limit_message("oops").contains("retry later"));
    }
}
