//! Application configuration.
//!
//! One YAML document with a section per component. Every section is
//! `#[serde(default)]`, so a file only needs the keys it changes. Selected
//! values can be overridden from the environment after loading.

use std::env;
use std::path::PathBuf;

use action_flow::ExecutorConfig;
use agent_core::{LoopConfig, PlanRunnerConfig};
use serde::{Deserialize, Serialize};
use stealth::ProxyEndpoint;
use tracing::warn;

pub const ENV_API_KEY: &str = "WEBPILOT_ORACLE_API_KEY";
pub const ENV_MODEL: &str = "WEBPILOT_ORACLE_MODEL";
pub const ENV_API_BASE: &str = "WEBPILOT_ORACLE_API_BASE";
pub const ENV_CHROME: &str = "WEBPILOT_CHROME";
pub const ENV_BROWSER_WS: &str = "WEBPILOT_BROWSER_WS";
pub const ENV_HEADLESS: &str = "WEBPILOT_HEADLESS";
pub const ENV_MAX_ITERATIONS: &str = "WEBPILOT_MAX_ITERATIONS";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Adaptive loop bounds and pacing.
    pub agent: LoopConfig,
    pub executor: ExecutorConfig,
    /// Linear plan mode bounds.
    pub plan: PlanRunnerConfig,
    pub oracle: OracleSettings,
    pub browser: BrowserSettings,
    pub support: SupportSettings,
    pub logging: LoggingSettings,
}

/// OpenAI-compatible chat completion endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleSettings {
    /// Default: gpt-4o-mini
    pub model: String,

    /// Default: https://api.openai.com/v1
    pub api_base: String,

    /// Keys tried in order; a rate-limited key hands over to the next one.
    pub api_keys: Vec<String>,

    /// Default: 0.2
    pub temperature: f32,

    /// Per-request HTTP timeout.
    /// Default: 60000
    pub timeout_ms: u64,

    /// Ask the endpoint for a JSON object response.
    /// Default: true
    pub json_mode: bool,
}

impl Default for OracleSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            api_base: "https://api.openai.com/v1".to_string(),
            api_keys: Vec::new(),
            temperature: 0.2,
            timeout_ms: 60_000,
            json_mode: true,
        }
    }
}

impl OracleSettings {
    /// Copy with every key masked, for display.
    pub fn redacted(&self) -> Self {
        let api_keys = self.api_keys.iter().map(|key| mask_key(key)).collect();
        Self {
            api_keys,
            ..self.clone()
        }
    }
}

fn mask_key(key: &str) -> String {
    let visible: String = key.chars().take(4).collect();
    format!("{visible}****")
}

/// Chrome/Chromium session settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    /// Browser binary; searched on PATH and OS install paths when unset.
    pub executable: Option<PathBuf>,

    /// Default: true
    pub headless: bool,

    /// Attach to a running browser's DevTools websocket instead of launching.
    pub websocket_url: Option<String>,

    /// Default: 20000
    pub launch_timeout_ms: u64,

    /// Upper bound for one DevTools request.
    /// Default: 30000
    pub request_timeout_ms: u64,

    /// Pass `--no-sandbox` (containers running as root need it).
    /// Default: false
    pub no_sandbox: bool,

    /// Default: (1280, 720)
    pub window_size: (u32, u32),

    /// Extra command-line switches.
    pub args: Vec<String>,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            executable: None,
            headless: true,
            websocket_url: None,
            launch_timeout_ms: 20_000,
            request_timeout_ms: 30_000,
            no_sandbox: false,
            window_size: (1280, 720),
            args: Vec::new(),
        }
    }
}

/// Action-support services attached to the executor.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SupportSettings {
    /// Proxy pool consulted when a page blocks or rate-limits.
    pub proxies: Vec<ProxyEndpoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,

    /// Also write a daily-rotated log file into this directory.
    pub directory: Option<PathBuf>,

    /// Default: webpilot.log
    pub file_prefix: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            json: false,
            directory: None,
            file_prefix: "webpilot.log".to_string(),
        }
    }
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    /// Apply overrides from `lookup`; blank values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(raw) = get(ENV_API_KEY) {
            self.oracle.api_keys = raw
                .split(',')
                .map(str::trim)
                .filter(|key| !key.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(model) = get(ENV_MODEL) {
            self.oracle.model = model;
        }
        if let Some(base) = get(ENV_API_BASE) {
            self.oracle.api_base = base;
        }
        if let Some(path) = get(ENV_CHROME) {
            self.browser.executable = Some(PathBuf::from(path));
        }
        if let Some(url) = get(ENV_BROWSER_WS) {
            self.browser.websocket_url = Some(url);
        }
        if let Some(raw) = get(ENV_HEADLESS) {
            match parse_flag(&raw) {
                Some(flag) => self.browser.headless = flag,
                None => warn!(key = ENV_HEADLESS, value = %raw, "ignoring unparsable flag"),
            }
        }
        if let Some(raw) = get(ENV_MAX_ITERATIONS) {
            match raw.parse::<u32>() {
                Ok(value) if value > 0 => self.agent.max_iterations = value,
                _ => warn!(key = ENV_MAX_ITERATIONS, value = %raw, "ignoring invalid iteration cap"),
            }
        }
    }

    /// Copy safe to print.
    pub fn redacted(&self) -> Self {
        Self {
            oracle: self.oracle.redacted(),
            ..self.clone()
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
