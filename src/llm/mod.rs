//! Oracle clients.

pub mod openai;

pub use openai::{OpenAiConfig, OpenAiOracle};

use crate::config::OracleSettings;
use agent_core::{AgentError, OraclePlanner};

/// Planner that sends every role prompt to the configured endpoint.
pub fn planner_from_settings(
    settings: &OracleSettings,
) -> Result<OraclePlanner<OpenAiOracle>, AgentError> {
    let oracle = OpenAiOracle::new(OpenAiConfig::from(settings))?;
    Ok(OraclePlanner::new(oracle))
}
