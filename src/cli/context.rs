use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::AppConfig;
use crate::llm::planner_from_settings;
use crate::service::{ChromiumLauncher, TaskService};

pub struct CliContext {
    config: Arc<AppConfig>,
    config_path: PathBuf,
}

impl CliContext {
    pub fn new(config: AppConfig, config_path: PathBuf) -> Self {
        Self {
            config: Arc::new(config),
            config_path,
        }
    }

    pub fn config(&self) -> &AppConfig {
        self.config.as_ref()
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Build a task service over `config`, which may carry per-command
    /// overrides on top of the loaded configuration.
    pub fn task_service(&self, config: AppConfig) -> Result<TaskService> {
        let planner = planner_from_settings(&config.oracle).context(
            "Oracle is not configured; set oracle.api_keys or WEBPILOT_ORACLE_API_KEY",
        )?;
        let launcher = ChromiumLauncher::new(config.browser.clone());
        Ok(TaskService::new(
            config,
            Arc::new(launcher),
            Arc::new(planner),
        ))
    }
}
