//! WebPilot: adaptive, oracle-driven browser automation.
//!
//! The workspace crates hold the execution loop and its collaborators; this
//! crate wires them to real services (a Chromium session, an
//! OpenAI-compatible oracle), guards task execution and provides the CLI.

pub mod browser_impl;
pub mod cli;
pub mod config;
pub mod errors;
pub mod llm;
pub mod service;

pub use browser_impl::ChromiumBrowser;
pub use config::AppConfig;
pub use errors::ServiceError;
pub use llm::{OpenAiConfig, OpenAiOracle};
pub use service::{
    BrowserLauncher, ChromiumLauncher, ExecutionStatus, PlanReport, TaskReport, TaskService,
};
