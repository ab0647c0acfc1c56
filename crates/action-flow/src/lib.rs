//! Action execution layer
//!
//! Turns oracle-chosen [`Action`](webpilot_core_types::Action)s into browser
//! effects and normalizes every outcome into an
//! [`ActionResult`](webpilot_core_types::ActionResult). Collaborator errors
//! never escape this layer.

pub mod config;
pub mod executor;

pub use config::ExecutorConfig;
pub use executor::{ActionExecutor, DefaultActionExecutor};
