//! Command-line front end for the `webpilot` binary.

pub mod app;
pub mod commands;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod env;
pub mod output;
pub mod plan;
pub mod run;
pub mod runtime;

pub use app::run;
