//! Browser driver contract.
//!
//! This crate defines the operations the action executor needs from a
//! browser session:
//! - navigation, clicking, typing and per-field form filling
//! - scrolling and element waits
//! - page reads (content, URL, visible elements) used for observation
//!
//! Implementations live outside the core: the CLI ships a DevTools-protocol
//! client, and [`testing::MockBrowser`] provides a scriptable in-memory
//! session for tests.

pub mod driver;
pub mod errors;
pub mod testing;
pub mod types;

pub use driver::*;
pub use errors::*;
pub use types::*;
