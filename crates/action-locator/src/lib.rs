//! Fallback locators for failed element interactions.
//!
//! When a click or type misses its target, the executor asks this crate for
//! alternative selectors derived from the original one:
//! - XPath text matches when the selector embeds `text()="..."`
//! - text-content XPath for plain-word targets
//! - `aria-label` and `title` attribute matches for CSS-style selectors
//!
//! Derivation is pure string work; trying candidates is the caller's job.

pub mod strategies;
pub mod types;

pub use strategies::*;
pub use types::*;
