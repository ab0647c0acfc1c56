//! Adaptive execution mode.
//!
//! ```text
//! while iterations < max:
//!     state    = observe()
//!     progress = evaluate(initial, state, history)
//!     if progress.completed: done
//!     if progress.stuck && failures >= limit: adapt(); execute(next_action)
//!     else: execute(decide(state, history, ledger context))
//!     ledger.record(action, result)
//! ```

pub mod config;
pub mod controller;

pub use config::LoopConfig;
pub use controller::AdaptiveLoop;
