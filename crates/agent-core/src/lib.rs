//! Agent core: oracle-backed decision making for WebPilot.
//!
//! Provides the planner seam, the four adaptive roles (state observer,
//! progress evaluator, decision engine, strategy adapter), the adaptive
//! execution loop and the linear plan runner.

pub mod agent_loop;
pub mod errors;
pub mod extract;
pub mod oracle;
pub mod plan_runner;
pub mod planner;
pub mod prompt;
pub mod roles;

pub use agent_loop::{AdaptiveLoop, LoopConfig};
pub use errors::AgentError;
pub use extract::{extract_json, parse_response};
pub use oracle::{Oracle, ScriptedOracle};
pub use plan_runner::{PlanRunner, PlanRunnerConfig};
pub use planner::{OraclePlanner, Planner, PlannerCall, ScriptedPlanner};
pub use roles::{DecisionEngine, ProgressEvaluator, Roles, StateObserver, StrategyAdapter};
