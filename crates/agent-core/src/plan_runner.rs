//! Linear plan execution with wholesale replanning.
//!
//! Steps run in order from a cursor. When a step fails the planner is asked
//! for a revised plan; a plan that differs from the current one replaces it
//! and execution restarts from the first step. An identical or empty
//! revision, or a spent replan budget, ends the run as failed.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use action_flow::ActionExecutor;
use action_locator::fallback_plan;
use action_primitives::BrowserDriver;
use webpilot_core_types::{
    Action, ActionResult, ActionType, PageSnapshot, Plan, PlanResult, PlanStatus, Step, TaskId,
};

use crate::planner::Planner;

/// Limits for linear plan execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanRunnerConfig {
    /// Maximum wholesale plan replacements per run.
    /// Default: 5
    pub max_replans: u32,

    /// Maximum step executions (retries included) per run.
    /// Default: 50
    pub max_step_executions: u32,

    /// Extra attempts per failed step when `retry_alternatives` is on.
    /// Default: 2
    pub max_step_retries: u32,

    /// Retry a failed step against its declared and derived alternative
    /// targets before asking for a revised plan.
    /// Default: false
    pub retry_alternatives: bool,
}

impl Default for PlanRunnerConfig {
    fn default() -> Self {
        Self {
            max_replans: 5,
            max_step_executions: 50,
            max_step_retries: 2,
            retry_alternatives: false,
        }
    }
}

impl PlanRunnerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: enable alternative-target retries.
    pub fn with_retries(mut self, max_step_retries: u32) -> Self {
        self.retry_alternatives = true;
        self.max_step_retries = max_step_retries;
        self
    }

    pub fn max_replans(mut self, replans: u32) -> Self {
        self.max_replans = replans;
        self
    }
}

#[derive(Debug, Default)]
struct RunState {
    cursor: usize,
    replans: u32,
    step_executions: u32,
    results: Vec<ActionResult>,
}

/// Executes a [`Plan`] step by step.
pub struct PlanRunner {
    config: PlanRunnerConfig,
    browser: Arc<dyn BrowserDriver>,
    executor: Arc<dyn ActionExecutor>,
    planner: Arc<dyn Planner>,
    cancel: CancellationToken,
    task_id: TaskId,
}

impl PlanRunner {
    pub fn new(
        config: PlanRunnerConfig,
        browser: Arc<dyn BrowserDriver>,
        executor: Arc<dyn ActionExecutor>,
        planner: Arc<dyn Planner>,
    ) -> Self {
        Self {
            config,
            browser,
            executor,
            planner,
            cancel: CancellationToken::new(),
            task_id: TaskId::new(),
        }
    }

    /// Use `token` to abandon the run between steps.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn with_task_id(mut self, task_id: TaskId) -> Self {
        self.task_id = task_id;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &PlanRunnerConfig {
        &self.config
    }

    /// Ask the planner for an initial plan, falling back to a single
    /// navigation derived from the objective.
    pub async fn draft(&self, objective: &str) -> Plan {
        match self.planner.plan(objective).await {
            Ok(plan) if !plan.is_empty() => {
                info!(task_id = %self.task_id, steps = plan.len(), "plan drafted");
                plan
            }
            Ok(_) => {
                warn!(task_id = %self.task_id, "planner returned an empty plan, using fallback");
                Plan::fallback(objective)
            }
            Err(err) => {
                warn!(task_id = %self.task_id, reason = err.reason(), error = %err, "planning failed, using fallback");
                Plan::fallback(objective)
            }
        }
    }

    /// Execute `plan` until it completes, fails or is cancelled.
    pub async fn run_plan(&self, plan: Plan) -> PlanResult {
        let mut plan = plan;
        let mut run = RunState::default();
        info!(task_id = %self.task_id, steps = plan.len(), "plan execution started");

        loop {
            if run.cursor >= plan.len() {
                info!(task_id = %self.task_id, replans = run.replans, "plan completed");
                return finish(run, plan, PlanStatus::Completed, "Plan executed successfully");
            }
            if self.cancel.is_cancelled() {
                info!(task_id = %self.task_id, cursor = run.cursor, "plan execution cancelled");
                return finish(run, plan, PlanStatus::Cancelled, "Execution cancelled");
            }
            if run.step_executions >= self.config.max_step_executions {
                let message = format!(
                    "Step execution budget of {} exhausted",
                    self.config.max_step_executions
                );
                return finish(run, plan, PlanStatus::Failed, message);
            }

            let step = plan.steps[run.cursor].clone();
            debug!(
                task_id = %self.task_id,
                cursor = run.cursor,
                action = %step.action,
                description = %step.description,
                "executing step"
            );
            let result = self.execute_step(&step, &mut run).await;

            if result.success {
                if let Some(condition) = step.wait_condition() {
                    self.executor.settle(&condition).await;
                }
                run.cursor += 1;
                continue;
            }

            let error = result.error_text().to_string();
            warn!(task_id = %self.task_id, cursor = run.cursor, error = %error, "step failed");
            if run.replans >= self.config.max_replans {
                let message = format!(
                    "Step {} failed after {} replans: {error}",
                    run.cursor + 1,
                    run.replans
                );
                return finish(run, plan, PlanStatus::Failed, message);
            }

            let revised = self.revise(&plan, run.cursor, &error).await;
            if revised.is_empty() || revised == plan {
                let message = format!(
                    "Step {} failed and no different plan was available: {error}",
                    run.cursor + 1
                );
                return finish(run, plan, PlanStatus::Failed, message);
            }

            run.replans += 1;
            run.cursor = 0;
            info!(task_id = %self.task_id, replans = run.replans, steps = revised.len(), "plan revised");
            plan = revised;
        }
    }

    async fn execute_step(&self, step: &Step, run: &mut RunState) -> ActionResult {
        let action = step.to_action();
        run.step_executions += 1;
        let result = self.executor.execute(&action).await;
        run.results.push(result.clone());
        let retryable = matches!(step.action, ActionType::Click | ActionType::Type);
        if result.success || !self.config.retry_alternatives || !retryable {
            return result;
        }

        let Some(target) = action.target.as_text() else {
            return result;
        };
        let candidates = fallback_plan(
            target,
            &step.alternatives,
            self.config.max_step_retries as usize,
        );
        for candidate in candidates {
            if run.step_executions >= self.config.max_step_executions {
                break;
            }
            debug!(task_id = %self.task_id, selector = %candidate.selector, "retrying step with alternative");
            run.step_executions += 1;
            let retry: Action = action.retarget(candidate.selector.clone());
            let retried = self.executor.execute(&retry).await;
            run.results.push(retried.clone());
            if retried.success {
                return retried;
            }
        }
        result
    }

    /// Ask for a revised plan; a failed request keeps the current plan.
    async fn revise(&self, plan: &Plan, cursor: usize, error: &str) -> Plan {
        let snapshot = match self.browser.snapshot().await {
            Ok(snapshot) => snapshot,
            Err(err) => PageSnapshot {
                error: Some(err.to_string()),
                ..PageSnapshot::default()
            },
        };
        match self
            .planner
            .revise_plan(plan, &snapshot, cursor, Some(error))
            .await
        {
            Ok(revised) => revised,
            Err(err) => {
                warn!(task_id = %self.task_id, reason = err.reason(), error = %err, "plan revision failed");
                plan.clone()
            }
        }
    }
}

fn finish(run: RunState, plan: Plan, status: PlanStatus, message: impl Into<String>) -> PlanResult {
    PlanResult {
        status,
        message: message.into(),
        cursor: run.cursor,
        completed_steps: run.cursor,
        total_steps: plan.len(),
        replans: run.replans,
        step_executions: run.step_executions,
        plan,
        results: run.results,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_limits() {
        let config = PlanRunnerConfig::default();
        assert_eq!(config.max_replans, 5);
        assert_eq!(config.max_step_executions, 50);
        assert!(!config.retry_alternatives);

        let config = PlanRunnerConfig::new().with_retries(1);
        assert!(config.retry_alternatives);
        assert_eq!(config.max_step_retries, 1);
    }
}
