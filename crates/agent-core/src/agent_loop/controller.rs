//! Adaptive loop controller.
//!
//! Each iteration observes the page, asks the evaluator whether the
//! objective is met, then either adapts the strategy (stuck after repeated
//! failures) or asks the decision engine for the next action. Every executed
//! action is recorded in the learning ledger.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use action_flow::ActionExecutor;
use action_primitives::BrowserDriver;
use learning_ledger::SharedLedger;
use webpilot_core_types::{Action, Feedback, LoopResult, Observation, TaskId};

use super::config::LoopConfig;
use crate::planner::Planner;
use crate::roles::Roles;

/// Mutable bookkeeping for one run.
#[derive(Debug, Default)]
struct LoopState {
    iterations: u32,
    adaptations: u32,
    consecutive_failures: u32,
    initial_state: Option<Observation>,
    last_state: Option<Observation>,
    last_successful_state: Option<Observation>,
}

impl LoopState {
    fn finish(self, result: LoopResult) -> LoopResult {
        result.with_states(self.last_state, self.last_successful_state)
    }
}

/// Drives one objective to completion, exhaustion or failure.
pub struct AdaptiveLoop {
    config: LoopConfig,
    browser: Arc<dyn BrowserDriver>,
    executor: Arc<dyn ActionExecutor>,
    roles: Roles,
    ledger: SharedLedger,
    task_id: TaskId,
}

impl AdaptiveLoop {
    pub fn new(
        config: LoopConfig,
        browser: Arc<dyn BrowserDriver>,
        executor: Arc<dyn ActionExecutor>,
        planner: Arc<dyn Planner>,
        ledger: SharedLedger,
    ) -> Self {
        let roles = Roles::new(planner, config.oracle_timeout_duration());
        Self {
            config,
            browser,
            executor,
            roles,
            ledger,
            task_id: TaskId::new(),
        }
    }

    pub fn with_task_id(mut self, task_id: TaskId) -> Self {
        self.task_id = task_id;
        self
    }

    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    pub fn ledger(&self) -> &SharedLedger {
        &self.ledger
    }

    pub fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    /// Run the loop for `objective`. Always returns a result; collaborator
    /// failures surface as `success = false` with a readable message.
    pub async fn run(&self, objective: &str) -> LoopResult {
        let mut state = LoopState::default();
        let max_failures = self.config.max_consecutive_failures;
        info!(task_id = %self.task_id, objective, max_iterations = self.config.max_iterations, "adaptive loop started");

        while state.iterations < self.config.max_iterations {
            state.iterations += 1;
            let iteration = state.iterations;
            debug!(task_id = %self.task_id, iteration, "observing page");

            let snapshot = match self.browser.snapshot().await {
                Ok(snapshot) => snapshot,
                Err(err) => {
                    state.consecutive_failures += 1;
                    warn!(
                        task_id = %self.task_id,
                        iteration,
                        consecutive_failures = state.consecutive_failures,
                        error = %err,
                        "iteration failed"
                    );
                    if state.consecutive_failures >= max_failures {
                        let message = format!(
                            "Execution aborted after {} consecutive errors: {err}",
                            state.consecutive_failures
                        );
                        let (iterations, adaptations) = (state.iterations, state.adaptations);
                        return state.finish(LoopResult::failed(iterations, adaptations, message));
                    }
                    pause(self.config.error_delay_ms).await;
                    continue;
                }
            };

            let current = self.roles.observer.observe(&snapshot).await;
            let initial = state
                .initial_state
                .get_or_insert_with(|| current.clone())
                .clone();
            state.last_state = Some(current.clone());

            let history = self.ledger.history();
            let progress = self
                .roles
                .evaluator
                .evaluate(objective, &initial, &current, &history)
                .await;
            debug!(
                task_id = %self.task_id,
                iteration,
                score = progress.progress_score,
                stuck = progress.stuck_indicator,
                "progress evaluated"
            );

            if progress.reaches(self.config.completion_threshold) {
                info!(task_id = %self.task_id, iteration, score = progress.progress_score, "objective completed");
                let (iterations, adaptations) = (state.iterations, state.adaptations);
                return state.finish(LoopResult::completed(iterations, adaptations, current));
            }

            if progress.stuck_indicator && state.consecutive_failures >= max_failures {
                let failures: Vec<Feedback> = self
                    .ledger
                    .recent(max_failures as usize)
                    .into_iter()
                    .filter(|entry| !entry.success)
                    .collect();
                let adaptation = self
                    .roles
                    .adapter
                    .adapt(objective, &current, &failures)
                    .await;
                state.adaptations += 1;
                state.consecutive_failures = 0;
                info!(
                    task_id = %self.task_id,
                    iteration,
                    adaptations = state.adaptations,
                    strategy = %adaptation.new_strategy,
                    "strategy adapted"
                );
                if let Some(action) = adaptation.next_action.as_ref() {
                    self.execute_and_record(action, &current, &mut state).await;
                }
                continue;
            }

            let decision = self
                .roles
                .decider
                .decide(
                    objective,
                    &current,
                    &history,
                    &self.ledger.success_context(objective),
                    &self.ledger.failure_context(objective),
                )
                .await;
            self.execute_and_record(&decision.action, &current, &mut state)
                .await;

            if !decision.should_continue {
                info!(task_id = %self.task_id, iteration, "decision engine requested stop");
                let (iterations, adaptations) = (state.iterations, state.adaptations);
                return state.finish(LoopResult::stopped(
                    iterations,
                    adaptations,
                    "Execution stopped by decision engine before the objective was met",
                ));
            }

            pause(self.config.iteration_delay_ms).await;
        }

        info!(
            task_id = %self.task_id,
            iterations = state.iterations,
            adaptations = state.adaptations,
            "iteration budget exhausted"
        );
        let (iterations, adaptations) = (state.iterations, state.adaptations);
        state.finish(LoopResult::exhausted(iterations, adaptations))
    }

    async fn execute_and_record(&self, action: &Action, current: &Observation, state: &mut LoopState) {
        info!(task_id = %self.task_id, iteration = state.iterations, action = %action.label(), "executing action");
        let result = self.executor.execute(action).await;
        let feedback = self.ledger.record(action, &result);

        if result.success {
            state.last_successful_state = Some(current.clone());
            state.consecutive_failures = 0;
            debug!(task_id = %self.task_id, sequence = feedback.sequence, outcome = %result.outcome, "action succeeded");
        } else {
            state.consecutive_failures += 1;
            warn!(
                task_id = %self.task_id,
                sequence = feedback.sequence,
                consecutive_failures = state.consecutive_failures,
                error = result.error_text(),
                "action failed"
            );
        }
    }
}

async fn pause(millis: u64) {
    if millis > 0 {
        sleep(Duration::from_millis(millis)).await;
    }
}
