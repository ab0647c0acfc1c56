//! Planner seam shared by the adaptive loop and the linear plan runner.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use tracing::debug;

use webpilot_core_types::{
    Adaptation, Decision, Feedback, Observation, PageSnapshot, Plan, Progress,
};

use crate::errors::AgentError;
use crate::extract::parse_response;
use crate::oracle::Oracle;
use crate::prompt;

/// Decision-making collaborator behind the oracle-backed roles.
#[async_trait]
pub trait Planner: Send + Sync {
    /// Describe the page captured in `snapshot`.
    async fn observe(&self, snapshot: &PageSnapshot) -> Result<Observation, AgentError>;

    /// Judge progress from the initial to the current state.
    async fn evaluate(
        &self,
        objective: &str,
        initial: &Observation,
        current: &Observation,
        history: &[Feedback],
    ) -> Result<Progress, AgentError>;

    /// Choose the next action.
    async fn decide(
        &self,
        objective: &str,
        state: &Observation,
        recent: &[Feedback],
        success_context: &str,
        failure_context: &str,
    ) -> Result<Decision, AgentError>;

    /// Propose a new strategy after repeated failures.
    async fn adapt(
        &self,
        objective: &str,
        state: &Observation,
        failures: &[Feedback],
    ) -> Result<Adaptation, AgentError>;

    /// Draft a linear plan for `objective`.
    async fn plan(&self, objective: &str) -> Result<Plan, AgentError>;

    /// Revise `plan` after the step at `cursor` failed.
    async fn revise_plan(
        &self,
        plan: &Plan,
        snapshot: &PageSnapshot,
        cursor: usize,
        error: Option<&str>,
    ) -> Result<Plan, AgentError>;
}

/// [`Planner`] that prompts a raw-text [`Oracle`] and parses its JSON reply.
#[derive(Debug, Clone)]
pub struct OraclePlanner<O> {
    oracle: O,
}

impl<O: Oracle> OraclePlanner<O> {
    pub fn new(oracle: O) -> Self {
        Self { oracle }
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    async fn ask<T: serde::de::DeserializeOwned>(
        &self,
        role: &'static str,
        prompt: String,
    ) -> Result<T, AgentError> {
        debug!(role, prompt_chars = prompt.len(), "consulting oracle");
        let reply = self.oracle.complete(&prompt).await?;
        debug!(role, reply_chars = reply.len(), "oracle replied");
        parse_response(&reply)
    }
}

#[async_trait]
impl<O: Oracle> Planner for OraclePlanner<O> {
    async fn observe(&self, snapshot: &PageSnapshot) -> Result<Observation, AgentError> {
        self.ask("observe", prompt::observation_prompt(snapshot))
            .await
    }

    async fn evaluate(
        &self,
        objective: &str,
        initial: &Observation,
        current: &Observation,
        history: &[Feedback],
    ) -> Result<Progress, AgentError> {
        self.ask(
            "evaluate",
            prompt::progress_prompt(objective, initial, current, history),
        )
        .await
    }

    async fn decide(
        &self,
        objective: &str,
        state: &Observation,
        recent: &[Feedback],
        success_context: &str,
        failure_context: &str,
    ) -> Result<Decision, AgentError> {
        self.ask(
            "decide",
            prompt::decision_prompt(objective, state, recent, success_context, failure_context),
        )
        .await
    }

    async fn adapt(
        &self,
        objective: &str,
        state: &Observation,
        failures: &[Feedback],
    ) -> Result<Adaptation, AgentError> {
        self.ask("adapt", prompt::adaptation_prompt(objective, state, failures))
            .await
    }

    async fn plan(&self, objective: &str) -> Result<Plan, AgentError> {
        if objective.trim().is_empty() {
            return Err(AgentError::invalid_request("objective cannot be empty"));
        }
        self.ask("plan", prompt::plan_prompt(objective)).await
    }

    async fn revise_plan(
        &self,
        plan: &Plan,
        snapshot: &PageSnapshot,
        cursor: usize,
        error: Option<&str>,
    ) -> Result<Plan, AgentError> {
        self.ask(
            "revise_plan",
            prompt::revision_prompt(plan, snapshot, cursor, error),
        )
        .await
    }
}

/// One recorded call on a [`ScriptedPlanner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannerCall {
    pub role: &'static str,
    /// Number of feedback entries handed to the role, if any.
    pub history_len: usize,
}

#[derive(Debug)]
struct Script<T> {
    replies: VecDeque<Result<T, AgentError>>,
}

impl<T> Default for Script<T> {
    fn default() -> Self {
        Self {
            replies: VecDeque::new(),
        }
    }
}

impl<T: Clone> Script<T> {
    /// Next reply; the last one repeats once the script is down to it.
    fn next(&mut self, role: &str) -> Result<T, AgentError> {
        let reply = if self.replies.len() > 1 {
            self.replies.pop_front()
        } else {
            self.replies.front().cloned()
        };
        reply.unwrap_or_else(|| Err(AgentError::oracle(format!("no scripted {role} reply"))))
    }
}

#[derive(Debug, Default)]
struct Scripts {
    observations: Script<Observation>,
    progress: Script<Progress>,
    decisions: Script<Decision>,
    adaptations: Script<Adaptation>,
    plans: Script<Plan>,
    revisions: Script<Plan>,
    calls: Vec<PlannerCall>,
}

/// Deterministic planner for tests and offline runs.
///
/// Each role replays its own script in order and repeats the final entry
/// forever; a role with no script fails with [`AgentError::Oracle`].
#[derive(Debug, Default)]
pub struct ScriptedPlanner {
    scripts: Mutex<Scripts>,
}

impl ScriptedPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_observation(self, observation: Observation) -> Self {
        self.scripts.lock().observations.replies.push_back(Ok(observation));
        self
    }

    pub fn with_progress(self, progress: Progress) -> Self {
        self.scripts.lock().progress.replies.push_back(Ok(progress));
        self
    }

    pub fn with_decision(self, decision: Decision) -> Self {
        self.scripts.lock().decisions.replies.push_back(Ok(decision));
        self
    }

    pub fn with_adaptation(self, adaptation: Adaptation) -> Self {
        self.scripts.lock().adaptations.replies.push_back(Ok(adaptation));
        self
    }

    pub fn with_plan(self, plan: Plan) -> Self {
        self.scripts.lock().plans.replies.push_back(Ok(plan));
        self
    }

    pub fn with_revision(self, plan: Plan) -> Self {
        self.scripts.lock().revisions.replies.push_back(Ok(plan));
        self
    }

    pub fn with_progress_error(self, error: AgentError) -> Self {
        self.scripts.lock().progress.replies.push_back(Err(error));
        self
    }

    pub fn with_decision_error(self, error: AgentError) -> Self {
        self.scripts.lock().decisions.replies.push_back(Err(error));
        self
    }

    pub fn with_revision_error(self, error: AgentError) -> Self {
        self.scripts.lock().revisions.replies.push_back(Err(error));
        self
    }

    pub fn calls(&self) -> Vec<PlannerCall> {
        self.scripts.lock().calls.clone()
    }

    /// Number of calls made to `role`.
    pub fn call_count(&self, role: &str) -> usize {
        self.scripts
            .lock()
            .calls
            .iter()
            .filter(|call| call.role == role)
            .count()
    }

    fn record(scripts: &mut Scripts, role: &'static str, history_len: usize) {
        scripts.calls.push(PlannerCall { role, history_len });
    }
}

#[async_trait]
impl Planner for ScriptedPlanner {
    async fn observe(&self, _snapshot: &PageSnapshot) -> Result<Observation, AgentError> {
        let mut scripts = self.scripts.lock();
        Self::record(&mut scripts, "observe", 0);
        scripts.observations.next("observe")
    }

    async fn evaluate(
        &self,
        _objective: &str,
        _initial: &Observation,
        _current: &Observation,
        history: &[Feedback],
    ) -> Result<Progress, AgentError> {
        let mut scripts = self.scripts.lock();
        Self::record(&mut scripts, "evaluate", history.len());
        scripts.progress.next("evaluate")
    }

    async fn decide(
        &self,
        _objective: &str,
        _state: &Observation,
        recent: &[Feedback],
        _success_context: &str,
        _failure_context: &str,
    ) -> Result<Decision, AgentError> {
        let mut scripts = self.scripts.lock();
        Self::record(&mut scripts, "decide", recent.len());
        scripts.decisions.next("decide")
    }

    async fn adapt(
        &self,
        _objective: &str,
        _state: &Observation,
        failures: &[Feedback],
    ) -> Result<Adaptation, AgentError> {
        let mut scripts = self.scripts.lock();
        Self::record(&mut scripts, "adapt", failures.len());
        scripts.adaptations.next("adapt")
    }

    async fn plan(&self, objective: &str) -> Result<Plan, AgentError> {
        if objective.trim().is_empty() {
            return Err(AgentError::invalid_request("objective cannot be empty"));
        }
        let mut scripts = self.scripts.lock();
        Self::record(&mut scripts, "plan", 0);
        scripts.plans.next("plan")
    }

    async fn revise_plan(
        &self,
        _plan: &Plan,
        _snapshot: &PageSnapshot,
        _cursor: usize,
        _error: Option<&str>,
    ) -> Result<Plan, AgentError> {
        let mut scripts = self.scripts.lock();
        Self::record(&mut scripts, "revise_plan", 0);
        scripts.revisions.next("revise_plan")
    }
}
