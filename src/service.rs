//! Task service: one run at a time against one browser session.
//!
//! The service owns the single-flight guard, builds the per-run executor
//! and ledger wiring, and tears the browser session down on every exit path.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use action_flow::{ActionExecutor, DefaultActionExecutor};
use action_primitives::BrowserDriver;
use agent_core::{AdaptiveLoop, PlanRunner, Planner};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use learning_ledger::SharedLedger;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use stealth::{ProxyPool, ProxyRotator};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use webpilot_core_types::{LearningStats, LoopResult, PlanResult, TaskId};

use crate::browser_impl::ChromiumBrowser;
use crate::config::{AppConfig, BrowserSettings};
use crate::errors::ServiceError;

/// Opens a browser session for one run.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Arc<dyn BrowserDriver>, ServiceError>;
}

/// Launches a local Chrome/Chromium (or attaches to one) per run.
pub struct ChromiumLauncher {
    settings: BrowserSettings,
}

impl ChromiumLauncher {
    pub fn new(settings: BrowserSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self) -> Result<Arc<dyn BrowserDriver>, ServiceError> {
        let browser = ChromiumBrowser::launch(&self.settings).await?;
        Ok(Arc::new(browser))
    }
}

/// Outcome of an adaptive run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskReport {
    pub task_id: TaskId,
    pub objective: String,
    #[serde(flatten)]
    pub result: LoopResult,
    pub learning_stats: LearningStats,
    pub execution_time_ms: u64,
    pub finished_at: DateTime<Utc>,
}

/// Outcome of a linear plan run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanReport {
    pub task_id: TaskId,
    pub objective: String,
    #[serde(flatten)]
    pub result: PlanResult,
    pub execution_time_ms: u64,
    pub finished_at: DateTime<Utc>,
}

/// Point-in-time view of the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionStatus {
    pub is_executing: bool,
    pub current_task: Option<TaskId>,
    pub learning_stats: LearningStats,
}

/// Releases the single-flight flag when the run ends, however it ends.
struct RunGuard<'a> {
    service: &'a TaskService,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        *self.service.current_task.lock() = None;
        self.service.executing.store(false, Ordering::Release);
    }
}

pub struct TaskService {
    config: AppConfig,
    launcher: Arc<dyn BrowserLauncher>,
    planner: Arc<dyn Planner>,
    ledger: SharedLedger,
    proxies: Option<Arc<ProxyPool>>,
    executing: AtomicBool,
    current_task: Mutex<Option<TaskId>>,
}

impl TaskService {
    pub fn new(
        config: AppConfig,
        launcher: Arc<dyn BrowserLauncher>,
        planner: Arc<dyn Planner>,
    ) -> Self {
        let proxies = if config.support.proxies.is_empty() {
            None
        } else {
            Some(Arc::new(ProxyPool::new(config.support.proxies.clone())))
        };
        Self {
            config,
            launcher,
            planner,
            ledger: SharedLedger::default(),
            proxies,
            executing: AtomicBool::new(false),
            current_task: Mutex::new(None),
        }
    }

    /// Share a ledger across services (or keep one across process runs).
    pub fn with_ledger(mut self, ledger: SharedLedger) -> Self {
        self.ledger = ledger;
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn ledger(&self) -> &SharedLedger {
        &self.ledger
    }

    pub fn status(&self) -> ExecutionStatus {
        ExecutionStatus {
            is_executing: self.executing.load(Ordering::Acquire),
            current_task: self.current_task.lock().clone(),
            learning_stats: self.ledger.stats(),
        }
    }

    fn acquire(&self, task_id: &TaskId) -> Result<RunGuard<'_>, ServiceError> {
        if self
            .executing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!(task_id = %task_id, "rejecting run while another task is executing");
            return Err(ServiceError::AlreadyExecuting);
        }
        *self.current_task.lock() = Some(task_id.clone());
        Ok(RunGuard { service: self })
    }

    fn executor(&self, browser: Arc<dyn BrowserDriver>) -> Arc<dyn ActionExecutor> {
        let mut executor = DefaultActionExecutor::new(browser, self.config.executor.clone());
        if let Some(pool) = &self.proxies {
            let rotator: Arc<dyn ProxyRotator> = pool.clone();
            executor = executor.with_proxy_rotator(rotator);
        }
        Arc::new(executor)
    }

    async fn open_session(&self, task_id: &TaskId) -> Result<Arc<dyn BrowserDriver>, ServiceError> {
        match self.launcher.launch().await {
            Ok(browser) => Ok(browser),
            Err(err) => {
                error!(task_id = %task_id, error = %err, "browser setup failed");
                Err(err)
            }
        }
    }

    async fn close_session(&self, task_id: &TaskId, browser: &Arc<dyn BrowserDriver>) {
        if let Err(err) = browser.close().await {
            warn!(task_id = %task_id, error = %err, "failed to close browser session");
        }
    }

    /// Run `objective` in adaptive mode.
    pub async fn execute(&self, objective: &str) -> Result<TaskReport, ServiceError> {
        let task_id = TaskId::new();
        let _guard = self.acquire(&task_id)?;
        let started = Instant::now();
        info!(task_id = %task_id, objective = %objective, "starting adaptive task");

        let browser = self.open_session(&task_id).await?;
        let adaptive = AdaptiveLoop::new(
            self.config.agent.clone(),
            browser.clone(),
            self.executor(browser.clone()),
            self.planner.clone(),
            self.ledger.clone(),
        )
        .with_task_id(task_id.clone());

        let result = adaptive.run(objective).await;
        self.close_session(&task_id, &browser).await;

        let report = TaskReport {
            task_id,
            objective: objective.to_string(),
            result,
            learning_stats: self.ledger.stats(),
            execution_time_ms: started.elapsed().as_millis() as u64,
            finished_at: Utc::now(),
        };
        info!(
            task_id = %report.task_id,
            success = report.result.success,
            iterations = report.result.iterations,
            adaptations = report.result.adaptations,
            elapsed_ms = report.execution_time_ms,
            "adaptive task finished"
        );
        Ok(report)
    }

    /// Draft a plan for `objective` and run it in linear mode. Cancelling
    /// `cancel` stops the run before its next step.
    pub async fn execute_plan(
        &self,
        objective: &str,
        cancel: CancellationToken,
    ) -> Result<PlanReport, ServiceError> {
        let task_id = TaskId::new();
        let _guard = self.acquire(&task_id)?;
        let started = Instant::now();
        info!(task_id = %task_id, objective = %objective, "starting linear task");

        let browser = self.open_session(&task_id).await?;
        let runner = PlanRunner::new(
            self.config.plan.clone(),
            browser.clone(),
            self.executor(browser.clone()),
            self.planner.clone(),
        )
        .with_cancellation(cancel)
        .with_task_id(task_id.clone());

        let plan = runner.draft(objective).await;
        let result = runner.run_plan(plan).await;
        self.close_session(&task_id, &browser).await;

        let report = PlanReport {
            task_id,
            objective: objective.to_string(),
            result,
            execution_time_ms: started.elapsed().as_millis() as u64,
            finished_at: Utc::now(),
        };
        info!(
            task_id = %report.task_id,
            status = ?report.result.status,
            replans = report.result.replans,
            elapsed_ms = report.execution_time_ms,
            "linear task finished"
        );
        Ok(report)
    }
}
