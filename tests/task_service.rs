use action_flow::ExecutorConfig;
use action_primitives::testing::MockBrowser;
use action_primitives::BrowserDriver;
use agent_core::{LoopConfig, ScriptedPlanner};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use webpilot_cli::{AppConfig, BrowserLauncher, ServiceError, TaskService};
use webpilot_core_types::{
    Action, ActionType, Decision, LoopStatus, Observation, PageType, Plan, PlanStatus, Progress,
    Step,
};

/// Launcher handing out one mock browser, optionally held at a gate.
struct MockLauncher {
    browser: Arc<MockBrowser>,
    started: Arc<Notify>,
    gate: Option<Arc<Notify>>,
    launches: AtomicUsize,
}

impl MockLauncher {
    fn new(browser: Arc<MockBrowser>) -> Self {
        Self {
            browser,
            started: Arc::new(Notify::new()),
            gate: None,
            launches: AtomicUsize::new(0),
        }
    }

    fn gated(browser: Arc<MockBrowser>, gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new(browser)
        }
    }
}

#[async_trait]
impl BrowserLauncher for MockLauncher {
    async fn launch(&self) -> Result<Arc<dyn BrowserDriver>, ServiceError> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        self.started.notify_one();
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        Ok(self.browser.clone())
    }
}

struct FailingLauncher;

#[async_trait]
impl BrowserLauncher for FailingLauncher {
    async fn launch(&self) -> Result<Arc<dyn BrowserDriver>, ServiceError> {
        Err(ServiceError::setup("no browser executable found"))
    }
}

fn quick_config() -> AppConfig {
    AppConfig {
        agent: LoopConfig::minimal(),
        executor: ExecutorConfig::minimal(),
        ..AppConfig::default()
    }
}

fn finishing_planner() -> Arc<ScriptedPlanner> {
    Arc::new(
        ScriptedPlanner::new()
            .with_observation(Observation {
                page_type: PageType::Registration,
                ..Observation::default()
            })
            .with_progress(Progress::new(0.4))
            .with_progress(Progress::new(1.0))
            .with_decision(Decision::new(Action::navigate("https://example.com"))),
    )
}

#[tokio::test]
async fn adaptive_run_reports_and_closes_the_browser() {
    let browser = Arc::new(MockBrowser::new());
    let service = TaskService::new(
        quick_config(),
        Arc::new(MockLauncher::new(browser.clone())),
        finishing_planner(),
    );

    let report = service.execute("Sign up on example.com").await.expect("report");

    assert!(report.result.success);
    assert_eq!(report.result.status, LoopStatus::Completed);
    assert_eq!(report.result.iterations, 2);
    assert_eq!(report.learning_stats.total_actions, 1);
    assert_eq!(report.learning_stats.success_rate, 1.0);
    assert_eq!(report.objective, "Sign up on example.com");
    assert!(browser.is_closed());
    assert_eq!(browser.navigations(), vec!["https://example.com".to_string()]);

    let status = service.status();
    assert!(!status.is_executing);
    assert!(status.current_task.is_none());
    assert_eq!(status.learning_stats.total_actions, 1);

    let json = serde_json::to_value(&report).expect("serialize");
    assert_eq!(json["success"], true);
    assert_eq!(json["learningStats"]["totalActions"], 1);
    assert!(json.get("executionTimeMs").is_some());
}

#[tokio::test]
async fn second_run_is_rejected_while_one_is_in_flight() {
    let browser = Arc::new(MockBrowser::new());
    let gate = Arc::new(Notify::new());
    let launcher = Arc::new(MockLauncher::gated(browser.clone(), gate.clone()));
    let started = launcher.started.clone();
    let service = Arc::new(TaskService::new(
        quick_config(),
        launcher.clone(),
        finishing_planner(),
    ));

    let first = {
        let service = service.clone();
        tokio::spawn(async move { service.execute("Sign up").await })
    };
    started.notified().await;

    let status = service.status();
    assert!(status.is_executing);
    assert!(status.current_task.is_some());

    let second = service.execute("Sign up again").await;
    assert!(matches!(second, Err(ServiceError::AlreadyExecuting)));
    let plan_attempt = service
        .execute_plan("Sign up again", CancellationToken::new())
        .await;
    assert!(matches!(plan_attempt, Err(ServiceError::AlreadyExecuting)));
    assert_eq!(launcher.launches.load(Ordering::SeqCst), 1);

    gate.notify_one();
    let report = first.await.expect("join").expect("first run");
    assert!(report.result.success);
    assert!(!service.status().is_executing);
}

#[tokio::test]
async fn setup_failure_releases_the_guard() {
    let service = TaskService::new(
        quick_config(),
        Arc::new(FailingLauncher),
        finishing_planner(),
    );

    let err = service.execute("Sign up").await.expect_err("setup fails");
    assert!(matches!(err, ServiceError::Setup(_)));
    assert!(!service.status().is_executing);

    let err = service.execute("Sign up").await.expect_err("still failing");
    assert!(matches!(err, ServiceError::Setup(_)));
}

#[tokio::test]
async fn linear_run_executes_drafted_plan() {
    let browser = Arc::new(MockBrowser::new());
    let plan = Plan::new(vec![
        Step::new(ActionType::Navigate, "https://example.com").with_wait_for("page load"),
        Step::new(ActionType::Click, "button#signup"),
    ]);
    let planner = Arc::new(ScriptedPlanner::new().with_plan(plan));
    let service = TaskService::new(
        quick_config(),
        Arc::new(MockLauncher::new(browser.clone())),
        planner,
    );

    let report = service
        .execute_plan("Sign up on example.com", CancellationToken::new())
        .await
        .expect("report");

    assert_eq!(report.result.status, PlanStatus::Completed);
    assert_eq!(report.result.completed_steps, 2);
    assert_eq!(browser.clicks(), vec!["button#signup".to_string()]);
    assert!(browser.is_closed());
}

#[tokio::test]
async fn cancelled_linear_run_still_closes_the_browser() {
    let browser = Arc::new(MockBrowser::new());
    let token = CancellationToken::new();
    token.cancel();
    let service = TaskService::new(
        quick_config(),
        Arc::new(MockLauncher::new(browser.clone())),
        Arc::new(ScriptedPlanner::new()),
    );

    let report = service
        .execute_plan("Open https://example.com", token)
        .await
        .expect("report");

    assert_eq!(report.result.status, PlanStatus::Cancelled);
    assert!(browser.navigations().is_empty());
    assert!(browser.is_closed());
}
