use action_flow::{ActionExecutor, DefaultActionExecutor, ExecutorConfig};
use action_primitives::testing::MockBrowser;
use agent_core::{AdaptiveLoop, LoopConfig, ScriptedPlanner};
use async_trait::async_trait;
use learning_ledger::SharedLedger;
use parking_lot::Mutex;
use std::sync::Arc;
use webpilot_core_types::plan::WaitCondition;
use webpilot_core_types::{
    Action, ActionResult, Adaptation, Decision, LoopStatus, Observation, PageType, Progress,
};

/// Executor double that succeeds or fails every action without touching a page.
struct StubExecutor {
    succeed: bool,
    executed: Mutex<Vec<Action>>,
}

impl StubExecutor {
    fn succeeding() -> Arc<Self> {
        Arc::new(Self {
            succeed: true,
            executed: Mutex::new(Vec::new()),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            succeed: false,
            executed: Mutex::new(Vec::new()),
        })
    }

    fn executed(&self) -> Vec<Action> {
        self.executed.lock().clone()
    }
}

#[async_trait]
impl ActionExecutor for StubExecutor {
    async fn execute(&self, action: &Action) -> ActionResult {
        self.executed.lock().push(action.clone());
        if self.succeed {
            ActionResult::ok(format!("done: {}", action.label()))
        } else {
            ActionResult::failed(format!("Element not found: {}", action.target))
        }
    }

    async fn settle(&self, _condition: &WaitCondition) {}
}

fn registration_page() -> Observation {
    Observation {
        page_type: PageType::Registration,
        ..Observation::default()
    }
}

fn build_loop(
    config: LoopConfig,
    executor: Arc<dyn ActionExecutor>,
    planner: Arc<ScriptedPlanner>,
) -> (AdaptiveLoop, SharedLedger) {
    let ledger = SharedLedger::default();
    let adaptive = AdaptiveLoop::new(
        config,
        Arc::new(MockBrowser::new()),
        executor,
        planner,
        ledger.clone(),
    );
    (adaptive, ledger)
}

#[tokio::test]
async fn completes_at_iteration_where_threshold_is_reached() {
    let planner = Arc::new(
        ScriptedPlanner::new()
            .with_observation(registration_page())
            .with_progress(Progress::new(0.2))
            .with_progress(Progress::new(0.5))
            .with_progress(Progress::new(0.95))
            .with_decision(Decision::new(Action::click("#next"))),
    );
    let executor = StubExecutor::succeeding();
    let (adaptive, ledger) = build_loop(LoopConfig::minimal(), executor.clone(), planner);

    let result = adaptive.run("Create an account").await;

    assert!(result.success);
    assert_eq!(result.status, LoopStatus::Completed);
    assert_eq!(result.iterations, 3);
    assert_eq!(result.adaptations, 0);
    assert_eq!(executor.executed().len(), 2);
    assert_eq!(ledger.stats().total_actions, 2);
    assert_eq!(
        result.final_state.map(|state| state.page_type),
        Some(PageType::Registration)
    );
    assert!(result.last_successful_state.is_some());
}

#[tokio::test]
async fn evaluator_completion_flag_wins_over_low_score() {
    let planner = Arc::new(
        ScriptedPlanner::new()
            .with_observation(registration_page())
            .with_progress(Progress::new(0.1).completed()),
    );
    let executor = StubExecutor::succeeding();
    let (adaptive, _) = build_loop(LoopConfig::minimal(), executor.clone(), planner);

    let result = adaptive.run("Create an account").await;

    assert!(result.success);
    assert_eq!(result.iterations, 1);
    assert!(executor.executed().is_empty());
}

#[tokio::test]
async fn stuck_loop_with_failing_actions_adapts_and_gives_up() {
    let planner = Arc::new(
        ScriptedPlanner::new()
            .with_observation(registration_page())
            .with_progress(Progress::new(0.1).stuck())
            .with_decision(Decision::new(Action::click("button#missing")))
            .with_adaptation(
                Adaptation::new("Search for the sign-up link")
                    .with_next_action(Action::click("a.search")),
            ),
    );
    let executor = StubExecutor::failing();
    let config = LoopConfig::minimal().max_iterations(10);
    let (adaptive, ledger) = build_loop(config, executor.clone(), planner.clone());

    let result = adaptive.run("Sign up for the newsletter").await;

    assert!(!result.success);
    assert_eq!(result.status, LoopStatus::Exhausted);
    assert_eq!(result.iterations, 10);
    assert_eq!(result.adaptations, 3);
    assert!(result.adaptations <= result.iterations);
    assert_eq!(
        result.message,
        "Task not completed after 10 iterations. 3 strategy adaptations were attempted."
    );

    // Adaptations replace the decision step for their iteration.
    assert_eq!(planner.call_count("adapt"), 3);
    assert_eq!(planner.call_count("decide"), 7);
    assert!(planner
        .calls()
        .iter()
        .filter(|call| call.role == "adapt")
        .all(|call| call.history_len == 3));

    let executed = executor.executed();
    assert_eq!(executed.len(), 10);
    assert_eq!(executed[3].target.as_text(), Some("a.search"));
    assert_eq!(ledger.stats().success_rate, 0.0);
}

#[tokio::test]
async fn unavailable_oracle_never_reports_success() {
    for executor in [StubExecutor::succeeding(), StubExecutor::failing()] {
        let planner = Arc::new(ScriptedPlanner::new());
        let config = LoopConfig::minimal().max_iterations(6);
        let (adaptive, _) = build_loop(config, executor.clone(), planner);

        let result = adaptive.run("Book a table").await;

        assert!(!result.success);
        assert_eq!(result.status, LoopStatus::Exhausted);
        assert_eq!(result.iterations, 6);
        assert!(result.adaptations <= result.iterations);
        // Every fallback decision is a wait.
        assert!(executor
            .executed()
            .iter()
            .all(|action| action.kind == webpilot_core_types::ActionType::Wait));
    }
}

#[tokio::test]
async fn decision_to_stop_ends_the_run() {
    let planner = Arc::new(
        ScriptedPlanner::new()
            .with_observation(registration_page())
            .with_progress(Progress::new(0.3))
            .with_decision(Decision::new(Action::click("#cancel")).stop()),
    );
    let executor = StubExecutor::succeeding();
    let (adaptive, _) = build_loop(LoopConfig::minimal(), executor.clone(), planner);

    let result = adaptive.run("Sign up").await;

    assert!(!result.success);
    assert_eq!(result.status, LoopStatus::Stopped);
    assert_eq!(result.iterations, 1);
    assert!(result.message.starts_with("Execution stopped by decision engine"));
    assert!(result
        .message
        .ends_with("Task not completed after 1 iterations. 0 strategy adaptations were attempted."));
    assert_eq!(executor.executed().len(), 1);
}

#[tokio::test]
async fn repeated_browser_read_errors_fail_the_run() {
    let planner = Arc::new(ScriptedPlanner::new().with_progress(Progress::new(0.95)));
    let executor = StubExecutor::succeeding();
    let ledger = SharedLedger::default();
    let adaptive = AdaptiveLoop::new(
        LoopConfig::minimal(),
        Arc::new(MockBrowser::new().fail_reads()),
        executor.clone(),
        planner.clone(),
        ledger,
    );

    let result = adaptive.run("Sign up").await;

    assert!(!result.success);
    assert_eq!(result.status, LoopStatus::Failed);
    assert_eq!(result.iterations, 3);
    assert!(result.message.contains("3 consecutive errors"));
    assert!(result
        .message
        .ends_with("Task not completed after 3 iterations. 0 strategy adaptations were attempted."));
    assert_eq!(planner.call_count("evaluate"), 0);
    assert!(executor.executed().is_empty());
}

#[tokio::test]
async fn signup_click_failure_tries_an_alternative_target() {
    let browser = Arc::new(MockBrowser::new().fail_target("button#signup"));
    let executor = Arc::new(DefaultActionExecutor::new(
        browser.clone(),
        ExecutorConfig::minimal(),
    ));
    let planner = Arc::new(
        ScriptedPlanner::new()
            .with_observation(registration_page())
            .with_progress(Progress::new(0.1))
            .with_progress(Progress::new(0.3))
            .with_progress(Progress::new(0.95))
            .with_decision(Decision::new(Action::navigate("https://example.com")))
            .with_decision(Decision::new(Action::click("button#signup"))),
    );
    let ledger = SharedLedger::default();
    let adaptive = AdaptiveLoop::new(
        LoopConfig::minimal(),
        browser.clone(),
        executor,
        planner,
        ledger.clone(),
    );

    let result = adaptive.run("Sign up on example.com").await;

    assert!(result.success);
    assert_eq!(browser.navigations(), vec!["https://example.com".to_string()]);
    let clicks = browser.clicks();
    assert!(clicks.len() >= 2);
    assert_eq!(clicks[0], "button#signup");
    assert_ne!(clicks[1], "button#signup");
    assert_eq!(ledger.stats().total_actions, 2);
}
