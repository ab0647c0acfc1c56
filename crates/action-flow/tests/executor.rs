use action_flow::{ActionExecutor, DefaultActionExecutor, ExecutorConfig};
use action_primitives::testing::{BrowserCall, MockBrowser};
use action_primitives::{BrowserDriver, BrowserError};
use async_trait::async_trait;
use serde_json::json;
use stealth::{
    CaptchaChallenge, CaptchaSolver, ProxyEndpoint, ProxyPool, ProxyRotator, StealthError,
};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use webpilot_core_types::{Action, ActionType};

fn executor(browser: &Arc<MockBrowser>) -> DefaultActionExecutor {
    let driver: Arc<dyn BrowserDriver> = browser.clone();
    DefaultActionExecutor::new(driver, ExecutorConfig::minimal())
}

struct CountingSolver {
    calls: AtomicU32,
    solves: bool,
}

#[async_trait]
impl CaptchaSolver for CountingSolver {
    async fn solve(&self, _challenge: &CaptchaChallenge) -> Result<String, StealthError> {
        Err(StealthError::Captcha("unused".into()))
    }

    async fn solve_on_page(&self, _browser: &dyn BrowserDriver) -> Result<bool, StealthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.solves)
    }
}

#[tokio::test]
async fn navigates_and_reports_outcome() {
    let browser = Arc::new(MockBrowser::new());
    let result = executor(&browser)
        .execute(&Action::navigate("https://example.com"))
        .await;
    assert!(result.success);
    assert_eq!(result.outcome, "Navigated to https://example.com");
    assert_eq!(browser.navigations(), vec!["https://example.com".to_string()]);
}

#[tokio::test]
async fn failed_click_tries_first_alternative() {
    let browser = Arc::new(MockBrowser::new().fail_target("button#signup"));
    let result = executor(&browser)
        .execute(&Action::click("button#signup"))
        .await;
    assert!(result.success);
    assert_eq!(
        result.outcome,
        "Clicked alternative element: [aria-label*=\"button#signup\"]"
    );
    assert_eq!(
        browser.clicks(),
        vec![
            "button#signup".to_string(),
            "[aria-label*=\"button#signup\"]".to_string()
        ]
    );
}

#[tokio::test]
async fn click_reports_original_error_when_alternatives_fail() {
    let browser = Arc::new(
        MockBrowser::new()
            .fail_target("button#signup")
            .fail_target("[aria-label*=\"button#signup\"]"),
    );
    let result = executor(&browser)
        .execute(&Action::click("button#signup"))
        .await;
    assert!(!result.success);
    assert_eq!(result.error_text(), "Element not found: button#signup");
    assert_eq!(browser.clicks().len(), 2);
}

#[tokio::test]
async fn selector_words_do_not_suppress_alternatives() {
    for target in ["#order-429", "button.captcha-free-signup", "a.unblocked-link"] {
        let browser = Arc::new(MockBrowser::new().fail_target(target));
        let solver = Arc::new(CountingSolver {
            calls: AtomicU32::new(0),
            solves: true,
        });
        let result = executor(&browser)
            .with_captcha_solver(solver.clone())
            .execute(&Action::click(target))
            .await;
        let alternative = format!("[aria-label*=\"{target}\"]");
        assert!(result.success, "{target}: {}", result.error_text());
        assert_eq!(result.outcome, format!("Clicked alternative element: {alternative}"));
        assert_eq!(browser.clicks(), vec![target.to_string(), alternative]);
        assert_eq!(solver.calls.load(Ordering::SeqCst), 0);
    }
}

#[tokio::test]
async fn fill_form_requires_field_map() {
    let browser = Arc::new(MockBrowser::new());
    let action = Action::new(ActionType::FillForm, "form#signup");
    let result = executor(&browser).execute(&action).await;
    assert!(!result.success);
    assert_eq!(result.error_text(), "Invalid form data format");
}

#[tokio::test]
async fn fill_form_tolerates_field_failures() {
    let browser = Arc::new(MockBrowser::new().fail_target("nickname"));
    let mut fields = BTreeMap::new();
    fields.insert("email".to_string(), json!("a@b.c"));
    fields.insert("nickname".to_string(), json!("ab"));
    fields.insert("age".to_string(), json!(30));
    let result = executor(&browser).execute(&Action::fill_form(fields)).await;
    assert!(result.success);
    assert_eq!(result.outcome, "Form filled with provided data (2/3 fields)");
    assert!(browser.calls().contains(&BrowserCall::FillField {
        name: "age".into(),
        value: "30".into()
    }));
}

#[tokio::test]
async fn unknown_action_types_fail() {
    let browser = Arc::new(MockBrowser::new());
    let action = Action::new(ActionType::parse("extract"), "body");
    let result = executor(&browser).execute(&action).await;
    assert!(!result.success);
    assert_eq!(result.error_text(), "Unknown action type: extract");
    assert!(browser.calls().is_empty());
}

#[tokio::test]
async fn wait_falls_back_to_default_duration() {
    let browser = Arc::new(MockBrowser::new());
    let driver: Arc<dyn BrowserDriver> = browser.clone();
    let executor = DefaultActionExecutor::new(driver, ExecutorConfig::minimal().default_wait(7));
    let result = executor
        .execute(&Action::new(ActionType::Wait, "a while"))
        .await;
    assert!(result.success);
    assert_eq!(result.outcome, "Waited for 7ms");
}

#[tokio::test]
async fn scroll_errors_are_not_failures() {
    let browser = Arc::new(MockBrowser::new().fail_scroll());
    let result = executor(&browser)
        .execute(&Action::new(ActionType::Scroll, "up"))
        .await;
    assert!(result.success);
    assert_eq!(result.outcome, "Scrolled up");
}

#[tokio::test]
async fn captcha_signature_triggers_single_solve_and_retry() {
    let browser = Arc::new(MockBrowser::new().fail_times(
        "#submit",
        1,
        BrowserError::Interaction("captcha challenge displayed".into()),
    ));
    let solver = Arc::new(CountingSolver {
        calls: AtomicU32::new(0),
        solves: true,
    });
    let executor = executor(&browser).with_captcha_solver(solver.clone());
    let result = executor.execute(&Action::click("#submit")).await;
    assert!(result.success);
    assert!(result.outcome.ends_with("(after solving captcha)"));
    assert_eq!(solver.calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        browser.clicks(),
        vec!["#submit".to_string(), "#submit".to_string()]
    );
}

#[tokio::test]
async fn captcha_retry_happens_at_most_once() {
    let browser = Arc::new(MockBrowser::new().fail_target_with(
        "input#email",
        BrowserError::Interaction("captcha challenge displayed".into()),
    ));
    let solver = Arc::new(CountingSolver {
        calls: AtomicU32::new(0),
        solves: true,
    });
    let executor = executor(&browser).with_captcha_solver(solver.clone());
    let result = executor
        .execute(&Action::type_text("input#email", "a@b.c"))
        .await;
    assert!(!result.success);
    assert_eq!(solver.calls.load(Ordering::SeqCst), 1);
    assert_eq!(browser.calls().len(), 2);
}

#[tokio::test]
async fn block_signature_rotates_proxy_then_retries() {
    let browser = Arc::new(MockBrowser::new().fail_times(
        "https://shop.test",
        1,
        BrowserError::Navigation("request blocked".into()),
    ));
    let pool = Arc::new(ProxyPool::new(vec![
        ProxyEndpoint::new("10.0.0.1", 8080),
        ProxyEndpoint::new("10.0.0.2", 8080),
    ]));
    let executor = executor(&browser).with_proxy_rotator(pool.clone());
    let result = executor.execute(&Action::navigate("https://shop.test")).await;
    assert!(result.success);
    assert!(result.outcome.ends_with("(after rotating proxy)"));
    assert_eq!(pool.current().map(|p| p.id()), Some("10.0.0.2:8080".into()));
}

#[tokio::test]
async fn signatures_without_support_services_fail_plainly() {
    let browser = Arc::new(MockBrowser::new().fail_target_with(
        "#submit",
        BrowserError::Interaction("captcha challenge displayed".into()),
    ));
    let result = executor(&browser).execute(&Action::click("#submit")).await;
    assert!(!result.success);
    assert_eq!(browser.clicks(), vec!["#submit".to_string()]);
}

#[tokio::test]
async fn solve_captcha_without_solver_fails() {
    let browser = Arc::new(MockBrowser::new());
    let result = executor(&browser)
        .execute(&Action::new(ActionType::SolveCaptcha, ""))
        .await;
    assert!(!result.success);
    assert_eq!(result.error_text(), "No captcha solver configured");
}

#[tokio::test]
async fn complete_has_no_side_effects() {
    let browser = Arc::new(MockBrowser::new());
    let result = executor(&browser)
        .execute(&Action::complete("done"))
        .await;
    assert!(result.success);
    assert!(browser.calls().is_empty());
}
