//! Action executor implementation

use crate::config::ExecutorConfig;
use action_locator::alternative_targets;
use action_primitives::{BrowserDriver, BrowserError, ScrollDirection};
use async_trait::async_trait;
use serde_json::Value;
use stealth::{classify_browser_error, CaptchaSolver, FailureSignature, ProxyRotator};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};
use webpilot_core_types::lenient::value_to_text;
use webpilot_core_types::plan::WaitCondition;
use webpilot_core_types::{Action, ActionResult, ActionType};

/// Executes one action against the browser and reports a normalized result.
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    /// Execute `action`. Never fails: collaborator errors become a failed
    /// [`ActionResult`].
    async fn execute(&self, action: &Action) -> ActionResult;

    /// Wait for a step's settle condition. Failures are logged, not raised.
    async fn settle(&self, condition: &WaitCondition);
}

/// Default executor over a [`BrowserDriver`] with optional captcha and proxy
/// support services.
pub struct DefaultActionExecutor {
    browser: Arc<dyn BrowserDriver>,
    config: ExecutorConfig,
    captcha: Option<Arc<dyn CaptchaSolver>>,
    proxies: Option<Arc<dyn ProxyRotator>>,
}

impl DefaultActionExecutor {
    /// Create a new executor without support services
    pub fn new(browser: Arc<dyn BrowserDriver>, config: ExecutorConfig) -> Self {
        Self {
            browser,
            config,
            captcha: None,
            proxies: None,
        }
    }

    pub fn with_captcha_solver(mut self, solver: Arc<dyn CaptchaSolver>) -> Self {
        self.captcha = Some(solver);
        self
    }

    pub fn with_proxy_rotator(mut self, rotator: Arc<dyn ProxyRotator>) -> Self {
        self.proxies = Some(rotator);
        self
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn browser(&self) -> &Arc<dyn BrowserDriver> {
        &self.browser
    }

    /// Run a browser call under the configured action timeout.
    async fn call<T, F>(&self, operation: &str, fut: F) -> Result<T, BrowserError>
    where
        F: Future<Output = Result<T, BrowserError>> + Send,
    {
        match self.config.action_timeout_duration() {
            Some(limit) => match timeout(limit, fut).await {
                Ok(result) => result,
                Err(_) => Err(BrowserError::Timeout(format!(
                    "{operation} exceeded {}ms",
                    limit.as_millis()
                ))),
            },
            None => fut.await,
        }
    }

    /// Run the action once. A failure carrying a pushback signature reports
    /// it alongside the result.
    async fn dispatch(&self, action: &Action) -> (ActionResult, Option<FailureSignature>) {
        let result = match &action.kind {
            ActionType::Navigate => return self.navigate(action).await,
            ActionType::Click => return self.click(action).await,
            ActionType::Type => return self.type_text(action).await,
            ActionType::FillForm => self.fill_form(action).await,
            ActionType::Wait => self.wait(action).await,
            ActionType::Scroll => self.scroll(action).await,
            ActionType::SolveCaptcha => self.solve_captcha().await,
            ActionType::Complete => ActionResult::ok("Task marked as complete by planner"),
            ActionType::Other(name) => ActionResult::failed(format!("Unknown action type: {name}")),
        };
        (result, None)
    }

    async fn navigate(&self, action: &Action) -> (ActionResult, Option<FailureSignature>) {
        let url = match text_target(action) {
            Ok(url) => url,
            Err(result) => return (result, None),
        };
        match self.call("navigate", self.browser.navigate(url)).await {
            Ok(()) => {
                pause(self.config.navigate_settle_ms).await;
                (ActionResult::ok(format!("Navigated to {url}")), None)
            }
            Err(err) => failure(err),
        }
    }

    async fn click(&self, action: &Action) -> (ActionResult, Option<FailureSignature>) {
        let selector = match text_target(action) {
            Ok(selector) => selector,
            Err(result) => return (result, None),
        };
        let err = match self.call("click", self.browser.click(selector)).await {
            Ok(()) => {
                pause(self.config.click_settle_ms).await;
                return (ActionResult::ok(format!("Clicked element: {selector}")), None);
            }
            Err(err) => err,
        };

        // Pushback from the page goes to the support retry instead.
        if classify_browser_error(&err).is_some() {
            return failure(err);
        }

        let candidates = alternative_targets(selector);
        for candidate in candidates.iter().take(self.config.max_click_alternatives) {
            debug!(
                original = %selector,
                alternative = %candidate.selector,
                strategy = candidate.strategy.name(),
                "trying alternative click target"
            );
            match self.call("click", self.browser.click(&candidate.selector)).await {
                Ok(()) => {
                    pause(self.config.click_settle_ms).await;
                    info!(original = %selector, alternative = %candidate.selector, "clicked alternative element");
                    return (
                        ActionResult::ok(format!(
                            "Clicked alternative element: {}",
                            candidate.selector
                        )),
                        None,
                    );
                }
                Err(alt_err) => {
                    debug!(alternative = %candidate.selector, error = %alt_err, "alternative click failed");
                }
            }
        }
        (ActionResult::failed(err.to_string()), None)
    }

    async fn type_text(&self, action: &Action) -> (ActionResult, Option<FailureSignature>) {
        let selector = match text_target(action) {
            Ok(selector) => selector,
            Err(result) => return (result, None),
        };
        let text = action.value.as_deref().unwrap_or("");
        match self
            .call("type", self.browser.type_text(selector, text))
            .await
        {
            Ok(()) => (ActionResult::ok(format!("Typed text in {selector}")), None),
            Err(err) => failure(err),
        }
    }

    async fn fill_form(&self, action: &Action) -> ActionResult {
        let Some(fields) = form_fields(action) else {
            return ActionResult::failed("Invalid form data format");
        };

        let total = fields.len();
        let mut filled = 0usize;
        for (name, value) in &fields {
            let value = value_to_text(value);
            match self
                .call("fill_field", self.browser.fill_field(name, &value))
                .await
            {
                Ok(()) => filled += 1,
                Err(err) => warn!(field = %name, error = %err, "failed to fill form field"),
            }
        }
        ActionResult::ok(format!(
            "Form filled with provided data ({filled}/{total} fields)"
        ))
    }

    async fn wait(&self, action: &Action) -> ActionResult {
        let millis = action
            .target
            .as_text()
            .and_then(leading_millis)
            .unwrap_or(self.config.default_wait_ms);
        pause(millis).await;
        ActionResult::ok(format!("Waited for {millis}ms"))
    }

    async fn scroll(&self, action: &Action) -> ActionResult {
        let direction = action
            .target
            .as_text()
            .map(ScrollDirection::parse)
            .unwrap_or_default();
        if let Err(err) = self.call("scroll", self.browser.scroll(direction)).await {
            warn!(direction = %direction, error = %err, "scroll failed");
        }
        ActionResult::ok(format!("Scrolled {direction}"))
    }

    async fn solve_captcha(&self) -> ActionResult {
        let Some(solver) = &self.captcha else {
            return ActionResult::failed("No captcha solver configured");
        };
        match solver.solve_on_page(self.browser.as_ref()).await {
            Ok(true) => ActionResult::ok("Captcha solved successfully"),
            Ok(false) => ActionResult::failed("Failed to solve captcha"),
            Err(err) => ActionResult::failed(err.to_string()),
        }
    }

    /// One support-gated retry after a page-touching action failed with a
    /// captcha or block signature.
    async fn support_retry(
        &self,
        action: &Action,
        signature: FailureSignature,
    ) -> Option<ActionResult> {
        let note = match signature {
            FailureSignature::Captcha => {
                let solver = self.captcha.as_ref()?;
                info!(action = %action.label(), "captcha signature detected, attempting solve");
                match solver.solve_on_page(self.browser.as_ref()).await {
                    Ok(true) => "after solving captcha",
                    Ok(false) => {
                        warn!(action = %action.label(), "captcha not solved, not retrying");
                        return None;
                    }
                    Err(err) => {
                        warn!(action = %action.label(), error = %err, "captcha solver failed");
                        return None;
                    }
                }
            }
            FailureSignature::Blocked | FailureSignature::RateLimited => {
                let rotator = self.proxies.as_ref()?;
                info!(action = %action.label(), signature = ?signature, "block signature detected, rotating proxy");
                match rotator.rotate().await {
                    Ok(proxy) => {
                        debug!(proxy = %proxy, "retrying through new proxy");
                        "after rotating proxy"
                    }
                    Err(err) => {
                        warn!(error = %err, "proxy rotation failed");
                        return None;
                    }
                }
            }
        };

        let (retried, _) = self.dispatch(action).await;
        if retried.success {
            Some(ActionResult::ok(format!("{} ({note})", retried.outcome)))
        } else {
            Some(retried)
        }
    }
}

#[async_trait]
impl ActionExecutor for DefaultActionExecutor {
    async fn execute(&self, action: &Action) -> ActionResult {
        info!(action = %action.kind, target = %action.target, "executing action");
        let (result, signature) = self.dispatch(action).await;
        let result = match signature {
            Some(signature) if !result.success && action.kind.touches_page() => {
                match self.support_retry(action, signature).await {
                    Some(retried) => retried,
                    None => result,
                }
            }
            _ => result,
        };
        if !result.success {
            warn!(action = %action.label(), error = result.error_text(), "action failed");
        }
        result
    }

    async fn settle(&self, condition: &WaitCondition) {
        match condition {
            WaitCondition::PageLoad => pause(self.config.navigate_settle_ms).await,
            WaitCondition::Selector(selector) => {
                let limit = Duration::from_millis(self.config.element_wait_timeout_ms);
                if let Err(err) = self.browser.wait_for_element(selector, limit).await {
                    warn!(selector = %selector, error = %err, "wait condition failed");
                    pause(self.config.click_settle_ms).await;
                }
            }
        }
    }
}

fn failure(err: BrowserError) -> (ActionResult, Option<FailureSignature>) {
    let signature = classify_browser_error(&err);
    (ActionResult::failed(err.to_string()), signature)
}

fn text_target(action: &Action) -> Result<&str, ActionResult> {
    match action.target.as_text().map(str::trim) {
        Some(text) if !text.is_empty() => Ok(text),
        Some(_) => Err(ActionResult::failed(format!(
            "Missing target for {} action",
            action.kind
        ))),
        None => Err(ActionResult::failed(format!(
            "Invalid target for {} action",
            action.kind
        ))),
    }
}

/// Field map from the target, or from a JSON object carried in `value`.
fn form_fields(action: &Action) -> Option<BTreeMap<String, Value>> {
    if let Some(fields) = action.target.as_fields() {
        return Some(fields.clone());
    }
    let raw = action.value.as_deref()?;
    match serde_json::from_str::<Value>(raw).ok()? {
        Value::Object(map) => Some(map.into_iter().collect()),
        _ => None,
    }
}

/// Milliseconds from the leading digits of `raw`; zero or none reads as absent.
fn leading_millis(raw: &str) -> Option<u64> {
    let digits: String = raw
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse::<u64>().ok().filter(|millis| *millis > 0)
}

async fn pause(millis: u64) {
    if millis > 0 {
        sleep(Duration::from_millis(millis)).await;
    }
}
