//! Scriptable in-memory browser for tests and dry runs.

use crate::driver::BrowserDriver;
use crate::errors::BrowserError;
use crate::types::ScrollDirection;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;

/// A call received by [`MockBrowser`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowserCall {
    Navigate(String),
    Click(String),
    Type { target: String, text: String },
    FillField { name: String, value: String },
    Scroll(ScrollDirection),
    WaitFor(String),
    Close,
}

#[derive(Debug, Clone)]
struct Failure {
    error: BrowserError,
    /// Remaining failures; `None` fails forever.
    remaining: Option<u32>,
}

#[derive(Debug, Default)]
struct MockState {
    url: String,
    content: String,
    failures: HashMap<String, Failure>,
    fail_reads: bool,
    fail_scroll: bool,
    calls: Vec<BrowserCall>,
    closed: bool,
}

/// Browser double that records every call and fails on scripted targets.
///
/// Failures are keyed by selector, URL or field name. A target can fail
/// forever or a fixed number of times before succeeding.
#[derive(Debug)]
pub struct MockBrowser {
    state: Mutex<MockState>,
}

impl Default for MockBrowser {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBrowser {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                url: "about:blank".to_string(),
                content: "<html><body></body></html>".to_string(),
                ..MockState::default()
            }),
        }
    }

    pub fn with_content(self, content: impl Into<String>) -> Self {
        self.state.lock().content = content.into();
        self
    }

    /// Fail every operation on `target` with an element-not-found error.
    pub fn fail_target(self, target: impl Into<String>) -> Self {
        let target = target.into();
        let error = BrowserError::ElementNotFound(target.clone());
        self.fail_target_with(target, error)
    }

    pub fn fail_target_with(self, target: impl Into<String>, error: BrowserError) -> Self {
        self.state.lock().failures.insert(
            target.into(),
            Failure {
                error,
                remaining: None,
            },
        );
        self
    }

    /// Fail operations on `target` `times` times, then succeed.
    pub fn fail_times(self, target: impl Into<String>, times: u32, error: BrowserError) -> Self {
        self.state.lock().failures.insert(
            target.into(),
            Failure {
                error,
                remaining: Some(times),
            },
        );
        self
    }

    /// Make content and URL reads fail.
    pub fn fail_reads(self) -> Self {
        self.state.lock().fail_reads = true;
        self
    }

    pub fn fail_scroll(self) -> Self {
        self.state.lock().fail_scroll = true;
        self
    }

    pub fn calls(&self) -> Vec<BrowserCall> {
        self.state.lock().calls.clone()
    }

    pub fn clicks(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                BrowserCall::Click(target) => Some(target),
                _ => None,
            })
            .collect()
    }

    pub fn navigations(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                BrowserCall::Navigate(url) => Some(url),
                _ => None,
            })
            .collect()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    fn record(&self, call: BrowserCall, key: &str) -> Result<(), BrowserError> {
        let mut state = self.state.lock();
        state.calls.push(call);
        if state.closed {
            return Err(BrowserError::NotInitialized);
        }
        let Some(failure) = state.failures.get_mut(key) else {
            return Ok(());
        };
        match failure.remaining {
            None => Err(failure.error.clone()),
            Some(0) => Ok(()),
            Some(ref mut remaining) => {
                *remaining -= 1;
                Err(failure.error.clone())
            }
        }
    }
}

#[async_trait]
impl BrowserDriver for MockBrowser {
    async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        self.record(BrowserCall::Navigate(url.to_string()), url)?;
        self.state.lock().url = url.to_string();
        Ok(())
    }

    async fn click(&self, target: &str) -> Result<(), BrowserError> {
        self.record(BrowserCall::Click(target.to_string()), target)
    }

    async fn type_text(&self, target: &str, text: &str) -> Result<(), BrowserError> {
        self.record(
            BrowserCall::Type {
                target: target.to_string(),
                text: text.to_string(),
            },
            target,
        )
    }

    async fn fill_field(&self, name: &str, value: &str) -> Result<(), BrowserError> {
        self.record(
            BrowserCall::FillField {
                name: name.to_string(),
                value: value.to_string(),
            },
            name,
        )
    }

    async fn scroll(&self, direction: ScrollDirection) -> Result<(), BrowserError> {
        self.record(BrowserCall::Scroll(direction), "")?;
        if self.state.lock().fail_scroll {
            return Err(BrowserError::Interaction("scroll rejected".to_string()));
        }
        Ok(())
    }

    async fn wait_for_element(
        &self,
        selector: &str,
        _timeout: Duration,
    ) -> Result<(), BrowserError> {
        self.record(BrowserCall::WaitFor(selector.to_string()), selector)
    }

    async fn content(&self) -> Result<String, BrowserError> {
        let state = self.state.lock();
        if state.fail_reads || state.closed {
            return Err(BrowserError::Session("page unavailable".to_string()));
        }
        Ok(state.content.clone())
    }

    async fn current_url(&self) -> Result<String, BrowserError> {
        let state = self.state.lock();
        if state.fail_reads || state.closed {
            return Err(BrowserError::Session("page unavailable".to_string()));
        }
        Ok(state.url.clone())
    }

    async fn visible_elements(&self) -> Result<Vec<Value>, BrowserError> {
        Ok(vec![json!({"tag": "body", "text": ""})])
    }

    async fn close(&self) -> Result<(), BrowserError> {
        let mut state = self.state.lock();
        state.calls.push(BrowserCall::Close);
        state.closed = true;
        Ok(())
    }
}
