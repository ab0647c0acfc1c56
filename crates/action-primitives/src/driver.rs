//! The [`BrowserDriver`] trait.

use crate::errors::BrowserError;
use crate::types::{PageSnapshot, ScrollDirection};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Operations the executor and observer need from one browser session.
///
/// A session is driven by a single task at a time; implementations need not
/// support concurrent calls against the same page.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Load `url` in the current page.
    async fn navigate(&self, url: &str) -> Result<(), BrowserError>;

    /// Click the element addressed by a CSS or XPath selector.
    async fn click(&self, target: &str) -> Result<(), BrowserError>;

    /// Type `text` into the element addressed by `target`.
    async fn type_text(&self, target: &str, text: &str) -> Result<(), BrowserError>;

    /// Fill a form control identified by field name, id or placeholder.
    async fn fill_field(&self, name: &str, value: &str) -> Result<(), BrowserError>;

    async fn scroll(&self, direction: ScrollDirection) -> Result<(), BrowserError>;

    /// Wait until `selector` is present or `timeout` elapses.
    async fn wait_for_element(&self, selector: &str, timeout: Duration)
        -> Result<(), BrowserError>;

    async fn content(&self) -> Result<String, BrowserError>;

    async fn current_url(&self) -> Result<String, BrowserError>;

    /// Short descriptions of interactive elements currently visible.
    async fn visible_elements(&self) -> Result<Vec<Value>, BrowserError>;

    /// Release the session. Must be safe to call more than once.
    async fn close(&self) -> Result<(), BrowserError>;

    /// Read the raw page state used for observation. A failure to list
    /// visible elements is tolerated; content and URL reads are not.
    async fn snapshot(&self) -> Result<PageSnapshot, BrowserError> {
        let content = self.content().await?;
        let url = self.current_url().await?;
        let visible_elements = match self.visible_elements().await {
            Ok(elements) => elements,
            Err(err) => {
                debug!(error = %err, "visible element scan failed");
                Vec::new()
            }
        };
        Ok(PageSnapshot {
            url,
            content,
            visible_elements,
            error: None,
        })
    }
}
