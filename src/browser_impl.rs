//! Chrome DevTools Protocol browser client.
//!
//! [`ChromiumBrowser`] owns one browser process (or one attached DevTools
//! connection) and a single page. It implements [`BrowserDriver`] so the
//! executor and observer can drive it.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use action_primitives::{BrowserDriver, BrowserError, ScrollDirection};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::element::Element;
use chromiumoxide::page::Page;
use futures::StreamExt;
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use which::which;

use crate::config::{BrowserSettings, ENV_CHROME};

/// Vertical pixels moved by one scroll action.
const SCROLL_DISTANCE: i64 = 600;
const ELEMENT_POLL_INTERVAL: Duration = Duration::from_millis(250);
const VISIBLE_ELEMENT_CAP: usize = 50;

const VISIBLE_ELEMENTS_SCRIPT: &str = r#"(() => {
  const cap = __CAP__;
  const nodes = document.querySelectorAll('a, button, input, textarea, select, label, [role="button"], [onclick]');
  const visible = [];
  for (const el of nodes) {
    if (visible.length >= cap) break;
    const rect = el.getBoundingClientRect();
    if (rect.width <= 0 || rect.height <= 0) continue;
    if (rect.bottom < 0 || rect.right < 0 || rect.top > window.innerHeight || rect.left > window.innerWidth) continue;
    visible.push({
      tagName: el.tagName.toLowerCase(),
      id: el.id || '',
      className: typeof el.className === 'string' ? el.className : '',
      text: (el.innerText || el.value || '').trim().substring(0, 100),
      type: el.type || '',
      name: el.name || '',
      placeholder: el.placeholder || '',
      href: el.href || ''
    });
  }
  return visible;
})()"#;

struct Session {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
}

pub struct ChromiumBrowser {
    session: Mutex<Option<Session>>,
}

impl ChromiumBrowser {
    /// Launch a local browser, or attach to `websocket_url` when configured,
    /// and open a blank page. A partially started browser is shut down
    /// before an error is returned.
    pub async fn launch(settings: &BrowserSettings) -> Result<Self, BrowserError> {
        let (mut browser, mut handler) = match &settings.websocket_url {
            Some(ws) => {
                info!(url = %ws, "attaching to running browser");
                Browser::connect(ws.clone()).await.map_err(|err| {
                    BrowserError::Session(format!("failed to attach to {ws}: {err}"))
                })?
            }
            None => {
                let config = browser_config(settings)?;
                Browser::launch(config)
                    .await
                    .map_err(|err| BrowserError::Session(format!("failed to launch browser: {err}")))?
            }
        };

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    debug!(error = %err, "devtools handler error");
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(err) => {
                if let Err(close_err) = browser.close().await {
                    warn!(error = %close_err, "failed to close browser after setup error");
                }
                let _ = browser.wait().await;
                handler.abort();
                return Err(BrowserError::Session(format!("failed to open page: {err}")));
            }
        };

        info!(headless = settings.headless, "browser session ready");
        Ok(Self {
            session: Mutex::new(Some(Session {
                browser,
                page,
                handler,
            })),
        })
    }

    async fn page(&self) -> Result<Page, BrowserError> {
        self.session
            .lock()
            .await
            .as_ref()
            .map(|session| session.page.clone())
            .ok_or(BrowserError::NotInitialized)
    }

    async fn find(&self, page: &Page, target: &str) -> Result<Element, BrowserError> {
        let found = match xpath_of(target) {
            Some(xpath) => page.find_xpath(xpath).await,
            None => page.find_element(target).await,
        };
        found.map_err(|_| BrowserError::ElementNotFound(target.to_string()))
    }

    async fn evaluate(&self, script: String) -> Result<Value, BrowserError> {
        let page = self.page().await?;
        let result = page
            .evaluate(script)
            .await
            .map_err(|err| BrowserError::Protocol(format!("script evaluation failed: {err}")))?;
        Ok(result.into_value::<Value>().unwrap_or(Value::Null))
    }
}

#[async_trait]
impl BrowserDriver for ChromiumBrowser {
    async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        let page = self.page().await?;
        page.goto(url)
            .await
            .map_err(|err| BrowserError::Navigation(format!("{url}: {err}")))?;
        Ok(())
    }

    async fn click(&self, target: &str) -> Result<(), BrowserError> {
        let page = self.page().await?;
        let element = self.find(&page, target).await?;
        element
            .click()
            .await
            .map_err(|err| BrowserError::Interaction(format!("click on {target} failed: {err}")))?;
        Ok(())
    }

    async fn type_text(&self, target: &str, text: &str) -> Result<(), BrowserError> {
        let page = self.page().await?;
        let element = self.find(&page, target).await?;
        element
            .click()
            .await
            .map_err(|err| BrowserError::Interaction(format!("focus on {target} failed: {err}")))?;
        element
            .type_str(text)
            .await
            .map_err(|err| BrowserError::Interaction(format!("typing into {target} failed: {err}")))?;
        Ok(())
    }

    async fn fill_field(&self, name: &str, value: &str) -> Result<(), BrowserError> {
        let page = self.page().await?;
        for selector in field_selectors(name) {
            let Ok(element) = page.find_element(selector.as_str()).await else {
                continue;
            };
            if selector.starts_with("select") {
                let script = format!(
                    "(() => {{ const el = document.querySelector({sel}); if (!el) return false; \
                     el.value = {val}; el.dispatchEvent(new Event('change', {{ bubbles: true }})); \
                     return true; }})()",
                    sel = js_string(&selector),
                    val = js_string(value),
                );
                if select_applied(name, &selector, self.evaluate(script).await) {
                    return Ok(());
                }
                continue;
            }
            element.click().await.map_err(|err| {
                BrowserError::Interaction(format!("focus on field {name} failed: {err}"))
            })?;
            element.type_str(value).await.map_err(|err| {
                BrowserError::Interaction(format!("typing into field {name} failed: {err}"))
            })?;
            debug!(field = %name, selector = %selector, "filled form field");
            return Ok(());
        }
        Err(BrowserError::ElementNotFound(format!("field {name}")))
    }

    async fn scroll(&self, direction: ScrollDirection) -> Result<(), BrowserError> {
        let (x, y) = direction.offsets(SCROLL_DISTANCE);
        self.evaluate(format!("window.scrollBy({x}, {y})")).await?;
        Ok(())
    }

    async fn wait_for_element(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), BrowserError> {
        let page = self.page().await?;
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.find(&page, selector).await.is_ok() {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(BrowserError::Timeout(format!(
                    "{selector} did not appear within {}ms",
                    timeout.as_millis()
                )));
            }
            tokio::time::sleep(ELEMENT_POLL_INTERVAL).await;
        }
    }

    async fn content(&self) -> Result<String, BrowserError> {
        let page = self.page().await?;
        page.content()
            .await
            .map_err(|err| BrowserError::Protocol(format!("failed to read content: {err}")))
    }

    async fn current_url(&self) -> Result<String, BrowserError> {
        let page = self.page().await?;
        let url = page
            .url()
            .await
            .map_err(|err| BrowserError::Protocol(format!("failed to read url: {err}")))?;
        Ok(url.unwrap_or_else(|| "about:blank".to_string()))
    }

    async fn visible_elements(&self) -> Result<Vec<Value>, BrowserError> {
        let script = VISIBLE_ELEMENTS_SCRIPT.replace("__CAP__", &VISIBLE_ELEMENT_CAP.to_string());
        match self.evaluate(script).await? {
            Value::Array(items) => Ok(items),
            _ => Ok(Vec::new()),
        }
    }

    async fn close(&self) -> Result<(), BrowserError> {
        let Some(mut session) = self.session.lock().await.take() else {
            return Ok(());
        };
        let result = session
            .browser
            .close()
            .await
            .map(|_| ())
            .map_err(|err| BrowserError::Session(format!("failed to close browser: {err}")));
        if let Err(err) = session.browser.wait().await {
            debug!(error = %err, "browser process wait failed");
        }
        session.handler.abort();
        info!("browser session closed");
        result
    }
}

fn browser_config(settings: &BrowserSettings) -> Result<BrowserConfig, BrowserError> {
    let (width, height) = settings.window_size;
    let mut builder = BrowserConfig::builder()
        .request_timeout(Duration::from_millis(settings.request_timeout_ms))
        .launch_timeout(Duration::from_millis(settings.launch_timeout_ms))
        .window_size(width, height);

    if !settings.headless {
        builder = builder.with_head();
    }
    if settings.no_sandbox {
        builder = builder.no_sandbox();
    }

    let mut args: Vec<String> = [
        "--disable-background-networking",
        "--disable-default-apps",
        "--disable-dev-shm-usage",
        "--disable-extensions",
        "--disable-popup-blocking",
        "--disable-sync",
        "--no-first-run",
        "--no-default-browser-check",
    ]
    .iter()
    .map(|arg| arg.to_string())
    .collect();
    if settings.headless {
        args.push("--headless=new".to_string());
        args.push("--mute-audio".to_string());
    }
    args.extend(settings.args.iter().cloned());
    builder = builder.args(args);

    if let Some(executable) = detect_chrome_executable(settings) {
        debug!(path = %executable.display(), "using browser executable");
        builder = builder.chrome_executable(executable);
    }

    builder
        .build()
        .map_err(|err| BrowserError::Session(format!("browser config error: {err}")))
}

/// Resolve the browser binary: environment, then configuration, then PATH,
/// then the usual install locations.
fn detect_chrome_executable(settings: &BrowserSettings) -> Option<PathBuf> {
    if let Ok(raw) = env::var(ENV_CHROME) {
        let candidate = PathBuf::from(raw.trim());
        if !raw.trim().is_empty() && candidate.exists() {
            return Some(candidate);
        }
    }
    if let Some(path) = settings.executable.as_ref().filter(|path| path.exists()) {
        return Some(path.clone());
    }
    for name in chrome_executable_names() {
        if let Ok(path) = which(name) {
            return Some(path);
        }
    }
    os_specific_chrome_paths()
        .into_iter()
        .find(|candidate| candidate.exists())
}

fn chrome_executable_names() -> &'static [&'static str] {
    #[cfg(target_os = "windows")]
    {
        &["chrome.exe", "chromium.exe", "msedge.exe"]
    }

    #[cfg(not(target_os = "windows"))]
    {
        &[
            "google-chrome-stable",
            "google-chrome",
            "chromium",
            "chromium-browser",
        ]
    }
}

fn os_specific_chrome_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if cfg!(target_os = "macos") {
        paths.push(PathBuf::from(
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        ));
        paths.push(PathBuf::from(
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
        ));
    } else if cfg!(target_os = "windows") {
        paths.push(PathBuf::from(
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
        ));
        paths.push(PathBuf::from(
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
        ));
    } else {
        paths.push(PathBuf::from("/usr/bin/google-chrome"));
        paths.push(PathBuf::from("/usr/bin/chromium"));
        paths.push(PathBuf::from("/snap/bin/chromium"));
    }
    paths
}

/// Selectors probed for a form field, most specific first.
pub fn field_selectors(name: &str) -> Vec<String> {
    let quoted = name.replace('\\', "\\\\").replace('"', "\\\"");
    vec![
        format!("input[name=\"{quoted}\"]"),
        format!("input[id=\"{quoted}\"]"),
        format!("input[placeholder*=\"{quoted}\"]"),
        format!("textarea[name=\"{quoted}\"]"),
        format!("textarea[id=\"{quoted}\"]"),
        format!("select[name=\"{quoted}\"]"),
        format!("select[id=\"{quoted}\"]"),
    ]
}

/// XPath expression carried by `target`, if it is one.
fn xpath_of(target: &str) -> Option<&str> {
    let trimmed = target.trim();
    if let Some(rest) = trimmed.strip_prefix("xpath=") {
        return Some(rest);
    }
    if trimmed.starts_with('/') || trimmed.starts_with("(/") {
        return Some(trimmed);
    }
    None
}

/// Whether a `<select>` assignment script took effect. A script error moves
/// the cascade on to the next selector.
fn select_applied(name: &str, selector: &str, outcome: Result<Value, BrowserError>) -> bool {
    match outcome {
        Ok(value) => value == Value::Bool(true),
        Err(err) => {
            warn!(field = %name, selector = %selector, error = %err, "select assignment failed");
            false
        }
    }
}

fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_probe_order_follows_name_id_placeholder() {
        let selectors = field_selectors("email");
        assert_eq!(selectors.len(), 7);
        assert_eq!(selectors[0], "input[name=\"email\"]");
        assert_eq!(selectors[2], "input[placeholder*=\"email\"]");
        assert_eq!(selectors[6], "select[id=\"email\"]");
    }

    #[test]
    fn field_names_are_escaped() {
        let selectors = field_selectors("say \"hi\"");
        assert_eq!(selectors[0], "input[name=\"say \\\"hi\\\"\"]");
    }

    #[test]
    fn xpath_targets_are_recognized() {
        assert_eq!(xpath_of("//button[text()='Go']"), Some("//button[text()='Go']"));
        assert_eq!(xpath_of("xpath=//a"), Some("//a"));
        assert_eq!(xpath_of("(//a)[2]"), Some("(//a)[2]"));
        assert_eq!(xpath_of("button#signup"), None);
    }

    #[test]
    fn select_script_errors_fall_through() {
        let err = BrowserError::Protocol("script evaluation failed".into());
        assert!(!select_applied("country", "select[name=\"country\"]", Err(err)));
        assert!(!select_applied("country", "select[id=\"country\"]", Ok(Value::Null)));
        assert!(select_applied("country", "select[id=\"country\"]", Ok(Value::Bool(true))));
    }

    #[test]
    fn js_strings_are_quoted() {
        assert_eq!(js_string("a'b\"c"), "\"a'b\\\"c\"");
    }

    #[test]
    fn visible_element_script_carries_cap() {
        let script = VISIBLE_ELEMENTS_SCRIPT.replace("__CAP__", "50");
        assert!(script.contains("const cap = 50;"));
    }
}
