//! Proxy rotation.

use crate::StealthError;
use async_trait::async_trait;
use parking_lot::RwLock;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};

/// Consecutive failures after which a proxy is taken out of rotation.
const MAX_PROXY_FAILURES: u32 = 3;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyEndpoint {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_scheme")]
    pub scheme: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

fn default_scheme() -> String {
    "http".to_string()
}

impl ProxyEndpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            scheme: default_scheme(),
            username: None,
            password: None,
        }
    }

    pub fn id(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// `scheme://[user:pass@]host:port`
    pub fn url(&self) -> String {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => {
                format!("{}://{}:{}@{}:{}", self.scheme, user, pass, self.host, self.port)
            }
            _ => format!("{}://{}:{}", self.scheme, self.host, self.port),
        }
    }
}

impl fmt::Display for ProxyEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.id())
    }
}

/// Source of fresh network egress after a block.
#[async_trait]
pub trait ProxyRotator: Send + Sync {
    /// Retire the current proxy and switch to the next usable one.
    async fn rotate(&self) -> Result<ProxyEndpoint, StealthError>;

    /// Proxy currently in use, if any.
    fn current(&self) -> Option<ProxyEndpoint>;
}

#[derive(Debug)]
struct PoolEntry {
    endpoint: ProxyEndpoint,
    active: bool,
    failures: u32,
    successes: u32,
}

#[derive(Debug, Default)]
struct PoolState {
    entries: Vec<PoolEntry>,
    cursor: usize,
}

/// In-memory round-robin proxy pool. A proxy that fails
/// `MAX_PROXY_FAILURES` times is deactivated.
#[derive(Debug, Default)]
pub struct ProxyPool {
    state: RwLock<PoolState>,
}

impl ProxyPool {
    pub fn new(endpoints: impl IntoIterator<Item = ProxyEndpoint>) -> Self {
        let entries = endpoints
            .into_iter()
            .map(|endpoint| PoolEntry {
                endpoint,
                active: true,
                failures: 0,
                successes: 0,
            })
            .collect();
        Self {
            state: RwLock::new(PoolState { entries, cursor: 0 }),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().entries.is_empty()
    }

    pub fn active_count(&self) -> usize {
        self.state.read().entries.iter().filter(|e| e.active).count()
    }

    pub fn report_success(&self) {
        let mut state = self.state.write();
        let cursor = state.cursor;
        if let Some(entry) = state.entries.get_mut(cursor) {
            entry.successes += 1;
            entry.failures = 0;
        }
    }

    /// Pick a random active proxy without moving the rotation cursor.
    pub fn random(&self) -> Option<ProxyEndpoint> {
        let state = self.state.read();
        let active: Vec<&PoolEntry> = state.entries.iter().filter(|e| e.active).collect();
        if active.is_empty() {
            return None;
        }
        let index = rand::thread_rng().gen_range(0..active.len());
        Some(active[index].endpoint.clone())
    }
}

#[async_trait]
impl ProxyRotator for ProxyPool {
    async fn rotate(&self) -> Result<ProxyEndpoint, StealthError> {
        let mut state = self.state.write();
        let len = state.entries.len();
        if len == 0 {
            return Err(StealthError::ProxyUnavailable("pool is empty".to_string()));
        }

        let cursor = state.cursor;
        if let Some(entry) = state.entries.get_mut(cursor) {
            entry.failures += 1;
            if entry.failures >= MAX_PROXY_FAILURES && entry.active {
                entry.active = false;
                warn!(proxy = %entry.endpoint, "proxy disabled after repeated failures");
            }
        }

        for step in 1..=len {
            let index = (cursor + step) % len;
            if state.entries[index].active {
                state.cursor = index;
                let endpoint = state.entries[index].endpoint.clone();
                info!(proxy = %endpoint, "rotated proxy");
                return Ok(endpoint);
            }
        }
        Err(StealthError::ProxyUnavailable(
            "all proxies disabled".to_string(),
        ))
    }

    fn current(&self) -> Option<ProxyEndpoint> {
        let state = self.state.read();
        state
            .entries
            .get(state.cursor)
            .filter(|entry| entry.active)
            .map(|entry| entry.endpoint.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool() -> ProxyPool {
        ProxyPool::new(vec![
            ProxyEndpoint::new("10.0.0.1", 8080),
            ProxyEndpoint::new("10.0.0.2", 8080),
        ])
    }

    #[tokio::test]
    async fn rotates_round_robin() {
        let pool = pool();
        assert_eq!(pool.current().map(|p| p.id()), Some("10.0.0.1:8080".into()));
        let next = pool.rotate().await.expect("rotate");
        assert_eq!(next.id(), "10.0.0.2:8080");
        let next = pool.rotate().await.expect("rotate");
        assert_eq!(next.id(), "10.0.0.1:8080");
    }

    #[tokio::test]
    async fn disables_after_repeated_failures() {
        let pool = ProxyPool::new(vec![ProxyEndpoint::new("10.0.0.1", 8080)]);
        pool.rotate().await.expect("first rotation");
        pool.rotate().await.expect("second rotation");
        let err = pool.rotate().await.expect_err("third rotation disables");
        assert!(matches!(err, StealthError::ProxyUnavailable(_)));
        assert_eq!(pool.active_count(), 0);
        assert!(pool.current().is_none());
    }

    #[tokio::test]
    async fn empty_pool_cannot_rotate() {
        let pool = ProxyPool::default();
        assert!(pool.is_empty());
        assert!(pool.rotate().await.is_err());
        assert!(pool.random().is_none());
    }

    #[test]
    fn renders_authenticated_url() {
        let mut endpoint = ProxyEndpoint::new("proxy.test", 3128);
        endpoint.username = Some("u".into());
        endpoint.password = Some("p".into());
        assert_eq!(endpoint.url(), "http://u:p@proxy.test:3128");
    }
}
