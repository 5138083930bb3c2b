//! crates/storywriter_client/src/config.rs
//!
//! Settings of the client library, loaded from the environment.

use std::{path::PathBuf, time::Duration};

pub const DEFAULT_PROXY_URL: &str = "http://localhost:3001";

/// Tuning of the generation client and where local state lives.
#[derive(Clone, Debug)]
pub struct ClientSettings {
    /// Base URL of the backend proxy, without a trailing slash.
    pub proxy_url: String,
    /// Pause after each queued request before the next one is started.
    pub rate_limit_delay: Duration,
    /// Abort an attempt after this long.
    pub request_timeout: Duration,
    /// Extra attempts allowed for network-class failures.
    pub max_retries: u32,
    /// Pause before a retry.
    pub retry_backoff: Duration,
    /// Directory for the file-backed local store. `None` keeps state in memory.
    pub data_dir: Option<PathBuf>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            proxy_url: DEFAULT_PROXY_URL.to_string(),
            rate_limit_delay: Duration::from_millis(1000),
            request_timeout: Duration::from_millis(20_000),
            max_retries: 1,
            retry_backoff: Duration::from_millis(500),
            data_dir: None,
        }
    }
}

impl ClientSettings {
    /// Reads `STORYWRITER_PROXY_URL` and `STORYWRITER_DATA_DIR`, keeping the
    /// defaults for everything else.
    pub fn from_env() -> Self {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let proxy_url = lookup("STORYWRITER_PROXY_URL")
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or(defaults.proxy_url);
        let data_dir = lookup("STORYWRITER_DATA_DIR")
            .filter(|dir| !dir.trim().is_empty())
            .map(PathBuf::from);

        Self {
            proxy_url,
            data_dir,
            ..defaults
        }
    }

    /// Short delays for tests and local tooling.
    pub fn fast(proxy_url: impl Into<String>) -> Self {
        Self {
            proxy_url: proxy_url.into().trim_end_matches('/').to_string(),
            rate_limit_delay: Duration::from_millis(10),
            request_timeout: Duration::from_millis(500),
            retry_backoff: Duration::from_millis(10),
            ..Self::default()
        }
    }
}
