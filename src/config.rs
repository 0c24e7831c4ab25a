//! Configuration for the search sync layer.
//!
//! # Example
//!
//! ```
//! use search_sync::SearchConfig;
//!
//! let config = SearchConfig {
//!     host: Some("http://localhost:9308".into()),
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! assert!(!config.discard_unknown_keys);
//!
//! // No host configured
//! assert!(SearchConfig::default().validate().is_err());
//! ```

use std::time::Duration;

use serde::Deserialize;

use crate::sync::SyncStrategy;
use crate::transport::SearchError;

pub const ENV_HOST: &str = "SEARCH_HOST";
pub const ENV_USERNAME: &str = "SEARCH_USERNAME";
pub const ENV_PASSWORD: &str = "SEARCH_PASSWORD";
pub const ENV_DISCARD_UNKNOWN_KEYS: &str = "DISCARD_UNKNOWN_KEYS";
pub const ENV_SYNC_STRATEGY: &str = "SEARCH_SYNC_STRATEGY";
pub const ENV_REQUEST_TIMEOUT_MS: &str = "SEARCH_REQUEST_TIMEOUT_MS";

/// Connection and behaviour settings.
///
/// Only `host` is required. Credentials are optional, but a password
/// without a username is rejected by [`SearchConfig::validate`].
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    /// Engine base URL (e.g., "http://localhost:9308"). A bare `host:port`
    /// gets `http://` prepended.
    #[serde(default)]
    pub host: Option<String>,

    /// HTTP basic auth
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,

    /// Drop unrecognised response keys instead of failing the call
    #[serde(default = "default_discard_unknown_keys")]
    pub discard_unknown_keys: bool,

    #[serde(default)]
    pub sync_strategy: SyncStrategy,

    /// Per-request timeout (unset = none)
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
}

fn default_discard_unknown_keys() -> bool { false }

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            host: None,
            username: None,
            password: None,
            discard_unknown_keys: default_discard_unknown_keys(),
            sync_strategy: SyncStrategy::default(),
            request_timeout_ms: None,
        }
    }
}

impl SearchConfig {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, SearchError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` uses the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SearchError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let discard_unknown_keys = match get(ENV_DISCARD_UNKNOWN_KEYS) {
            Some(raw) => parse_bool(&raw).ok_or_else(|| {
                SearchError::Config(format!("{} must be a boolean, got '{}'", ENV_DISCARD_UNKNOWN_KEYS, raw))
            })?,
            None => default_discard_unknown_keys(),
        };
        let sync_strategy = match get(ENV_SYNC_STRATEGY) {
            Some(raw) => raw.parse()?,
            None => SyncStrategy::default(),
        };
        let request_timeout_ms = get(ENV_REQUEST_TIMEOUT_MS)
            .map(|raw| {
                raw.trim().parse::<u64>().map_err(|_| {
                    SearchError::Config(format!("{} must be milliseconds, got '{}'", ENV_REQUEST_TIMEOUT_MS, raw))
                })
            })
            .transpose()?;

        let config = Self {
            host: get(ENV_HOST),
            username: get(ENV_USERNAME),
            password: get(ENV_PASSWORD),
            discard_unknown_keys,
            sync_strategy,
            request_timeout_ms,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check required settings and their combinations.
    pub fn validate(&self) -> Result<(), SearchError> {
        self.base_url()?;
        if self.password.is_some() && self.username.is_none() {
            return Err(SearchError::Config(format!(
                "{} is set but {} is not",
                ENV_PASSWORD, ENV_USERNAME
            )));
        }
        if self.request_timeout_ms == Some(0) {
            return Err(SearchError::Config("request timeout must be positive".into()));
        }
        Ok(())
    }

    /// Normalised base URL, without trailing slash.
    pub fn base_url(&self) -> Result<String, SearchError> {
        let host = self
            .host
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or_else(|| SearchError::Config(format!("{} is not configured", ENV_HOST)))?;
        let host = host.trim_end_matches('/');
        if host.starts_with("http://") || host.starts_with("https://") {
            Ok(host.to_string())
        } else {
            Ok(format!("http://{}", host))
        }
    }

    #[must_use]
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
