//! Client configuration parsed from environment variables.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::time::Duration;

pub const DEFAULT_ORIGIN: &str = "http://127.0.0.1:3000";
pub const DEFAULT_API_BASE: &str = "/api";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid origin `{0}`: expected an absolute http(s) URL")]
    InvalidOrigin(String),
    #[error("invalid API base `{0}`: expected a path starting with `/` or an absolute URL")]
    InvalidApiBase(String),
    #[error("HTTP client build failed: {0}")]
    HttpClient(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Timeouts {
    /// `POLLY_REQUEST_TIMEOUT_SECS` / `POLLY_CONNECT_TIMEOUT_SECS`, each
    /// falling back to its default when unset or not a number.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            request_secs: env_parse_u64("POLLY_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_secs: env_parse_u64("POLLY_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }

    #[must_use]
    pub fn request(&self) -> Duration {
        Duration::from_secs(self.request_secs)
    }

    #[must_use]
    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            request_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Server origin used when `api_base` is a bare path.
    pub origin: String,
    /// API base: either a path (`/api`) or an absolute URL.
    pub api_base: String,
    pub timeouts: Timeouts,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            origin: DEFAULT_ORIGIN.to_owned(),
            api_base: DEFAULT_API_BASE.to_owned(),
            timeouts: Timeouts::default(),
        }
    }
}

impl ClientConfig {
    /// Build client config from environment variables.
    ///
    /// Optional:
    /// - `POLLY_ORIGIN`: default `http://127.0.0.1:3000`
    /// - `POLLY_API_URL`: default `/api`
    /// - `POLLY_REQUEST_TIMEOUT_SECS`: default 30
    /// - `POLLY_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the origin or API base is malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let origin = std::env::var("POLLY_ORIGIN").unwrap_or_else(|_| DEFAULT_ORIGIN.to_owned());
        let api_base =
            std::env::var("POLLY_API_URL").unwrap_or_else(|_| DEFAULT_API_BASE.to_owned());
        Self::new(&origin, &api_base, Timeouts::from_env())
    }

    /// Validate and normalize an origin/base pair.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the origin is not an absolute http(s) URL
    /// or the base is neither a rooted path nor an absolute URL.
    pub fn new(origin: &str, api_base: &str, timeouts: Timeouts) -> Result<Self, ConfigError> {
        let origin = origin.trim().trim_end_matches('/').to_owned();
        if !is_http_url(&origin) || reqwest::Url::parse(&origin).is_err() {
            return Err(ConfigError::InvalidOrigin(origin));
        }

        let api_base = api_base.trim().trim_end_matches('/').to_owned();
        let base_ok = api_base.is_empty()
            || api_base.starts_with('/')
            || (is_http_url(&api_base) && reqwest::Url::parse(&api_base).is_ok());
        if !base_ok {
            return Err(ConfigError::InvalidApiBase(api_base));
        }

        Ok(Self { origin, api_base, timeouts })
    }

    /// Absolute API root: the base itself when absolute, else origin + base.
    #[must_use]
    pub fn api_root(&self) -> String {
        if is_http_url(&self.api_base) {
            self.api_base.clone()
        } else {
            format!("{}{}", self.origin, self.api_base)
        }
    }
}

fn is_http_url(raw: &str) -> bool {
    raw.starts_with("http://") || raw.starts_with("https://")
}

fn env_parse_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}
