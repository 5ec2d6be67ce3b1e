//! Client configuration parsed from environment variables.
//!
//! DESIGN
//! ======
//! Every knob has a default so a bare environment talks to a local backend.
//! Timeouts are opt-in: when unset, requests wait for the first response or
//! error.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::time::Duration;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8080";
pub const DEFAULT_PAGE_SIZE: u32 = 4;

/// Errors produced while reading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A configuration value could not be parsed.
    #[error("config parse failed: {0}")]
    Parse(String),
}

/// Typed client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Backend base URL without a trailing slash.
    pub base_url: String,
    /// Number of posts requested per page.
    pub page_size: u32,
    /// Whole-request timeout, if any.
    pub request_timeout: Option<Duration>,
    /// TCP connect timeout, if any.
    pub connect_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BACKEND_URL.to_owned(),
            page_size: DEFAULT_PAGE_SIZE,
            request_timeout: None,
            connect_timeout: None,
        }
    }
}

impl ClientConfig {
    /// Build typed client config from environment variables.
    ///
    /// Optional:
    /// - `BLOG_BACKEND_URL`: default `http://localhost:8080`
    /// - `BLOG_PAGE_SIZE`: default 4, must be greater than 0
    /// - `BLOG_REQUEST_TIMEOUT_SECS`: unset means no timeout
    /// - `BLOG_CONNECT_TIMEOUT_SECS`: unset means no timeout
    ///
    /// # Errors
    ///
    /// Returns an error if a value is present but malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = match std::env::var("BLOG_BACKEND_URL") {
            Ok(raw) => normalize_base_url(&raw)?,
            Err(_) => DEFAULT_BACKEND_URL.to_owned(),
        };

        let page_size = match std::env::var("BLOG_PAGE_SIZE") {
            Ok(raw) => parse_page_size(&raw)?,
            Err(_) => DEFAULT_PAGE_SIZE,
        };

        Ok(Self {
            base_url,
            page_size,
            request_timeout: env_secs("BLOG_REQUEST_TIMEOUT_SECS")?,
            connect_timeout: env_secs("BLOG_CONNECT_TIMEOUT_SECS")?,
        })
    }

    /// Replace the backend URL, applying the same validation as `from_env`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is not an `http(s)` URL.
    pub fn with_base_url(mut self, raw: &str) -> Result<Self, ConfigError> {
        self.base_url = normalize_base_url(raw)?;
        Ok(self)
    }
}

/// Trim whitespace and trailing slashes; reject anything that is not `http(s)`.
pub(crate) fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ConfigError::Parse(format!("BLOG_BACKEND_URL must be an http(s) URL, got '{raw}'")));
    }
    Ok(trimmed.to_owned())
}

fn parse_page_size(raw: &str) -> Result<u32, ConfigError> {
    match raw.trim().parse::<u32>() {
        Ok(0) => Err(ConfigError::Parse("BLOG_PAGE_SIZE must be greater than 0".into())),
        Ok(size) => Ok(size),
        Err(_) => Err(ConfigError::Parse(format!("BLOG_PAGE_SIZE is not a number: '{raw}'"))),
    }
}

fn env_secs(key: &str) -> Result<Option<Duration>, ConfigError> {
    let Ok(raw) = std::env::var(key) else {
        return Ok(None);
    };
    raw.trim()
        .parse::<u64>()
        .map(|secs| Some(Duration::from_secs(secs)))
        .map_err(|_| ConfigError::Parse(format!("{key} is not a number of seconds: '{raw}'")))
}
