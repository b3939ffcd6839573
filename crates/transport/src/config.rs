//! Backend connection settings, read once at startup.

use std::time::Duration;

use contract::ConfigError;
use reqwest::Url;
use tracing::{info, warn};

/// Environment variable holding the backend base URL.
pub const BACKEND_URL_VAR: &str = "BACKEND_URL";
/// Older name of [`BACKEND_URL_VAR`], still honoured when the new one is unset.
pub const LEGACY_BACKEND_URL_VAR: &str = "NEXT_PUBLIC_BAKEND_URL";
/// Environment variable holding an optional request timeout, in whole seconds.
pub const BACKEND_TIMEOUT_VAR: &str = "BACKEND_TIMEOUT_SECS";

/// Connection settings for [`crate::HttpRequestExecutor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpConfig {
    base_url: String,
    timeout: Option<Duration>,
    user_agent: String,
}

impl HttpConfig {
    /// Creates a configuration for the given base URL.
    ///
    /// The URL must be absolute and use `http` or `https`. A trailing `/` is
    /// dropped so that endpoints, which start with `/`, can be appended as is.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the URL is malformed or uses another
    /// scheme.
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        let trimmed = base_url.trim().trim_end_matches('/');
        let parsed = Url::parse(trimmed).map_err(|e| ConfigError::Invalid {
            key: BACKEND_URL_VAR.to_owned(),
            message: format!("'{trimmed}' is not a valid URL: {e}"),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid {
                key: BACKEND_URL_VAR.to_owned(),
                message: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }

        Ok(Self {
            base_url: trimmed.to_owned(),
            timeout: None,
            user_agent: concat!("querycontext/", env!("CARGO_PKG_VERSION")).to_owned(),
        })
    }

    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, which maps a variable name to
    /// its value.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::Missing`] when no base URL is set.
    /// - [`ConfigError::Invalid`] when the base URL or timeout cannot be used.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let base_url = match non_empty(BACKEND_URL_VAR) {
            Some(url) => url,
            None => {
                let url = non_empty(LEGACY_BACKEND_URL_VAR).ok_or_else(|| ConfigError::Missing {
                    key: BACKEND_URL_VAR.to_owned(),
                })?;
                warn!("{LEGACY_BACKEND_URL_VAR} is deprecated, set {BACKEND_URL_VAR} instead");
                url
            }
        };

        let mut config = Self::new(&base_url)?;

        if let Some(raw) = non_empty(BACKEND_TIMEOUT_VAR) {
            let secs: u64 = raw.trim().parse().map_err(|e| ConfigError::Invalid {
                key: BACKEND_TIMEOUT_VAR.to_owned(),
                message: format!("'{raw}' is not a whole number of seconds: {e}"),
            })?;
            config = config.with_timeout(Duration::from_secs(secs))?;
        }

        info!(base_url = %config.base_url, timeout = ?config.timeout, "HTTP configuration loaded");
        Ok(config)
    }

    /// Applies a whole-request timeout. Without one the transport defaults apply.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a zero timeout, which would fail
    /// every request before it is sent.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, ConfigError> {
        if timeout.is_zero() {
            return Err(ConfigError::Invalid {
                key: BACKEND_TIMEOUT_VAR.to_owned(),
                message: "timeout must be positive".to_owned(),
            });
        }
        self.timeout = Some(timeout);
        Ok(self)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }
}
