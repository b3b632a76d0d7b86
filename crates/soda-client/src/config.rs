//! Client configuration and builder pattern.

use crate::error::{Result, SodaError};
use reqwest::header::HeaderValue;
use std::fmt;
use std::time::Duration;

/// Number of rows requested by the filter convenience form when no limit is given.
pub const DEFAULT_LIMIT: i64 = 1000;

/// Configuration for a [`DatasetClient`](crate::DatasetClient).
///
/// # Security
///
/// The `Debug` implementation masks the app token to prevent accidental exposure
/// in logs. The token is shown as `"***REDACTED***"` in debug output.
#[derive(Clone)]
pub struct ClientConfig {
    /// Host (and optional port) of the SODA endpoint, e.g. "data.sfgov.org"
    pub domain: String,
    /// Application token sent as `X-App-Token`
    pub app_token: String,
    /// URL scheme, "https" unless talking to a local endpoint
    pub scheme: String,
    /// Request timeout (default: 30 seconds)
    pub timeout: Duration,
    /// User-Agent header value
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            domain: String::new(),
            app_token: String::new(),
            scheme: "https".to_string(),
            timeout: Duration::from_secs(30),
            user_agent: format!("soda-client/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("domain", &self.domain)
            .field("app_token", &"***REDACTED***")
            .field("scheme", &self.scheme)
            .field("timeout", &self.timeout)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl ClientConfig {
    /// Create a new configuration builder.
    pub fn builder(domain: impl Into<String>, app_token: impl Into<String>) -> ClientConfigBuilder {
        ClientConfigBuilder::new(domain, app_token)
    }

    /// Minimum allowed timeout value.
    pub const MIN_TIMEOUT: Duration = Duration::from_millis(100);

    /// `scheme://domain`, the prefix of every request URL.
    pub fn origin(&self) -> String {
        format!("{}://{}", self.scheme, self.domain)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.domain.is_empty() {
            return Err(SodaError::Config("domain cannot be empty".to_string()));
        }

        if self.scheme != "https" && self.scheme != "http" {
            return Err(SodaError::Config(format!(
                "scheme must be http or https, got '{}'",
                self.scheme
            )));
        }

        // The domain is a bare authority: no scheme, path, query or credentials
        let parsed = url::Url::parse(&self.origin())
            .map_err(|e| SodaError::Config(format!("Invalid domain: {}", e)))?;
        let bare = parsed.host_str().is_some()
            && parsed.path() == "/"
            && parsed.query().is_none()
            && parsed.fragment().is_none()
            && parsed.username().is_empty()
            && !self.domain.contains('/');
        if !bare {
            return Err(SodaError::Config(format!(
                "domain must be a bare host name, got '{}'",
                self.domain
            )));
        }

        if self.app_token.is_empty() {
            return Err(SodaError::Config("app_token cannot be empty".to_string()));
        }
        HeaderValue::from_str(&self.app_token)
            .map_err(|_| SodaError::Config("Invalid app token format".to_string()))?;

        if self.timeout < Self::MIN_TIMEOUT {
            return Err(SodaError::Config(format!(
                "timeout ({:?}) must be >= {:?}",
                self.timeout,
                Self::MIN_TIMEOUT
            )));
        }

        Ok(())
    }
}

/// Builder for client configuration.
#[derive(Debug)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Create a new builder for the given domain and app token.
    pub fn new(domain: impl Into<String>, app_token: impl Into<String>) -> Self {
        Self {
            config: ClientConfig {
                domain: domain.into(),
                app_token: app_token.into(),
                ..Default::default()
            },
        }
    }

    /// Talk plain HTTP instead of HTTPS (local endpoints and tests).
    pub fn insecure_http(mut self) -> Self {
        self.config.scheme = "http".to_string();
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set a custom User-Agent header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Build the configuration, validating all settings.
    pub fn build(self) -> Result<ClientConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
