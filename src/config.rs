//! Configuration module for loading and parsing TOML configuration files.

use optionshouse_client::{ClientConfig, DEFAULT_REMOTE_HOST};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse TOML configuration.
    #[error("failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    /// Invalid configuration value.
    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Login credentials.
    pub credentials: CredentialsConfig,
    /// Session behavior.
    #[serde(default)]
    pub client: SessionConfig,
    /// Log output.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Login credentials.
#[derive(Clone, Deserialize)]
pub struct CredentialsConfig {
    /// Login name.
    pub username: String,
    /// Login password. May instead be supplied on the command line.
    #[serde(default)]
    pub password: Option<String>,
    /// Token from an earlier login.
    #[serde(default)]
    pub auth_token: Option<String>,
}

impl std::fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialsConfig")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("auth_token", &self.auth_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Session behavior.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Base URL of the API.
    pub remote_host: String,
    /// Return server-reported errors as failures.
    pub raise_errors: bool,
    /// Skip the spacing between requests.
    pub fast_api: bool,
    /// Spacing between requests in milliseconds.
    pub min_request_interval_ms: u64,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Disable TLS certificate verification.
    pub accept_invalid_certs: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            remote_host: DEFAULT_REMOTE_HOST.to_string(),
            raise_errors: true,
            fast_api: false,
            min_request_interval_ms: 1000,
            timeout_secs: 30,
            accept_invalid_certs: false,
        }
    }
}

/// Log level names.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Request and response flow.
    Debug,
    /// Connects and logins.
    #[default]
    Info,
    /// Re-authentication and other recoverable events.
    Warn,
    /// Failures.
    Error,
    /// Same as `error`.
    Critical,
}

impl LogLevel {
    /// Directive for `tracing_subscriber::EnvFilter`.
    #[must_use]
    pub const fn as_filter(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error | Self::Critical => "error",
        }
    }
}

/// Log output configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Minimum level, overridden by `RUST_LOG`.
    pub level: LogLevel,
}

impl Config {
    /// Loads configuration from a TOML file.
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file.
    ///
    /// # Errors
    /// Returns error if file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Arguments
    /// * `content` - TOML content as string.
    ///
    /// # Errors
    /// Returns error if content cannot be parsed.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Builds the session configuration.
    ///
    /// # Arguments
    /// * `password` - Password taking precedence over the file's.
    ///
    /// # Errors
    /// Returns error if no password is available.
    pub fn client_config(&self, password: Option<&str>) -> Result<ClientConfig, ConfigError> {
        let password = password
            .or(self.credentials.password.as_deref())
            .filter(|p| !p.is_empty())
            .ok_or_else(|| ConfigError::InvalidValue("no password configured".to_string()))?;

        Ok(ClientConfig {
            username: self.credentials.username.clone(),
            password: password.to_string(),
            auth_token: self.credentials.auth_token.clone(),
            remote_host: self.client.remote_host.clone(),
            raise_errors: self.client.raise_errors,
            fast_api: self.client.fast_api,
            min_request_interval: Duration::from_millis(self.client.min_request_interval_ms),
            timeout: Duration::from_secs(self.client.timeout_secs),
            accept_invalid_certs: self.client.accept_invalid_certs,
        })
    }

    /// Validates the configuration values.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.credentials.username.is_empty() {
            return Err(ConfigError::InvalidValue(
                "username cannot be empty".to_string(),
            ));
        }
        if self.client.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "timeout_secs must be positive".to_string(),
            ));
        }
        let host = &self.client.remote_host;
        if !(host.starts_with("https://") || host.starts_with("http://")) {
            return Err(ConfigError::InvalidValue(format!(
                "remote_host {} must be an http(s) URL",
                host
            )));
        }

        Ok(())
    }
}
