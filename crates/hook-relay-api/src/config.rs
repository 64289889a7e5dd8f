//! Configuration types for the HTTP service
//!
//! Sources are layered with the `config` crate, later sources winning:
//!
//! 1. `/etc/hook-relay/relay.toml` (optional)
//! 2. `config/relay.toml` relative to the working directory (optional)
//! 3. An explicit file passed by the operator (required when given)
//! 4. Environment variables prefixed `RELAY__`, nested with `__`,
//!    e.g. `RELAY__SINK__URL` or `RELAY__WEBHOOK__SECRET`
//!
//! Every field has a default except the webhook secret and the sink URL, which
//! [`RelayConfig::validate`] insists on.

use crate::errors::ConfigError;
use hook_relay_core::{SignatureAlgorithm, WebhookSecret};
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "RELAY";

const SYSTEM_CONFIG_FILE: &str = "/etc/hook-relay/relay";
const LOCAL_CONFIG_FILE: &str = "config/relay";

/// Complete relay configuration, built once at startup and never mutated.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RelayConfig {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Inbound webhook settings
    pub webhook: WebhookConfig,

    /// Outbound chat bot settings
    pub sink: SinkConfig,

    /// Deployment environment
    pub environment: Environment,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl RelayConfig {
    /// Load configuration from the layered sources described in the module docs.
    ///
    /// Does not validate; call [`RelayConfig::validate`] on the result.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder()
            .add_source(
                config::File::with_name(SYSTEM_CONFIG_FILE)
                    .required(false)
                    .format(config::FileFormat::Toml),
            )
            .add_source(
                config::File::with_name(LOCAL_CONFIG_FILE)
                    .required(false)
                    .format(config::FileFormat::Toml),
            );

        if let Some(path) = explicit_path {
            builder = builder.add_source(
                config::File::from(path)
                    .required(true)
                    .format(config::FileFormat::Toml),
            );
        }

        let config = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Reject configurations the relay cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.webhook.secret.is_empty() {
            return Err(ConfigError::Missing {
                key: "webhook.secret".to_string(),
            });
        }

        if !self.webhook.endpoint_path.starts_with('/') {
            return Err(ConfigError::Invalid {
                message: format!(
                    "webhook.endpoint_path must start with '/', got '{}'",
                    self.webhook.endpoint_path
                ),
            });
        }

        self.sink_url()?;

        if self.server.max_body_size == 0 {
            return Err(ConfigError::Invalid {
                message: "server.max_body_size must be greater than zero".to_string(),
            });
        }

        Ok(())
    }

    /// Parsed sink URL. Only `http` and `https` are accepted.
    pub fn sink_url(&self) -> Result<Url, ConfigError> {
        if self.sink.url.is_empty() {
            return Err(ConfigError::Missing {
                key: "sink.url".to_string(),
            });
        }

        // Never echo the URL itself; it carries the bot key.
        let url = Url::parse(&self.sink.url).map_err(|e| ConfigError::Invalid {
            message: format!("sink.url is not a valid URL: {}", e),
        })?;

        match url.scheme() {
            "http" | "https" => Ok(url),
            scheme => Err(ConfigError::Invalid {
                message: format!("sink.url must use http or https, got '{}'", scheme),
            }),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,

    /// Maximum request size in bytes
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            shutdown_timeout_seconds: 30,
            max_body_size: 5 * 1024 * 1024, // 5MB
        }
    }
}

/// Inbound webhook configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// Webhook endpoint path
    pub endpoint_path: String,

    /// Secret configured on the GitHub webhook
    pub secret: WebhookSecret,

    /// Signature algorithm; `sha1` matches the legacy `X-Hub-Signature` header
    pub algorithm: SignatureAlgorithm,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            endpoint_path: "/webhook".to_string(),
            secret: WebhookSecret::default(),
            algorithm: SignatureAlgorithm::Sha1,
        }
    }
}

/// Outbound chat bot configuration
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    /// Bot webhook URL, including its key
    pub url: String,

    /// Request timeout in seconds
    pub timeout_seconds: u64,

    /// User-Agent sent to the bot
    pub user_agent: String,
}

impl SinkConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            timeout_seconds: 10,
            user_agent: format!("hook-relay/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl fmt::Debug for SinkConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinkConfig")
            .field("url", &"<REDACTED>")
            .field("timeout_seconds", &self.timeout_seconds)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

/// Deployment environment. `dev` exposes the API description endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[serde(alias = "development")]
    Dev,

    #[default]
    #[serde(alias = "prod")]
    Production,
}

impl Environment {
    pub fn exposes_docs(&self) -> bool {
        matches!(self, Self::Dev)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dev => "dev",
            Self::Production => "production",
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,

    /// Enable JSON structured logging
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
