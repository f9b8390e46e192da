//! # Service Configuration
//!
//! Layered configuration for the relay service. Every field carries a serde
//! default, so an empty environment yields a valid config except for the
//! chat bot token, which `validate` insists on.

use serde::{Deserialize, Serialize};

/// Top-level service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayConfig {
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Webhook ingestion settings
    #[serde(default)]
    pub webhook: WebhookConfig,

    /// Activity-feed polling settings
    #[serde(default)]
    pub polling: PollingConfig,

    /// Subscription storage settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Chat platform settings
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Repository platform settings
    #[serde(default)]
    pub github: GithubConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// Webhook ingestion configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Shared secret for signature validation; unset disables validation
    #[serde(default)]
    pub secret: Option<String>,
}

/// Polling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Whether the polling path runs at all
    pub enabled: bool,

    /// Delay between polling ticks in seconds
    pub interval_seconds: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_seconds: 60,
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Retention window for message identities in seconds
    pub identity_retention_seconds: i64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            identity_retention_seconds: 86_400,
        }
    }
}

/// Telegram Bot API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Bot token issued by BotFather; required
    pub bot_token: String,

    /// API base URL, overridable for tests
    pub api_base: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            api_base: "https://api.telegram.org".to_string(),
        }
    }
}

/// GitHub API configuration for the polling path
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GithubConfig {
    /// Personal access token; unset polls anonymously at a lower rate limit
    #[serde(default)]
    pub token: Option<String>,

    /// API base URL, overridable for tests and GitHub Enterprise
    pub api_base: String,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_base: "https://api.github.com".to_string(),
        }
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}

impl RelayConfig {
    /// Load configuration from layered sources.
    ///
    /// Sources (applied in order, later sources override earlier ones):
    ///  1. /etc/repo-relay/service.yaml       system-wide defaults
    ///  2. ./config/service.yaml              deployment-local override
    ///  3. Path given by RELAY_CONFIG_FILE    operator-specified file
    ///  4. Environment variables prefixed RELAY__ (double-underscore
    ///     separator), e.g. RELAY__SERVER__PORT=9090 sets server.port
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder()
            .add_source(
                config::File::with_name("/etc/repo-relay/service")
                    .required(false)
                    .format(config::FileFormat::Yaml),
            )
            .add_source(
                config::File::with_name("config/service")
                    .required(false)
                    .format(config::FileFormat::Yaml),
            );

        if let Ok(explicit_path) = std::env::var("RELAY_CONFIG_FILE") {
            if !explicit_path.is_empty() {
                builder = builder.add_source(
                    config::File::with_name(&explicit_path)
                        .required(true)
                        .format(config::FileFormat::Yaml),
                );
            }
        }

        let raw = builder
            .add_source(config::Environment::with_prefix("RELAY").separator("__"))
            .build()
            .map_err(|e| ConfigError::Invalid {
                message: e.to_string(),
            })?;

        raw.try_deserialize().map_err(|e| ConfigError::Invalid {
            message: e.to_string(),
        })
    }

    /// Check operational invariants that serde defaults cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.telegram.bot_token.is_empty() {
            return Err(ConfigError::Invalid {
                message: "telegram.bot_token must be set".to_string(),
            });
        }

        if self.polling.enabled && self.polling.interval_seconds == 0 {
            return Err(ConfigError::Invalid {
                message: "polling.interval_seconds must be at least 1".to_string(),
            });
        }

        if self.storage.identity_retention_seconds <= 0 {
            return Err(ConfigError::Invalid {
                message: "storage.identity_retention_seconds must be positive".to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
