//! Process configuration
//!
//! Everything is environment-driven and read exactly once at startup into an
//! explicit [`Settings`] value. A bad owner id, log level or webhook address
//! is fatal before the bot serves a single update; there is no lazy
//! re-reading of the environment inside request handling.

use std::net::SocketAddr;
use std::str::FromStr;

use thiserror::Error;

/// Default path of the SQLite database file
pub const DEFAULT_DATABASE_PATH: &str = "majordomo.sqlite";

/// Default log file path
pub const DEFAULT_LOG_FILE_PATH: &str = "majordomo.log";

/// Default bind address for the webhook listener
pub const DEFAULT_WEBHOOK_BIND: &str = "0.0.0.0:8443";

/// Feature components enabled when ENABLED_COMPONENTS is not set
pub const DEFAULT_COMPONENTS: &str = "config,friends,host";

/// Startup configuration faults. Any of these aborts the process before it
/// serves requests.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("OWNER_ID is not set")]
    OwnerIdMissing,

    #[error("OWNER_ID is not a numeric Telegram id: {0}")]
    OwnerIdInvalid(String),

    #[error("BOT_TOKEN is not set")]
    BotTokenMissing,

    #[error("LOG_LEVEL is not a valid level: {0}")]
    LogLevelInvalid(String),

    #[error("failed to open log file {path}: {source}")]
    LogFile {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to initialize logger: {0}")]
    Logger(String),

    #[error("WEBHOOK_URL is not a valid URL: {0}")]
    WebhookUrlInvalid(String),

    #[error("WEBHOOK_BIND is not a host:port address: {0}")]
    WebhookBindInvalid(String),

    #[error("unknown component in ENABLED_COMPONENTS: {0}")]
    UnknownComponent(String),

    #[error("duplicate command /{0} across enabled components")]
    DuplicateCommand(String),
}

/// Webhook endpoint configuration. Present only when WEBHOOK_URL is set;
/// otherwise the bot falls back to long polling.
#[derive(Debug, Clone)]
pub struct WebhookSettings {
    /// Public HTTPS URL Telegram delivers updates to. The unguessable path
    /// segment doubles as the endpoint token: anything else is answered 404.
    pub public_url: String,
    /// Local address the axum listener binds to
    pub bind: SocketAddr,
}

/// Validated process configuration
#[derive(Debug, Clone)]
pub struct Settings {
    /// The single privileged user id; bypasses the friends whitelist
    pub owner_id: i64,
    /// Telegram Bot API token
    pub bot_token: String,
    /// Path to the SQLite database file
    pub database_path: String,
    /// Path of the log file
    pub log_file_path: String,
    /// Level for both terminal and file logging
    pub log_level: log::LevelFilter,
    /// Webhook endpoint, or None for long polling
    pub webhook: Option<WebhookSettings>,
    /// Enabled feature components, in registration order
    pub components: Vec<String>,
    /// Redis URL of the task broker; task submission is disabled when unset
    pub broker_url: Option<String>,
}

impl Settings {
    /// Reads and validates configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through an arbitrary lookup function. Tests inject
    /// a map here instead of mutating the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let owner_raw = lookup("OWNER_ID").ok_or(ConfigError::OwnerIdMissing)?;
        let owner_id = owner_raw
            .trim()
            .parse::<i64>()
            .map_err(|_| ConfigError::OwnerIdInvalid(owner_raw.clone()))?;

        let bot_token = lookup("BOT_TOKEN")
            .filter(|token| !token.trim().is_empty())
            .ok_or(ConfigError::BotTokenMissing)?;

        let database_path =
            lookup("DATABASE_PATH").unwrap_or_else(|| DEFAULT_DATABASE_PATH.to_string());
        let log_file_path =
            lookup("LOG_FILE_PATH").unwrap_or_else(|| DEFAULT_LOG_FILE_PATH.to_string());

        let level_raw = lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string());
        let log_level = log::LevelFilter::from_str(level_raw.trim())
            .map_err(|_| ConfigError::LogLevelInvalid(level_raw.clone()))?;

        let webhook = match lookup("WEBHOOK_URL") {
            Some(raw_url) if !raw_url.trim().is_empty() => {
                let public_url = raw_url.trim().to_string();
                url::Url::parse(&public_url)
                    .map_err(|_| ConfigError::WebhookUrlInvalid(public_url.clone()))?;
                let bind_raw =
                    lookup("WEBHOOK_BIND").unwrap_or_else(|| DEFAULT_WEBHOOK_BIND.to_string());
                let bind = bind_raw
                    .trim()
                    .parse::<SocketAddr>()
                    .map_err(|_| ConfigError::WebhookBindInvalid(bind_raw.clone()))?;
                Some(WebhookSettings { public_url, bind })
            }
            _ => None,
        };

        let components_raw =
            lookup("ENABLED_COMPONENTS").unwrap_or_else(|| DEFAULT_COMPONENTS.to_string());
        let components: Vec<String> = components_raw
            .split(',')
            .map(|part| part.trim().to_ascii_lowercase())
            .filter(|part| !part.is_empty())
            .collect();

        let broker_url = lookup("BROKER_URL").filter(|u| !u.trim().is_empty());

        Ok(Settings {
            owner_id,
            bot_token,
            database_path,
            log_file_path,
            log_level,
            webhook,
            components,
            broker_url,
        })
    }
}
