use thiserror::Error;

/// Centralized error types for the application
///
/// All runtime errors are converted to this enum for consistent handling.
/// Uses `thiserror` for automatic error conversion and display formatting.
///
/// Authorization denials are not errors; they are `auth::Decision` values
/// handled entirely inside the gate. Startup faults use `ConfigError` from
/// `core::config` and never reach request handling.
#[derive(Error, Debug)]
pub enum AppError {
    /// A config key failed the syntax/length validator
    #[error("invalid config key: {0}")]
    InvalidKey(String),

    /// A key or record is absent
    #[error("not found: {0}")]
    NotFound(String),

    /// Input failed a semantic check (bad filter field, record without id, ...)
    #[error("validation error: {0}")]
    Validation(String),

    /// Database-related errors
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Database connection pool errors
    #[error("database pool error: {0}")]
    DatabasePool(#[from] r2d2::Error),

    /// Telegram API errors
    #[error("telegram error: {0}")]
    Telegram(#[from] teloxide::RequestError),

    /// JSON (de)serialization errors
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Task broker errors
    #[error("task broker error: {0}")]
    Broker(#[from] redis::RedisError),

    /// IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// True for the errors a conversation state recovers from by re-prompting
    /// instead of crashing the turn.
    pub fn is_user_recoverable(&self) -> bool {
        matches!(self, AppError::InvalidKey(_) | AppError::NotFound(_))
    }
}
