//! Core utilities: configuration, errors, logging

pub mod config;
pub mod error;
pub mod logging;
pub mod utils;

pub use config::{ConfigError, Settings};
pub use error::{AppError, AppResult};
pub use logging::init_logger;
pub use utils::truncate_for_log;
