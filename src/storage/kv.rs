//! Key-value configuration store
//!
//! A thin, validated mapping over the `config` table. Keys are dotted
//! lowercase identifiers; a key either has exactly one value or does not
//! exist. Every mutating call commits immediately; no transaction spans
//! more than one key.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::{OptionalExtension, params};

use crate::core::error::{AppError, AppResult};
use crate::core::utils::truncate_for_log;
use crate::storage::db::{DbPool, get_connection};

/// Maximum accepted key length
pub const MAX_KEY_LEN: usize = 16;

/// Dotted lowercase identifier: one or more `[a-z]+` segments joined by dots
static KEY_RE: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^([a-z]+\.)*[a-z]+$").expect("key regex is valid")
});

/// Validates a config key against the syntax and length rules.
///
/// Runs before any table lookup, so an invalid key fails the same way
/// whether or not it happens to exist.
pub fn validate_key(key: &str) -> AppResult<()> {
    if key.len() > MAX_KEY_LEN || !KEY_RE.is_match(key) {
        return Err(AppError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// Validated key-value persistence over the `config` table
#[derive(Clone)]
pub struct KeyValueStore {
    pool: Arc<DbPool>,
}

impl KeyValueStore {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }

    /// Returns the value stored under `key`.
    pub fn get(&self, key: &str) -> AppResult<String> {
        validate_key(key)?;
        let conn = get_connection(&self.pool)?;
        let value: Option<String> = conn
            .query_row(
                "SELECT value FROM config WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        match value {
            Some(value) => {
                log::debug!("config get {} -> {}", key, truncate_for_log(&value));
                Ok(value)
            }
            None => Err(AppError::NotFound(format!("config key {key}"))),
        }
    }

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// Observable as either an INSERT or an UPDATE; the post-condition is the
    /// same: exactly one row for the key, holding the new value.
    pub fn set(&self, key: &str, value: &str) -> AppResult<()> {
        validate_key(key)?;
        let conn = get_connection(&self.pool)?;
        conn.execute(
            "INSERT INTO config (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        log::debug!("config set {} = {}", key, truncate_for_log(value));
        Ok(())
    }

    /// Removes `key`. Deleting an absent key is an error.
    pub fn delete(&self, key: &str) -> AppResult<()> {
        validate_key(key)?;
        let conn = get_connection(&self.pool)?;
        let removed = conn.execute("DELETE FROM config WHERE key = ?1", params![key])?;
        if removed == 0 {
            return Err(AppError::NotFound(format!("config key {key}")));
        }
        log::debug!("config del {}", key);
        Ok(())
    }

    /// Number of stored entries.
    pub fn len(&self) -> AppResult<usize> {
        let conn = get_connection(&self.pool)?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM config", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> AppResult<bool> {
        Ok(self.len()? == 0)
    }

    /// All stored keys, in unspecified order. Restartable by calling again.
    pub fn keys(&self) -> AppResult<Vec<String>> {
        let conn = get_connection(&self.pool)?;
        let mut stmt = conn.prepare("SELECT key FROM config")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut keys = Vec::new();
        for row in rows {
            keys.push(row?);
        }
        log::debug!("config keys: {} entries", keys.len());
        Ok(keys)
    }
}
