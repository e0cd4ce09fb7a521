//! Generic record persistence
//!
//! Schema-driven storage for typed records over per-type tables. Each record
//! type declares its table name, an ordered field list and its own row
//! (de)serialization, no runtime reflection. Tables are created idempotently
//! on first use; every table gets an autoincrementing integer `id` primary
//! key in addition to the declared fields.

use std::sync::Arc;

use rusqlite::types::Value;
use rusqlite::{OptionalExtension, Row, params, params_from_iter};

use crate::core::error::{AppError, AppResult};
use crate::storage::db::{DbPool, get_connection};

/// One declared field of a record type: column name, SQL type, optional
/// DEFAULT clause (SQL literal, e.g. `'queued'`).
pub struct FieldSpec {
    pub name: &'static str,
    pub sql_type: &'static str,
    pub default: Option<&'static str>,
}

/// Contract every persistable record type provides.
///
/// `values()` and `from_row()` must agree with `FIELDS` on order; `from_row`
/// reads column 0 as the id followed by the declared fields.
pub trait Record: Sized {
    /// Backing table name, snake_case of the type name
    const TABLE: &'static str;
    /// Ordered field list
    const FIELDS: &'static [FieldSpec];

    fn id(&self) -> Option<i64>;
    fn set_id(&mut self, id: i64);

    /// Field values in `FIELDS` order
    fn values(&self) -> Vec<Value>;

    /// Decodes a row shaped `id, field...` in `FIELDS` order
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;
}

fn column_list<R: Record>() -> String {
    R::FIELDS
        .iter()
        .map(|field| field.name)
        .collect::<Vec<_>>()
        .join(", ")
}

fn placeholders(count: usize) -> String {
    (1..=count)
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Record persistence over the connection pool
#[derive(Clone)]
pub struct RelationStore {
    pool: Arc<DbPool>,
}

impl RelationStore {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }

    /// Ensures the backing table for `R` exists. Idempotent; runs before any
    /// other operation on the type.
    pub fn ensure_table<R: Record>(&self) -> AppResult<()> {
        let columns = R::FIELDS
            .iter()
            .map(|field| match field.default {
                Some(default) => format!("{} {} DEFAULT {}", field.name, field.sql_type, default),
                None => format!("{} {}", field.name, field.sql_type),
            })
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (id INTEGER PRIMARY KEY AUTOINCREMENT, {})",
            R::TABLE,
            columns
        );
        let conn = get_connection(&self.pool)?;
        conn.execute(&sql, [])?;
        Ok(())
    }

    /// Loads the record with the given id.
    pub fn load<R: Record>(&self, id: i64) -> AppResult<R> {
        self.ensure_table::<R>()?;
        let sql = format!(
            "SELECT id, {} FROM {} WHERE id = ?1",
            column_list::<R>(),
            R::TABLE
        );
        let conn = get_connection(&self.pool)?;
        let record = conn.query_row(&sql, params![id], |row| R::from_row(row)).optional()?;
        record.ok_or_else(|| AppError::NotFound(format!("missing {} record {}", R::TABLE, id)))
    }

    /// Persists the record: inserts when it has no id, updates otherwise.
    ///
    /// If the record carries an id but its row no longer exists (deleted
    /// concurrently), it is re-inserted under a fresh autogenerated id; the
    /// original id is NOT preserved. Logged as a warning; kept as-is because
    /// ids are assumed never to be revoked externally mid-session.
    pub fn commit<R: Record>(&self, record: &mut R) -> AppResult<()> {
        self.ensure_table::<R>()?;
        if let Some(id) = record.id() {
            let assignments = R::FIELDS
                .iter()
                .enumerate()
                .map(|(i, field)| format!("{} = ?{}", field.name, i + 1))
                .collect::<Vec<_>>()
                .join(", ");
            let sql = format!(
                "UPDATE {} SET {} WHERE id = ?{}",
                R::TABLE,
                assignments,
                R::FIELDS.len() + 1
            );
            let mut values = record.values();
            values.push(Value::Integer(id));
            let conn = get_connection(&self.pool)?;
            let updated = conn.execute(&sql, params_from_iter(values))?;
            if updated > 0 {
                log::debug!("{} record {} updated", R::TABLE, id);
                return Ok(());
            }
            log::warn!(
                "{} record {} vanished from its table, re-inserting with a new id",
                R::TABLE,
                id
            );
        }
        self.insert(record)
    }

    fn insert<R: Record>(&self, record: &mut R) -> AppResult<()> {
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            R::TABLE,
            column_list::<R>(),
            placeholders(R::FIELDS.len())
        );
        let conn = get_connection(&self.pool)?;
        conn.execute(&sql, params_from_iter(record.values()))?;
        let id = conn.last_insert_rowid();
        record.set_id(id);
        log::debug!("{} record {} inserted", R::TABLE, id);
        Ok(())
    }

    /// Deletes the record's row. A record that was never committed has no id
    /// and cannot be deleted.
    pub fn delete<R: Record>(&self, record: &R) -> AppResult<()> {
        let Some(id) = record.id() else {
            return Err(AppError::Validation(format!(
                "cannot delete a {} record without an id",
                R::TABLE
            )));
        };
        self.ensure_table::<R>()?;
        let sql = format!("DELETE FROM {} WHERE id = ?1", R::TABLE);
        let conn = get_connection(&self.pool)?;
        let removed = conn.execute(&sql, params![id])?;
        log::debug!("{} record {} deleted ({} rows)", R::TABLE, id, removed);
        Ok(())
    }

    /// All records of the type, fully materialized.
    pub fn all<R: Record>(&self) -> AppResult<Vec<R>> {
        self.select::<R>(&[])
    }

    /// Records matching the given equality filters (AND-combined), fully
    /// materialized. Filter names must be declared fields.
    pub fn select<R: Record>(&self, filters: &[(&str, Value)]) -> AppResult<Vec<R>> {
        self.ensure_table::<R>()?;
        for (name, _) in filters {
            if !R::FIELDS.iter().any(|field| field.name == *name) {
                return Err(AppError::Validation(format!(
                    "unknown field {} on {}",
                    name,
                    R::TABLE
                )));
            }
        }
        let mut sql = format!("SELECT id, {} FROM {}", column_list::<R>(), R::TABLE);
        if !filters.is_empty() {
            let clauses = filters
                .iter()
                .enumerate()
                .map(|(i, (name, _))| format!("{} = ?{}", name, i + 1))
                .collect::<Vec<_>>()
                .join(" AND ");
            sql.push_str(" WHERE ");
            sql.push_str(&clauses);
        }
        let conn = get_connection(&self.pool)?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params_from_iter(filters.iter().map(|(_, value)| value.clone())),
            |row| R::from_row(row),
        )?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }
}
