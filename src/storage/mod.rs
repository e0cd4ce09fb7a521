//! Database access: pool, migrations, key-value store, record persistence

pub mod db;
pub mod kv;
pub mod migrations;
pub mod record;

// Re-exports for convenience
pub use db::{DbConnection, DbPool, create_pool, get_connection};
pub use kv::{KeyValueStore, validate_key};
pub use migrations::run_migrations;
pub use record::{FieldSpec, Record, RelationStore};
