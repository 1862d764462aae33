mod agent_repository;
mod models;
mod task_repository;

use crate::constants::DB_CONNECTION_TIMEOUT;
use crate::errors::StoreError;
use diesel::connection::SimpleConnection;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel::sqlite::SqliteConnection;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub use agent_repository::*;
pub use task_repository::*;

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS agents (
    id TEXT PRIMARY KEY NOT NULL,
    name TEXT NOT NULL,
    role TEXT NOT NULL,
    system_prompt TEXT NOT NULL,
    model TEXT NOT NULL,
    capabilities TEXT NOT NULL,
    functions TEXT NOT NULL,
    created_date TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS tasks (
    id TEXT PRIMARY KEY NOT NULL,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    status TEXT NOT NULL,
    result TEXT,
    agent_id TEXT NOT NULL,
    parent_task_id TEXT,
    output_format TEXT NOT NULL,
    created_date TEXT NOT NULL,
    updated_date TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS tasks_agent_id ON tasks (agent_id);
";

pub type DbConnection = PooledConnection<ConnectionManager<SqliteConnection>>;

/// Sort order for list queries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Newest `created_date` first
    #[default]
    NewestFirst,
    OldestFirst,
}

/// Handle to the local SQLite store
#[derive(Clone, Debug)]
pub struct Database {
    pool: Arc<Pool<ConnectionManager<SqliteConnection>>>,
}

impl Database {
    /// Opens (creating if needed) the database at `db_path` and its tables.
    ///
    /// The pool holds a single connection: the store is local and
    /// single-user, and SQLite serializes writers anyway. A caller waiting
    /// for that connection gives up after [`DB_CONNECTION_TIMEOUT`].
    pub fn open(db_path: &str) -> Result<Self, StoreError> {
        Self::open_with_timeout(db_path, DB_CONNECTION_TIMEOUT)
    }

    fn open_with_timeout(db_path: &str, connection_timeout: Duration) -> Result<Self, StoreError> {
        let manager = ConnectionManager::<SqliteConnection>::new(db_path);
        let pool = Pool::builder()
            .max_size(1)
            .connection_timeout(connection_timeout)
            .build(manager)?;
        let database = Database {
            pool: Arc::new(pool),
        };
        database.get_conn()?.batch_execute(SCHEMA_SQL)?;
        info!("Opened database at {}", db_path);
        Ok(database)
    }

    /// Database living only as long as this handle
    #[cfg(test)]
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::open(":memory:")
    }

    pub fn get_conn(&self) -> Result<DbConnection, StoreError> {
        Ok(self.pool.get()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn busy_connection_times_out() {
        let db = Database::open_with_timeout(":memory:", Duration::from_millis(50)).unwrap();
        let held = db.get_conn().unwrap();

        let started = Instant::now();
        let err = match db.get_conn() {
            Err(e) => e,
            Ok(_) => panic!("called `Result::unwrap_err()` on an `Ok` value"),
        };
        assert!(matches!(err, StoreError::PoolError(_)));
        assert!(started.elapsed() < Duration::from_secs(2));

        drop(held);
        assert!(db.get_conn().is_ok());
    }

    #[test]
    fn sort_order_is_read_from_queries() {
        let order: SortOrder = serde_json::from_str("\"oldest_first\"").unwrap();
        assert_eq!(order, SortOrder::OldestFirst);
        assert_eq!(SortOrder::default(), SortOrder::NewestFirst);
    }
}
