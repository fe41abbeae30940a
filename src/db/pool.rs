//! Connection handling
//!
//! Redakt runs on SQLite out of the box and on MySQL when configured for
//! it. A single `Database` value wraps whichever sqlx pool the config
//! selects; repositories branch on `driver()` and borrow the concrete
//! pool with `as_sqlite()` / `as_mysql()`.
//!
//! The config supplies a plain filesystem path for SQLite (`:memory:`
//! for an in-memory database) and a full `mysql://` DSN for MySQL.

use anyhow::{Context, Result};
use sqlx::{
    mysql::{MySqlPool, MySqlPoolOptions},
    sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions},
};
use std::path::Path;
use std::sync::Arc;

use crate::config::{DatabaseConfig, DatabaseDriver};

const SQLITE_MAX_CONNECTIONS: u32 = 20;
const MYSQL_MAX_CONNECTIONS: u32 = 30;

/// Shared handle to the database, cloned into every repository
pub type DbHandle = Arc<Database>;

/// The configured database backend
pub enum Database {
    Sqlite(SqlitePool),
    Mysql(MySqlPool),
}

impl Database {
    /// Open the pool described by the configuration.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        match config.driver {
            DatabaseDriver::Sqlite => connect_sqlite(&config.url).await.map(Database::Sqlite),
            DatabaseDriver::Mysql => connect_mysql(&config.url).await.map(Database::Mysql),
        }
    }

    /// Which driver this handle wraps
    pub fn driver(&self) -> DatabaseDriver {
        match self {
            Database::Sqlite(_) => DatabaseDriver::Sqlite,
            Database::Mysql(_) => DatabaseDriver::Mysql,
        }
    }

    /// The SQLite pool, if that is the configured backend
    pub fn as_sqlite(&self) -> Option<&SqlitePool> {
        match self {
            Database::Sqlite(pool) => Some(pool),
            Database::Mysql(_) => None,
        }
    }

    /// The MySQL pool, if that is the configured backend
    pub fn as_mysql(&self) -> Option<&MySqlPool> {
        match self {
            Database::Sqlite(_) => None,
            Database::Mysql(pool) => Some(pool),
        }
    }

    /// Run a statement that returns no rows, yielding the affected count
    pub async fn execute(&self, sql: &str) -> Result<u64> {
        match self {
            Database::Sqlite(pool) => sqlx::query(sql)
                .execute(pool)
                .await
                .map(|r| r.rows_affected()),
            Database::Mysql(pool) => sqlx::query(sql)
                .execute(pool)
                .await
                .map(|r| r.rows_affected()),
        }
        .with_context(|| format!("Failed to execute statement: {}", sql))
    }

    /// Round-trip a trivial query to check the connection is alive
    pub async fn ping(&self) -> Result<()> {
        match self {
            Database::Sqlite(pool) => sqlx::query("SELECT 1").fetch_one(pool).await.map(|_| ()),
            Database::Mysql(pool) => sqlx::query("SELECT 1").fetch_one(pool).await.map(|_| ()),
        }
        .context("Database ping failed")
    }

    /// Close the underlying pool
    pub async fn close(&self) {
        match self {
            Database::Sqlite(pool) => pool.close().await,
            Database::Mysql(pool) => pool.close().await,
        }
    }
}

async fn connect_sqlite(url: &str) -> Result<SqlitePool> {
    if url == ":memory:" || url == "sqlite::memory:" {
        // An in-memory database lives and dies with its connection, so the
        // pool must hold exactly one and never recycle it.
        let options = SqliteConnectOptions::new()
            .in_memory(true)
            .foreign_keys(true);
        return SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .context("Failed to open in-memory SQLite database");
    }

    let path = Path::new(url);
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create database directory: {:?}", parent))?;
        }
    }

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .foreign_keys(true);
    SqlitePoolOptions::new()
        .max_connections(SQLITE_MAX_CONNECTIONS)
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to open SQLite database: {}", url))
}

async fn connect_mysql(url: &str) -> Result<MySqlPool> {
    MySqlPoolOptions::new()
        .max_connections(MYSQL_MAX_CONNECTIONS)
        .connect(url)
        .await
        .with_context(|| format!("Failed to connect to MySQL: {}", url))
}

/// Open the configured database and wrap it for sharing
pub async fn create_pool(config: &DatabaseConfig) -> Result<DbHandle> {
    Ok(Arc::new(Database::connect(config).await?))
}

/// In-memory SQLite handle for tests
pub async fn create_test_pool() -> Result<DbHandle> {
    let config = DatabaseConfig {
        driver: DatabaseDriver::Sqlite,
        url: ":memory:".to_string(),
    };
    create_pool(&config).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_pool_selects_sqlite() {
        let pool = create_test_pool().await.expect("Failed to create pool");
        assert_eq!(pool.driver(), DatabaseDriver::Sqlite);
        assert!(pool.as_sqlite().is_some());
        assert!(pool.as_mysql().is_none());
        pool.ping().await.expect("Ping should succeed");
    }

    #[tokio::test]
    async fn test_memory_pool_keeps_state_across_statements() {
        let pool = create_test_pool().await.expect("Failed to create pool");

        pool.execute("CREATE TABLE scratch (id INTEGER PRIMARY KEY, name TEXT)")
            .await
            .expect("Failed to create table");
        let affected = pool
            .execute("INSERT INTO scratch (name) VALUES ('one')")
            .await
            .expect("Failed to insert");
        assert_eq!(affected, 1);

        let affected = pool
            .execute("DELETE FROM scratch")
            .await
            .expect("Failed to delete");
        assert_eq!(affected, 1);
    }

    #[tokio::test]
    async fn test_file_database_is_created_on_demand() {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("articles").join("redakt.db");

        let config = DatabaseConfig {
            driver: DatabaseDriver::Sqlite,
            url: db_path.to_string_lossy().to_string(),
        };

        let pool = create_pool(&config).await.expect("Failed to create pool");
        pool.ping().await.expect("Ping should succeed");
        assert!(db_path.exists());

        pool.close().await;
    }

    #[tokio::test]
    async fn test_foreign_keys_enforced() {
        let pool = create_test_pool().await.expect("Failed to create pool");

        pool.execute("CREATE TABLE a (id INTEGER PRIMARY KEY)")
            .await
            .unwrap();
        pool.execute(
            "CREATE TABLE b (id INTEGER PRIMARY KEY, a_id INTEGER NOT NULL REFERENCES a(id))",
        )
        .await
        .unwrap();

        let err = pool.execute("INSERT INTO b (a_id) VALUES (42)").await;
        assert!(err.is_err());
    }

    #[tokio::test]
    #[ignore = "Requires MySQL server"]
    async fn test_mysql_pool_creation() {
        let url = std::env::var("MYSQL_TEST_URL")
            .unwrap_or_else(|_| "mysql://root@localhost/redakt_test".to_string());

        let config = DatabaseConfig {
            driver: DatabaseDriver::Mysql,
            url,
        };

        let pool = create_pool(&config).await.expect("Failed to create pool");
        assert_eq!(pool.driver(), DatabaseDriver::Mysql);
        assert!(pool.as_mysql().is_some());
        assert!(pool.as_sqlite().is_none());
    }
}
