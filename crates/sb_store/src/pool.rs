//! SQLite pool creation and connection-level pragmas.

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::info;

use crate::error::Result;

/// Memory store connection configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Path to the SQLite database file, or `:memory:` for an ephemeral store.
    pub database_path: String,
    /// Maximum pooled connections.
    pub max_connections: u32,
}

impl StoreConfig {
    /// Configuration pointing at a file on disk, created if absent.
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            database_path: path.into(),
            max_connections: 5,
        }
    }

    /// Configuration for an in-memory database (tests, ephemeral sessions).
    pub fn in_memory() -> Self {
        Self {
            database_path: ":memory:".to_string(),
            max_connections: 1,
        }
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }
}

/// Open a pool against `config`, creating the database file if needed and
/// applying the WAL/synchronous/foreign-key pragmas every pool uses.
pub async fn create_pool(config: &StoreConfig) -> Result<SqlitePool> {
    let options = if config.database_path == ":memory:" {
        SqliteConnectOptions::from_str("sqlite::memory:")?
    } else {
        SqliteConnectOptions::new()
            .filename(&config.database_path)
            .create_if_missing(true)
    };

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await?;

    apply_pragmas(&pool).await?;

    info!(path = %config.database_path, "memory store pool opened");
    Ok(pool)
}

async fn apply_pragmas(pool: &SqlitePool) -> Result<()> {
    sqlx::query("PRAGMA journal_mode=WAL").execute(pool).await?;
    sqlx::query("PRAGMA synchronous=NORMAL").execute(pool).await?;
    sqlx::query("PRAGMA foreign_keys=ON").execute(pool).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn opens_in_memory_pool() {
        let config = StoreConfig::in_memory();
        let pool = create_pool(&config).await.unwrap();
        let row: (i64,) = sqlx::query_as("SELECT 1").fetch_one(&pool).await.unwrap();
        assert_eq!(row.0, 1);
    }

    #[tokio::test]
    async fn opens_file_backed_pool() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.db");
        let config = StoreConfig::file(path.to_string_lossy().to_string());
        let pool = create_pool(&config).await.unwrap();
        assert!(path.exists());
        drop(pool);
    }
}
