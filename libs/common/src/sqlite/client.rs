use anyhow::{Context, Result};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous},
    SqlitePool as SqlxSqlitePool,
};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

pub type SqlitePool = SqlxSqlitePool;

/// Connection tuning for a single SQLite file
#[derive(Debug, Clone)]
pub struct SqliteSettings {
    /// Pool size; 1 serializes every statement through one connection
    pub max_connections: u32,
    /// How long a statement waits on a locked database
    pub busy_timeout: Duration,
}

impl Default for SqliteSettings {
    fn default() -> Self {
        Self {
            max_connections: 1,
            busy_timeout: Duration::from_secs(5),
        }
    }
}

/// Owned SQLite connection pool with foreign keys enforced on every connection
pub struct SqliteClient {
    pool: SqlitePool,
    db_path: String,
}

impl SqliteClient {
    /// Open (creating if missing) a database file
    pub async fn new(db_path: impl AsRef<Path>, settings: &SqliteSettings) -> Result<Self> {
        let db_path_str = db_path.as_ref().to_string_lossy().to_string();

        // Ensure parent directory exists
        if let Some(parent) = db_path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory {:?}", parent))?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(&db_path_str)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(settings.busy_timeout)
            .foreign_keys(true)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(settings.max_connections)
            .connect_with(options)
            .await
            .with_context(|| format!("Cannot open database {}", db_path_str))?;

        info!("SQLite connected with foreign keys enabled: {}", db_path_str);

        Ok(Self {
            pool,
            db_path: db_path_str,
        })
    }

    /// Private in-memory database, lives as long as the single pooled connection
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .context("Invalid in-memory connection string")?
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .context("Cannot open in-memory database")?;

        debug!("SQLite in-memory database ready");

        Ok(Self {
            pool,
            db_path: ":memory:".to_string(),
        })
    }

    /// Get the underlying connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Get database file path
    pub fn path(&self) -> &str {
        &self.db_path
    }

    /// Check if database is accessible
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Close every pooled connection; the client is unusable afterwards
    pub async fn close(self) {
        self.pool.close().await;
        debug!("SQLite closed: {}", self.db_path);
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use sqlx::Row;

    #[tokio::test]
    async fn test_new_creates_parent_directory_and_file() {
        let tmp = tempfile::tempdir().unwrap();
        let db_path = tmp.path().join("nested").join("rules.db");

        let client = SqliteClient::new(&db_path, &SqliteSettings::default())
            .await
            .unwrap();
        client.ping().await.unwrap();

        assert!(db_path.exists());
        assert_eq!(client.path(), db_path.to_string_lossy());
        client.close().await;
    }

    #[tokio::test]
    async fn test_foreign_keys_enabled() {
        let client = SqliteClient::in_memory().await.unwrap();
        let row = sqlx::query("PRAGMA foreign_keys")
            .fetch_one(client.pool())
            .await
            .unwrap();
        let enabled: i64 = row.get(0);
        assert_eq!(enabled, 1);
    }
}
