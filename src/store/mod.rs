//! Device-side persistence.
//!
//! The local cache is a single SQLite file holding one JSON document per
//! storage key (record tables, the pending operation log, the last sync time).

mod local;

pub use local::{LocalStore, StorageKey};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Errors from the local cache.
#[derive(Debug)]
pub enum StoreError {
    /// Could not create the directory holding the database.
    CreateDir(PathBuf, std::io::Error),
    /// SQLite or migration failure.
    Sqlite(sqlx::Error),
    /// A stored document could not be encoded or decoded.
    Serialization(String, serde_json::Error),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::CreateDir(path, e) => {
                write!(f, "Failed to create directory '{}': {}", path.display(), e)
            }
            StoreError::Sqlite(e) => write!(f, "SQLite error: {}", e),
            StoreError::Serialization(key, e) => {
                write!(f, "Failed to (de)serialize '{}': {}", key, e)
            }
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::CreateDir(_, e) => Some(e),
            StoreError::Sqlite(e) => Some(e),
            StoreError::Serialization(_, e) => Some(e),
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Sqlite(e)
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        StoreError::Sqlite(e.into())
    }
}

/// Opens (creating if needed) the local cache database and runs migrations.
pub async fn init_db(path: &Path) -> Result<SqlitePool, StoreError> {
    let pool = open_pool(path).await?;
    sqlx::migrate!("./migrations/local").run(&pool).await?;
    Ok(pool)
}

/// Opens an SQLite pool at `path`, creating the parent directory and file.
pub(crate) async fn open_pool(path: &Path) -> Result<SqlitePool, StoreError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| StoreError::CreateDir(parent.to_path_buf(), e))?;
    }

    let db_url = format!("sqlite:{}?mode=rwc", path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?.create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_init_db_creates_tables() {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("nested").join("local.db");

        let pool = init_db(&db_path).await.unwrap();

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' AND name NOT LIKE '_sqlx_%' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();

        let table_names: Vec<&str> = tables.iter().map(|t| t.0.as_str()).collect();
        assert!(table_names.contains(&"local_store"));
        assert!(db_path.exists());
    }

    #[tokio::test]
    async fn test_init_db_is_idempotent() {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("local.db");

        init_db(&db_path).await.unwrap().close().await;
        assert!(init_db(&db_path).await.is_ok());
    }
}
