use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::SqlitePool;

use super::StoreError;
use crate::models::Table;

/// Keys of the documents held in the local cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
    DailyPlans,
    Achievements,
    SpecialNotes,
    PendingSync,
    LastSync,
}

impl StorageKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKey::DailyPlans => "daily_plans",
            StorageKey::Achievements => "achievements",
            StorageKey::SpecialNotes => "special_notes",
            StorageKey::PendingSync => "pending_sync",
            StorageKey::LastSync => "last_sync",
        }
    }

    /// Key under which a table's cached records live.
    pub fn for_table(table: Table) -> Self {
        match table {
            Table::DailyPlans => StorageKey::DailyPlans,
            Table::Achievements => StorageKey::Achievements,
            Table::SpecialNotes => StorageKey::SpecialNotes,
        }
    }
}

/// Key-scoped persistence of record collections.
///
/// Every key holds one JSON array; a key that was never written loads as an
/// empty collection. Writes replace the whole document, so concurrent
/// read-modify-write cycles on one key resolve as last write wins.
#[derive(Clone, Debug)]
pub struct LocalStore {
    pool: SqlitePool,
}

impl LocalStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn save<T: Serialize>(&self, key: StorageKey, items: &[T]) -> Result<(), StoreError> {
        let value = serde_json::to_string(items)
            .map_err(|e| StoreError::Serialization(key.as_str().to_string(), e))?;
        self.put_raw(key, &value).await
    }

    pub async fn load<T: DeserializeOwned>(&self, key: StorageKey) -> Result<Vec<T>, StoreError> {
        match self.get_raw(key).await? {
            Some(value) => serde_json::from_str(&value)
                .map_err(|e| StoreError::Serialization(key.as_str().to_string(), e)),
            None => Ok(Vec::new()),
        }
    }

    /// Records the time of the last drain that applied anything.
    pub async fn set_last_sync(&self, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.put_raw(StorageKey::LastSync, &at.to_rfc3339()).await
    }

    pub async fn last_sync(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
        let raw = self.get_raw(StorageKey::LastSync).await?;
        Ok(raw.and_then(|value| {
            DateTime::parse_from_rfc3339(&value)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
        }))
    }

    async fn put_raw(&self, key: StorageKey, value: &str) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO local_store (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key.as_str())
        .bind(value)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_raw(&self, key: StorageKey) -> Result<Option<String>, StoreError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM local_store WHERE key = ?")
            .bind(key.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.0))
    }
}
