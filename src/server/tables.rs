//! Server-side row storage.
//!
//! Every table is kept in one SQLite table as `(table_name, id, data)` with
//! the row itself stored as a JSON object.

use serde_json::{Map, Value};
use sqlx::{Row, SqlitePool};
use std::path::Path;

use crate::models::Table;
use crate::store::{open_pool, StoreError};

/// Errors returned by [`TableStore`].
#[derive(Debug)]
pub enum TableError {
    /// The request named a table that does not exist.
    UnknownTable(String),
    /// The request body or filter is malformed.
    Invalid(String),
    /// A row with the same id already exists.
    Conflict(String),
    /// Database failure.
    Database(sqlx::Error),
}

impl std::fmt::Display for TableError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TableError::UnknownTable(name) => write!(f, "Unknown table: {}", name),
            TableError::Invalid(msg) => write!(f, "Invalid request: {}", msg),
            TableError::Conflict(id) => write!(f, "Duplicate key: {}", id),
            TableError::Database(e) => write!(f, "Database error: {}", e),
        }
    }
}

impl std::error::Error for TableError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TableError::Database(e) => Some(e),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for TableError {
    fn from(e: sqlx::Error) -> Self {
        TableError::Database(e)
    }
}

/// Sort order for [`TableStore::list`], parsed from `order=<column>.<dir>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub descending: bool,
}

impl Order {
    pub fn parse(s: &str) -> Result<Self, TableError> {
        let (column, direction) = s.split_once('.').unwrap_or((s, "asc"));
        if !is_column_name(column) {
            return Err(TableError::Invalid(format!("bad order column '{}'", column)));
        }
        let descending = match direction {
            "asc" => false,
            "desc" => true,
            other => {
                return Err(TableError::Invalid(format!("bad order direction '{}'", other)))
            }
        };
        Ok(Self {
            column: column.to_string(),
            descending,
        })
    }
}

fn is_column_name(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub order: Option<Order>,
    pub limit: Option<u32>,
    /// Columns to keep; `None` keeps the whole row.
    pub select: Option<Vec<String>>,
}

#[derive(Clone, Debug)]
pub struct TableStore {
    pool: SqlitePool,
}

impl TableStore {
    /// Opens the server database, creating it if needed.
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        let pool = open_pool(path).await?;
        sqlx::migrate!("./migrations/remote").run(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn list(&self, table: Table, query: &ListQuery) -> Result<Vec<Value>, TableError> {
        let mut sql = String::from("SELECT data FROM remote_rows WHERE table_name = ?");
        if let Some(order) = &query.order {
            // Column names are restricted to [A-Za-z0-9_] by Order::parse.
            sql.push_str(&format!(
                " ORDER BY json_extract(data, '$.{}') {}, id",
                order.column,
                if order.descending { "DESC" } else { "ASC" }
            ));
        } else {
            sql.push_str(" ORDER BY rowid");
        }
        if let Some(limit) = query.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        let rows = sqlx::query(&sql)
            .bind(table.as_str())
            .fetch_all(&self.pool)
            .await?;

        let mut result = Vec::with_capacity(rows.len());
        for row in rows {
            let data: String = row.get("data");
            let value = parse_row(&data)?;
            result.push(match &query.select {
                Some(columns) => project(value, columns),
                None => value,
            });
        }
        Ok(result)
    }

    /// Inserts one row; fails with [`TableError::Conflict`] if its id exists.
    pub async fn insert(&self, table: Table, row: &Value) -> Result<(), TableError> {
        let id = row_id(row)?;
        let data = row.to_string();

        let result = sqlx::query("INSERT INTO remote_rows (table_name, id, data) VALUES (?, ?, ?)")
            .bind(table.as_str())
            .bind(id)
            .bind(data)
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(TableError::Conflict(id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Merges `patch` into the row with `id`. Returns whether a row matched.
    pub async fn update(&self, table: Table, id: &str, patch: &Value) -> Result<bool, TableError> {
        let Value::Object(patch) = patch else {
            return Err(TableError::Invalid("patch must be a JSON object".to_string()));
        };
        if let Some(new_id) = patch.get("id") {
            if new_id.as_str() != Some(id) {
                return Err(TableError::Invalid("row id cannot be changed".to_string()));
            }
        }

        let existing: Option<(String,)> =
            sqlx::query_as("SELECT data FROM remote_rows WHERE table_name = ? AND id = ?")
                .bind(table.as_str())
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        let Some((data,)) = existing else {
            return Ok(false);
        };

        let mut merged = match parse_row(&data)? {
            Value::Object(fields) => fields,
            _ => Map::new(),
        };
        for (key, value) in patch {
            merged.insert(key.clone(), value.clone());
        }

        sqlx::query("UPDATE remote_rows SET data = ? WHERE table_name = ? AND id = ?")
            .bind(Value::Object(merged).to_string())
            .bind(table.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(true)
    }

    /// Returns whether a row was deleted.
    pub async fn delete(&self, table: Table, id: &str) -> Result<bool, TableError> {
        let result = sqlx::query("DELETE FROM remote_rows WHERE table_name = ? AND id = ?")
            .bind(table.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

fn row_id(row: &Value) -> Result<&str, TableError> {
    row.get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| TableError::Invalid("row must have a string id".to_string()))
}

fn parse_row(data: &str) -> Result<Value, TableError> {
    serde_json::from_str(data).map_err(|e| TableError::Invalid(format!("stored row is corrupt: {}", e)))
}

fn project(row: Value, columns: &[String]) -> Value {
    match row {
        Value::Object(fields) => Value::Object(
            fields
                .into_iter()
                .filter(|(key, _)| columns.iter().any(|c| c == key))
                .collect(),
        ),
        other => other,
    }
}
