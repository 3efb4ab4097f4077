use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::models::Table;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Insert,
    Update,
    Delete,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationKind::Insert => "insert",
            OperationKind::Update => "update",
            OperationKind::Delete => "delete",
        };
        f.pad(name)
    }
}

/// A mutation waiting for the remote store, as persisted in the pending log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncOperation {
    pub id: String,
    pub table: Table,
    #[serde(rename = "operation")]
    pub kind: OperationKind,
    /// Full record for inserts and updates, `{"id": ...}` for deletes.
    pub data: Value,
    #[serde(rename = "timestamp")]
    pub enqueued_at: DateTime<Utc>,
}

impl SyncOperation {
    /// Id of the record the operation targets.
    pub fn record_id(&self) -> Option<&str> {
        self.data.get("id").and_then(Value::as_str)
    }
}

/// A mutation before the queue assigns it an id and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOperation {
    pub table: Table,
    pub kind: OperationKind,
    pub data: Value,
}

impl NewOperation {
    pub fn insert(table: Table, data: Value) -> Self {
        Self {
            table,
            kind: OperationKind::Insert,
            data,
        }
    }

    pub fn update(table: Table, data: Value) -> Self {
        Self {
            table,
            kind: OperationKind::Update,
            data,
        }
    }

    pub fn delete(table: Table, id: &str) -> Self {
        Self {
            table,
            kind: OperationKind::Delete,
            data: serde_json::json!({ "id": id }),
        }
    }

    pub fn record_id(&self) -> Option<&str> {
        self.data.get("id").and_then(Value::as_str)
    }

    pub(crate) fn into_operation(self, id: String, enqueued_at: DateTime<Utc>) -> SyncOperation {
        SyncOperation {
            id,
            table: self.table,
            kind: self.kind,
            data: self.data,
            enqueued_at,
        }
    }
}
