//! Remote store access.
//!
//! [`RemoteStore`] is the transport seam (HTTP in production, in-memory in
//! tests). [`RemoteClient`] sits on top of it and turns every failure into a
//! plain `false` so nothing remote ever escapes into the callers.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use super::operation::{NewOperation, OperationKind, SyncOperation};
use crate::models::Table;

/// Errors from a single remote round trip.
#[derive(Debug)]
pub enum RemoteError {
    /// No remote store is configured.
    NotConfigured,
    /// The request never got an answer (DNS, refused connection, reset).
    Unreachable(String),
    /// The request did not finish in time.
    Timeout,
    /// The store answered with an error status.
    Rejected { status: u16, message: String },
    /// The response body could not be decoded.
    Decode(String),
    /// The operation cannot be expressed as a remote call.
    InvalidOperation(String),
}

impl std::fmt::Display for RemoteError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RemoteError::NotConfigured => write!(
                f,
                "Remote store not configured. Add remote.url and remote.api_key to config."
            ),
            RemoteError::Unreachable(e) => write!(f, "Remote store unreachable: {}", e),
            RemoteError::Timeout => write!(f, "Remote store timed out"),
            RemoteError::Rejected { status, message } => {
                write!(f, "Remote store rejected request ({}): {}", status, message)
            }
            RemoteError::Decode(e) => write!(f, "Invalid response from remote store: {}", e),
            RemoteError::InvalidOperation(e) => write!(f, "Invalid operation: {}", e),
        }
    }
}

impl std::error::Error for RemoteError {}

/// Table-level operations offered by the remote store.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Minimal bounded read used to decide reachability.
    async fn probe(&self) -> Result<(), RemoteError>;

    /// All rows of `table`, newest first by the table's sort column.
    async fn fetch_all(&self, table: Table) -> Result<Vec<Value>, RemoteError>;

    async fn insert(&self, table: Table, row: &Value) -> Result<(), RemoteError>;

    async fn update(&self, table: Table, id: &str, row: &Value) -> Result<(), RemoteError>;

    async fn delete(&self, table: Table, id: &str) -> Result<(), RemoteError>;
}

/// Remote store used when none is configured; every call fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct Disconnected;

#[async_trait]
impl RemoteStore for Disconnected {
    async fn probe(&self) -> Result<(), RemoteError> {
        Err(RemoteError::NotConfigured)
    }

    async fn fetch_all(&self, _table: Table) -> Result<Vec<Value>, RemoteError> {
        Err(RemoteError::NotConfigured)
    }

    async fn insert(&self, _table: Table, _row: &Value) -> Result<(), RemoteError> {
        Err(RemoteError::NotConfigured)
    }

    async fn update(&self, _table: Table, _id: &str, _row: &Value) -> Result<(), RemoteError> {
        Err(RemoteError::NotConfigured)
    }

    async fn delete(&self, _table: Table, _id: &str) -> Result<(), RemoteError> {
        Err(RemoteError::NotConfigured)
    }
}

/// Best-effort single-attempt remote calls.
#[derive(Clone)]
pub struct RemoteClient {
    store: Arc<dyn RemoteStore>,
}

impl RemoteClient {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self { store }
    }

    /// Attempts the remote call for a queued operation. Returns whether the
    /// remote store accepted it.
    pub async fn apply(&self, operation: &SyncOperation) -> bool {
        self.call(operation.table, operation.kind, &operation.data)
            .await
            .map_err(|e| {
                tracing::warn!(
                    op_id = %operation.id,
                    table = %operation.table,
                    "Remote {} failed: {}",
                    operation.kind,
                    e
                );
            })
            .is_ok()
    }

    /// Attempts a mutation immediately, before it has been queued.
    pub async fn execute(&self, operation: &NewOperation) -> bool {
        self.call(operation.table, operation.kind, &operation.data)
            .await
            .map_err(|e| {
                tracing::info!(
                    table = %operation.table,
                    "Remote {} failed, will queue: {}",
                    operation.kind,
                    e
                );
            })
            .is_ok()
    }

    pub async fn fetch_all(&self, table: Table) -> Result<Vec<Value>, RemoteError> {
        self.store.fetch_all(table).await
    }

    async fn call(&self, table: Table, kind: OperationKind, data: &Value) -> Result<(), RemoteError> {
        match kind {
            OperationKind::Insert => self.store.insert(table, data).await,
            OperationKind::Update => self.store.update(table, target_id(data)?, data).await,
            OperationKind::Delete => self.store.delete(table, target_id(data)?).await,
        }
    }
}

fn target_id(data: &Value) -> Result<&str, RemoteError> {
    data.get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| RemoteError::InvalidOperation("row has no id".to_string()))
}
