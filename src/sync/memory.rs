//! In-memory remote store for tests.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use super::operation::OperationKind;
use super::remote::{RemoteError, RemoteStore};
use crate::models::Table;

/// A mutating call that reached the store.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteCall {
    pub kind: OperationKind,
    pub table: Table,
    pub id: String,
}

#[derive(Default)]
struct State {
    unreachable: bool,
    failing: bool,
    latency: Duration,
    tables: HashMap<Table, Vec<Value>>,
    calls: Vec<RemoteCall>,
    rejected_ids: HashSet<String>,
}

#[derive(Default)]
pub struct MemoryRemote {
    state: Mutex<State>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.state.lock().unwrap().unreachable = !reachable;
    }

    /// Keeps the store reachable but fails every mutation with a 500.
    pub fn set_failing(&self, failing: bool) {
        self.state.lock().unwrap().failing = failing;
    }

    pub fn set_latency(&self, latency: Duration) {
        self.state.lock().unwrap().latency = latency;
    }

    /// Makes every mutation of the given record fail with a 400.
    pub fn reject_record(&self, id: &str) {
        self.state.lock().unwrap().rejected_ids.insert(id.to_string());
    }

    pub fn accept_record(&self, id: &str) {
        self.state.lock().unwrap().rejected_ids.remove(id);
    }

    pub fn seed(&self, table: Table, rows: Vec<Value>) {
        self.state.lock().unwrap().tables.insert(table, rows);
    }

    pub fn rows(&self, table: Table) -> Vec<Value> {
        self.state
            .lock()
            .unwrap()
            .tables
            .get(&table)
            .cloned()
            .unwrap_or_default()
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    async fn round_trip(&self) -> Result<(), RemoteError> {
        let latency = self.state.lock().unwrap().latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if self.state.lock().unwrap().unreachable {
            return Err(RemoteError::Unreachable("connection refused".to_string()));
        }
        Ok(())
    }

    fn record_call(&self, kind: OperationKind, table: Table, id: &str) -> Result<(), RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(RemoteCall {
            kind,
            table,
            id: id.to_string(),
        });
        if state.failing {
            return Err(RemoteError::Rejected {
                status: 500,
                message: "internal error".to_string(),
            });
        }
        if state.rejected_ids.contains(id) {
            return Err(RemoteError::Rejected {
                status: 400,
                message: format!("row {} rejected", id),
            });
        }
        Ok(())
    }
}

fn row_id(row: &Value) -> &str {
    row.get("id").and_then(Value::as_str).unwrap_or_default()
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    async fn probe(&self) -> Result<(), RemoteError> {
        self.round_trip().await
    }

    async fn fetch_all(&self, table: Table) -> Result<Vec<Value>, RemoteError> {
        self.round_trip().await?;
        let mut rows = self.rows(table);
        let column = table.sort_column();
        rows.sort_by(|a, b| {
            let a = a.get(column).and_then(Value::as_str).unwrap_or_default();
            let b = b.get(column).and_then(Value::as_str).unwrap_or_default();
            b.cmp(a)
        });
        Ok(rows)
    }

    async fn insert(&self, table: Table, row: &Value) -> Result<(), RemoteError> {
        self.round_trip().await?;
        let id = row_id(row).to_string();
        self.record_call(OperationKind::Insert, table, &id)?;

        let mut state = self.state.lock().unwrap();
        let rows = state.tables.entry(table).or_default();
        if rows.iter().any(|r| row_id(r) == id) {
            return Err(RemoteError::Rejected {
                status: 409,
                message: format!("duplicate key {}", id),
            });
        }
        rows.push(row.clone());
        Ok(())
    }

    async fn update(&self, table: Table, id: &str, row: &Value) -> Result<(), RemoteError> {
        self.round_trip().await?;
        self.record_call(OperationKind::Update, table, id)?;

        let mut state = self.state.lock().unwrap();
        if let Some(existing) = state
            .tables
            .entry(table)
            .or_default()
            .iter_mut()
            .find(|r| row_id(r) == id)
        {
            *existing = row.clone();
        }
        Ok(())
    }

    async fn delete(&self, table: Table, id: &str) -> Result<(), RemoteError> {
        self.round_trip().await?;
        self.record_call(OperationKind::Delete, table, id)?;

        let mut state = self.state.lock().unwrap();
        state
            .tables
            .entry(table)
            .or_default()
            .retain(|r| row_id(r) != id);
        Ok(())
    }
}
