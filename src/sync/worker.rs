//! Single-owner task for the pending queue.
//!
//! Every enqueue, drain and snapshot goes through one channel and is handled
//! in arrival order, so at most one drain is ever in flight and an enqueue
//! can never be lost to a drain rewriting the log underneath it.

use serde_json::Value;
use std::collections::HashSet;
use tokio::sync::{mpsc, oneshot};

use super::operation::{NewOperation, SyncOperation};
use super::queue::{DrainReport, PendingQueue};
use super::remote::RemoteClient;
use crate::models::{SyncStatus, Table};
use crate::store::{LocalStore, StorageKey, StoreError};

const CHANNEL_CAPACITY: usize = 64;

/// Errors returned through a [`QueueHandle`].
#[derive(Debug)]
pub enum QueueError {
    /// The queue could not be read or written.
    Store(StoreError),
    /// The worker task is no longer running.
    Closed,
}

impl std::fmt::Display for QueueError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueueError::Store(e) => write!(f, "Pending queue storage error: {}", e),
            QueueError::Closed => write!(f, "Pending queue worker has stopped"),
        }
    }
}

impl std::error::Error for QueueError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            QueueError::Store(e) => Some(e),
            QueueError::Closed => None,
        }
    }
}

impl From<StoreError> for QueueError {
    fn from(e: StoreError) -> Self {
        QueueError::Store(e)
    }
}

enum Command {
    Enqueue {
        operation: NewOperation,
        reply: oneshot::Sender<Result<SyncOperation, StoreError>>,
    },
    EnqueueBehind {
        operation: NewOperation,
        reply: oneshot::Sender<Result<Option<SyncOperation>, StoreError>>,
    },
    Drain {
        reply: oneshot::Sender<Result<DrainReport, StoreError>>,
    },
    Snapshot {
        reply: oneshot::Sender<Result<Vec<SyncOperation>, StoreError>>,
    },
}

/// Cheap, cloneable access to the queue worker.
#[derive(Clone, Debug)]
pub struct QueueHandle {
    tx: mpsc::Sender<Command>,
}

impl QueueHandle {
    /// Spawns the worker on the current tokio runtime.
    pub fn spawn(store: LocalStore, remote: RemoteClient) -> Self {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let worker = SyncWorker {
            queue: PendingQueue::new(store.clone()),
            store,
            remote,
            rx,
        };
        tokio::spawn(worker.run());
        Self { tx }
    }

    pub async fn enqueue(&self, operation: NewOperation) -> Result<SyncOperation, QueueError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Enqueue { operation, reply }).await?;
        Ok(rx.await.map_err(|_| QueueError::Closed)??)
    }

    /// Queues `operation` only if an earlier queued operation targets the
    /// same record; returns `None` and leaves the queue alone otherwise.
    ///
    /// The check and the append happen in one worker step.
    pub async fn enqueue_behind(
        &self,
        operation: NewOperation,
    ) -> Result<Option<SyncOperation>, QueueError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::EnqueueBehind { operation, reply }).await?;
        Ok(rx.await.map_err(|_| QueueError::Closed)??)
    }

    /// Replays every queued operation against the remote store.
    pub async fn drain(&self) -> Result<DrainReport, QueueError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Drain { reply }).await?;
        Ok(rx.await.map_err(|_| QueueError::Closed)??)
    }

    pub async fn pending(&self) -> Result<Vec<SyncOperation>, QueueError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Snapshot { reply }).await?;
        Ok(rx.await.map_err(|_| QueueError::Closed)??)
    }

    async fn send(&self, command: Command) -> Result<(), QueueError> {
        self.tx.send(command).await.map_err(|_| QueueError::Closed)
    }
}

struct SyncWorker {
    queue: PendingQueue,
    store: LocalStore,
    remote: RemoteClient,
    rx: mpsc::Receiver<Command>,
}

impl SyncWorker {
    async fn run(mut self) {
        while let Some(command) = self.rx.recv().await {
            match command {
                Command::Enqueue { operation, reply } => {
                    let _ = reply.send(self.queue.enqueue(operation).await);
                }
                Command::EnqueueBehind { operation, reply } => {
                    let _ = reply.send(self.enqueue_behind(operation).await);
                }
                Command::Drain { reply } => {
                    let _ = reply.send(self.drain().await);
                }
                Command::Snapshot { reply } => {
                    let _ = reply.send(self.queue.pending().await);
                }
            }
        }
        tracing::debug!("Queue worker stopped");
    }

    async fn enqueue_behind(
        &self,
        operation: NewOperation,
    ) -> Result<Option<SyncOperation>, StoreError> {
        let Some(id) = operation.record_id() else {
            return Ok(None);
        };
        let record = (operation.table, id.to_string());

        let queued = self.queue.pending().await?;
        if !record_keys(&queued).contains(&record) {
            return Ok(None);
        }
        self.queue.enqueue(operation).await.map(Some)
    }

    async fn drain(&self) -> Result<DrainReport, StoreError> {
        let remote = &self.remote;
        let report = self
            .queue
            .drain(|operation| async move { remote.apply(&operation).await })
            .await?;

        if !report.applied.is_empty() || !report.pending.is_empty() {
            self.retag(&report).await;
        }
        Ok(report)
    }

    /// Brings the cached sync status in line with the queue after a drain.
    async fn retag(&self, report: &DrainReport) {
        let still_pending = record_keys(&report.pending);
        let applied = record_keys(&report.applied);

        for table in Table::ALL {
            let key = StorageKey::for_table(table);
            let mut rows: Vec<Value> = match self.store.load(key).await {
                Ok(rows) => rows,
                Err(e) => {
                    tracing::warn!(table = %table, "Skipping status update: {}", e);
                    continue;
                }
            };

            let mut changed = false;
            for row in rows.iter_mut() {
                let Some(id) = row.get("id").and_then(Value::as_str) else {
                    continue;
                };
                let record = (table, id.to_string());
                let status = if still_pending.contains(&record) {
                    SyncStatus::PendingRemote
                } else if applied.contains(&record) {
                    SyncStatus::Reconciled
                } else {
                    continue;
                };
                if let Some(fields) = row.as_object_mut() {
                    let status = serde_json::to_value(status).unwrap_or(Value::Null);
                    if fields.get("sync_status") != Some(&status) {
                        fields.insert("sync_status".to_string(), status);
                        changed = true;
                    }
                }
            }

            if changed {
                if let Err(e) = self.store.save(key, &rows).await {
                    tracing::warn!(table = %table, "Failed to save sync status: {}", e);
                }
            }
        }
    }
}

/// (table, record id) pairs targeted by `operations`.
pub(crate) fn record_keys(operations: &[SyncOperation]) -> HashSet<(Table, String)> {
    operations
        .iter()
        .filter_map(|op| op.record_id().map(|id| (op.table, id.to_string())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Draft, NewSpecialNote, SpecialNote, Tracked};
    use crate::store::init_db;
    use crate::sync::memory::MemoryRemote;
    use chrono::Utc;
    use std::sync::Arc;
    use tempfile::TempDir;

    async fn setup() -> (QueueHandle, LocalStore, Arc<MemoryRemote>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalStore::new(init_db(&temp_dir.path().join("local.db")).await.unwrap());
        let remote = Arc::new(MemoryRemote::new());
        let handle = QueueHandle::spawn(store.clone(), RemoteClient::new(remote.clone()));
        (handle, store, remote, temp_dir)
    }

    fn note(id: &str) -> SpecialNote {
        NewSpecialNote::new(format!("note {}", id)).into_record(id.to_string(), Utc::now())
    }

    #[tokio::test]
    async fn test_enqueue_and_drain_through_worker() {
        let (handle, _store, remote, _temp) = setup().await;
        let row = serde_json::to_value(note("n1")).unwrap();

        handle
            .enqueue(NewOperation::insert(Table::SpecialNotes, row))
            .await
            .unwrap();
        assert_eq!(handle.pending().await.unwrap().len(), 1);

        let report = handle.drain().await.unwrap();
        assert_eq!(report.applied.len(), 1);
        assert!(handle.pending().await.unwrap().is_empty());
        assert_eq!(remote.rows(Table::SpecialNotes).len(), 1);
    }

    #[tokio::test]
    async fn test_enqueue_behind_only_queues_records_with_pending_work() {
        let (handle, _store, _remote, _temp) = setup().await;
        let queued = note("n1");
        handle
            .enqueue(NewOperation::insert(
                Table::SpecialNotes,
                serde_json::to_value(&queued).unwrap(),
            ))
            .await
            .unwrap();

        let other = handle
            .enqueue_behind(NewOperation::delete(Table::SpecialNotes, "n2"))
            .await
            .unwrap();
        assert!(other.is_none());
        assert_eq!(handle.pending().await.unwrap().len(), 1);

        let same_id_other_table = handle
            .enqueue_behind(NewOperation::delete(Table::Achievements, "n1"))
            .await
            .unwrap();
        assert!(same_id_other_table.is_none());

        let behind = handle
            .enqueue_behind(NewOperation::delete(Table::SpecialNotes, "n1"))
            .await
            .unwrap()
            .unwrap();
        let pending = handle.pending().await.unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[1], behind);
    }

    #[tokio::test]
    async fn test_concurrent_drains_apply_each_operation_once() {
        let (handle, _store, remote, _temp) = setup().await;
        for id in ["n1", "n2", "n3"] {
            let row = serde_json::to_value(note(id)).unwrap();
            handle
                .enqueue(NewOperation::insert(Table::SpecialNotes, row))
                .await
                .unwrap();
        }

        let (a, b) = tokio::join!(handle.drain(), handle.drain());
        let applied = a.unwrap().applied.len() + b.unwrap().applied.len();

        assert_eq!(applied, 3);
        assert_eq!(remote.calls().len(), 3);
        assert_eq!(remote.rows(Table::SpecialNotes).len(), 3);
    }

    #[tokio::test]
    async fn test_drain_retags_cached_records() {
        let (handle, store, remote, _temp) = setup().await;
        let ok = note("ok");
        let stuck = note("stuck");
        store
            .save(
                StorageKey::SpecialNotes,
                &[Tracked::pending(ok.clone()), Tracked::pending(stuck.clone())],
            )
            .await
            .unwrap();
        remote.reject_record("stuck");

        for record in [&ok, &stuck] {
            let row = serde_json::to_value(record).unwrap();
            handle
                .enqueue(NewOperation::insert(Table::SpecialNotes, row))
                .await
                .unwrap();
        }
        handle.drain().await.unwrap();

        let cached: Vec<Tracked<SpecialNote>> = store.load(StorageKey::SpecialNotes).await.unwrap();
        assert_eq!(cached[0].sync_status, SyncStatus::Reconciled);
        assert_eq!(cached[1].sync_status, SyncStatus::PendingRemote);
    }

    #[tokio::test]
    async fn test_enqueue_during_drain_is_kept() {
        let (handle, _store, remote, _temp) = setup().await;
        remote.set_latency(std::time::Duration::from_millis(20));
        let first = serde_json::to_value(note("n1")).unwrap();
        handle
            .enqueue(NewOperation::insert(Table::SpecialNotes, first))
            .await
            .unwrap();

        let second = serde_json::to_value(note("n2")).unwrap();
        let (report, queued) = tokio::join!(
            handle.drain(),
            handle.enqueue(NewOperation::insert(Table::SpecialNotes, second))
        );
        report.unwrap();
        let queued = queued.unwrap();

        // The drain was requested first, so it finished before the enqueue ran.
        let pending = handle.pending().await.unwrap();
        assert_eq!(pending, vec![queued]);
        assert_eq!(remote.rows(Table::SpecialNotes).len(), 1);
    }
}
