//! Durable FIFO log of mutations not yet confirmed by the remote store.

use chrono::Utc;
use std::collections::HashSet;
use std::future::Future;

use super::ids::{next_id, observe};
use super::operation::{NewOperation, SyncOperation};
use crate::store::{LocalStore, StorageKey, StoreError};

/// Outcome of one pass over the pending log.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrainReport {
    /// Operations the remote store accepted, in the order they were applied.
    pub applied: Vec<SyncOperation>,
    /// Number of operations attempted and rejected during the pass.
    pub failed: usize,
    /// The log as stored after the pass.
    pub pending: Vec<SyncOperation>,
}

impl DrainReport {
    pub fn is_clean(&self) -> bool {
        self.failed == 0 && self.pending.is_empty()
    }
}

/// The pending operation log, persisted under [`StorageKey::PendingSync`].
///
/// Not safe to drain from two places at once; the [`super::worker`] owns the
/// queue at runtime and serializes access to it.
#[derive(Clone, Debug)]
pub struct PendingQueue {
    store: LocalStore,
}

impl PendingQueue {
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    /// Assigns an id and timestamp and appends to the end of the log.
    pub async fn enqueue(&self, operation: NewOperation) -> Result<SyncOperation, StoreError> {
        let mut queue = self.pending().await?;
        // Ids from an earlier process may be ahead of this one's clock.
        for queued in &queue {
            observe(&queued.id);
        }
        let operation = operation.into_operation(next_id(), Utc::now());
        queue.push(operation.clone());
        self.store.save(StorageKey::PendingSync, &queue).await?;

        tracing::debug!(
            op_id = %operation.id,
            table = %operation.table,
            kind = %operation.kind,
            queued = queue.len(),
            "Queued operation"
        );
        Ok(operation)
    }

    pub async fn pending(&self) -> Result<Vec<SyncOperation>, StoreError> {
        self.store.load(StorageKey::PendingSync).await
    }

    /// Runs `apply` once per queued operation, oldest first, then removes the
    /// operations it accepted.
    ///
    /// A rejected operation stays queued for the next drain; operations after it
    /// are still attempted.
    pub async fn drain<F, Fut>(&self, mut apply: F) -> Result<DrainReport, StoreError>
    where
        F: FnMut(SyncOperation) -> Fut,
        Fut: Future<Output = bool>,
    {
        let queue = self.pending().await?;
        if queue.is_empty() {
            return Ok(DrainReport::default());
        }

        let mut processed: HashSet<String> = HashSet::new();
        let mut report = DrainReport::default();

        for operation in queue {
            if processed.contains(&operation.id) {
                continue;
            }
            if apply(operation.clone()).await {
                processed.insert(operation.id.clone());
                report.applied.push(operation);
            } else {
                tracing::debug!(op_id = %operation.id, table = %operation.table, "Operation still pending");
                report.failed += 1;
            }
        }

        // Re-read so anything appended while the pass was running is kept.
        let remaining: Vec<SyncOperation> = self
            .pending()
            .await?
            .into_iter()
            .filter(|op| !processed.contains(&op.id))
            .collect();
        self.store.save(StorageKey::PendingSync, &remaining).await?;

        if !report.applied.is_empty() {
            self.store.set_last_sync(Utc::now()).await?;
        }

        tracing::info!(
            applied = report.applied.len(),
            failed = report.failed,
            remaining = remaining.len(),
            "Drained pending queue"
        );
        report.pending = remaining;
        Ok(report)
    }
}
