//! The offline-first façade used by every screen.
//!
//! Writes go to the local cache first, then one immediate remote attempt;
//! anything the remote store does not confirm is queued and replayed by the
//! next drain. Reads prefer a fresh remote fetch and fall back to the cache.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashSet;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use super::error::SyncError;
use super::ids::next_id;
use super::operation::{NewOperation, SyncOperation};
use super::probe::ConnectivityProbe;
use super::remote::{Disconnected, RemoteClient, RemoteStore};
use super::rest::RestStore;
use super::worker::{record_keys, QueueHandle};
use crate::config::Config;
use crate::models::{
    Achievement, DailyPlan, Draft, Record, SpecialNote, SyncStatus, Table, Tracked,
};
use crate::store::{init_db, LocalStore, StorageKey, StoreError};

pub struct SyncCoordinator {
    local: LocalStore,
    queue: QueueHandle,
    remote: RemoteClient,
    probe: ConnectivityProbe,
}

impl SyncCoordinator {
    /// Creates a coordinator and spawns its queue worker on the current runtime.
    pub fn new(local: LocalStore, remote: Arc<dyn RemoteStore>, probe_timeout: Duration) -> Self {
        let client = RemoteClient::new(remote.clone());
        let queue = QueueHandle::spawn(local.clone(), client.clone());
        Self {
            local,
            queue,
            remote: client,
            probe: ConnectivityProbe::new(remote, probe_timeout),
        }
    }

    /// Opens the local cache from config and connects to the configured
    /// remote store, or runs fully offline if none is configured.
    pub async fn open(config: &Config) -> Result<Self, StoreError> {
        let pool = init_db(&config.database_path()).await?;

        let remote: Arc<dyn RemoteStore> = match RestStore::from_config(&config.remote) {
            Ok(store) => Arc::new(store),
            Err(e) => {
                tracing::info!("Running offline: {}", e);
                Arc::new(Disconnected)
            }
        };

        Ok(Self::new(
            LocalStore::new(pool),
            remote,
            config.remote.timeout(),
        ))
    }

    pub fn plans(&self) -> Entity<'_, DailyPlan> {
        Entity::new(self)
    }

    pub fn achievements(&self) -> Entity<'_, Achievement> {
        Entity::new(self)
    }

    pub fn notes(&self) -> Entity<'_, SpecialNote> {
        Entity::new(self)
    }

    pub async fn is_reachable(&self) -> bool {
        self.probe.is_reachable().await
    }

    /// Replays the pending queue if the remote store is reachable.
    ///
    /// Returns false when unreachable or when the queue could not be read or
    /// rewritten. Individual rejected operations do not make it false; they
    /// stay queued.
    pub async fn sync_now(&self) -> bool {
        if !self.probe.is_reachable().await {
            tracing::info!("Sync skipped: remote store unreachable");
            return false;
        }

        match self.queue.drain().await {
            Ok(report) => {
                if !report.pending.is_empty() {
                    tracing::warn!("{} operation(s) still pending after sync", report.pending.len());
                }
                true
            }
            Err(e) => {
                tracing::error!("Sync failed: {}", e);
                false
            }
        }
    }

    pub async fn pending_operations(&self) -> Result<Vec<SyncOperation>, SyncError> {
        Ok(self.queue.pending().await?)
    }

    pub async fn last_sync(&self) -> Result<Option<DateTime<Utc>>, SyncError> {
        Ok(self.local.last_sync().await?)
    }

    /// One immediate remote attempt; queues the operation if it does not go
    /// through. Returns whether the remote store has the change.
    ///
    /// A record that already has queued operations never gets a direct call:
    /// the new operation goes to the back of the queue so the remote store
    /// sees the changes in order.
    async fn push(&self, operation: NewOperation) -> Result<bool, SyncError> {
        let table = operation.table;
        let record_id = operation.record_id().map(str::to_string);

        if let Some(queued) = self.queue.enqueue_behind(operation.clone()).await? {
            tracing::info!(op_id = %queued.id, table = %table, "Queued {} behind earlier changes", queued.kind);
            return Ok(self.flush_record(table, record_id).await);
        }

        if self.probe.is_reachable().await && self.remote.execute(&operation).await {
            return Ok(true);
        }

        let queued = self.queue.enqueue(operation).await?;
        tracing::info!(op_id = %queued.id, table = %queued.table, "Queued {} for later sync", queued.kind);
        Ok(false)
    }

    /// Drains if reachable. Returns whether nothing is left queued for the
    /// record afterwards.
    async fn flush_record(&self, table: Table, record_id: Option<String>) -> bool {
        if !self.probe.is_reachable().await {
            return false;
        }

        match self.queue.drain().await {
            Ok(report) => match record_id {
                Some(id) => !record_keys(&report.pending).contains(&(table, id)),
                None => report.pending.is_empty(),
            },
            Err(e) => {
                tracing::warn!("Drain failed: {}", e);
                false
            }
        }
    }

    async fn load_cached<T: Record>(&self) -> Result<Vec<Tracked<T>>, StoreError> {
        self.local.load(StorageKey::for_table(T::TABLE)).await
    }

    async fn save_cached<T: Record>(&self, records: &[Tracked<T>]) -> Result<(), StoreError> {
        self.local.save(StorageKey::for_table(T::TABLE), records).await
    }

    async fn set_status<T: Record>(&self, id: &str, status: SyncStatus) {
        let result = async {
            let mut cached = self.load_cached::<T>().await?;
            if let Some(entry) = cached.iter_mut().find(|e| e.record.id() == id) {
                entry.sync_status = status;
                self.save_cached(&cached).await?;
            }
            Ok::<(), StoreError>(())
        }
        .await;

        if let Err(e) = result {
            tracing::warn!(table = %T::TABLE, id, "Failed to update sync status: {}", e);
        }
    }

    /// Records still targeted by a queued operation.
    async fn pending_records(&self) -> HashSet<(Table, String)> {
        match self.queue.pending().await {
            Ok(pending) => record_keys(&pending),
            Err(e) => {
                tracing::warn!("Could not read pending queue: {}", e);
                HashSet::new()
            }
        }
    }

    /// Replaces the cached table with a fresh remote fetch, then drains.
    async fn refresh<T: Record>(&self, rows: Vec<Value>) -> Vec<Tracked<T>> {
        let table = T::TABLE;
        let mut records: Vec<Tracked<T>> = rows
            .into_iter()
            .filter_map(|row| match serde_json::from_value::<T>(row) {
                Ok(record) => Some(Tracked::reconciled(record)),
                Err(e) => {
                    tracing::warn!(table = %table, "Skipping malformed remote row: {}", e);
                    None
                }
            })
            .collect();

        if let Err(e) = self.save_cached(&records).await {
            tracing::warn!(table = %table, "Failed to cache remote rows: {}", e);
        }

        let pending = match self.queue.drain().await {
            Ok(report) => record_keys(&report.pending),
            Err(e) => {
                tracing::warn!("Drain after fetch failed: {}", e);
                self.pending_records().await
            }
        };

        for entry in records.iter_mut() {
            if pending.contains(&(table, entry.record.id().to_string())) {
                entry.sync_status = SyncStatus::PendingRemote;
            }
        }
        records
    }
}

fn to_row<T: Record>(record: &T) -> Result<Value, StoreError> {
    serde_json::to_value(record)
        .map_err(|e| StoreError::Serialization(T::TABLE.as_str().to_string(), e))
}

/// Operations for one entity type.
pub struct Entity<'a, T> {
    coordinator: &'a SyncCoordinator,
    _record: PhantomData<T>,
}

impl<'a, T: Record> Entity<'a, T> {
    fn new(coordinator: &'a SyncCoordinator) -> Self {
        Self {
            coordinator,
            _record: PhantomData,
        }
    }

    /// All records, newest first.
    ///
    /// When the remote store answers, its rows replace the cached table
    /// wholesale and the pending queue is drained afterwards, so queued local
    /// changes are applied on top of the fetched state. A record deleted or
    /// edited offline can therefore show its remote version until the next
    /// fetch.
    pub async fn get_all(&self) -> Vec<Tracked<T>> {
        let c = self.coordinator;

        if c.probe.is_reachable().await {
            match c.remote.fetch_all(T::TABLE).await {
                Ok(rows) => return c.refresh::<T>(rows).await,
                Err(e) => {
                    tracing::warn!(table = %T::TABLE, "Fetch failed, using local cache: {}", e)
                }
            }
        }

        c.load_cached::<T>().await.unwrap_or_else(|e| {
            tracing::warn!(table = %T::TABLE, "Failed to read local cache: {}", e);
            Vec::new()
        })
    }

    /// Creates a record locally, then tries the remote store once.
    ///
    /// The returned record is already durable in the local cache whatever
    /// the remote outcome.
    pub async fn create<D>(&self, draft: D) -> Result<Tracked<T>, SyncError>
    where
        D: Draft<Record = T>,
    {
        let c = self.coordinator;
        draft.validate().map_err(SyncError::InvalidInput)?;

        let record = draft.into_record(next_id(), Utc::now());
        let mut cached = c.load_cached::<T>().await?;
        cached.insert(0, Tracked::pending(record.clone()));
        c.save_cached(&cached).await?;

        let synced = c
            .push(NewOperation::insert(T::TABLE, to_row(&record)?))
            .await?;
        if synced {
            c.set_status::<T>(record.id(), SyncStatus::Reconciled).await;
            return Ok(Tracked::reconciled(record));
        }
        Ok(Tracked::pending(record))
    }

    /// Replaces the cached record with the same id and pushes the change.
    ///
    /// A record missing from the cache is left absent locally; the remote
    /// update is still attempted.
    pub async fn update(&self, mut record: T) -> Result<(), SyncError> {
        let c = self.coordinator;
        record.touch(Utc::now());

        let mut cached = c.load_cached::<T>().await?;
        let found = match cached.iter_mut().find(|e| e.record.id() == record.id()) {
            Some(entry) => {
                *entry = Tracked::pending(record.clone());
                true
            }
            None => false,
        };
        if found {
            c.save_cached(&cached).await?;
        } else {
            tracing::debug!(table = %T::TABLE, id = record.id(), "Updated record is not cached locally");
        }

        let synced = c
            .push(NewOperation::update(T::TABLE, to_row(&record)?))
            .await?;
        if synced && found {
            c.set_status::<T>(record.id(), SyncStatus::Reconciled).await;
        }
        Ok(())
    }
}

impl Entity<'_, SpecialNote> {
    /// Removes a note locally and pushes the deletion.
    pub async fn delete(&self, id: &str) -> Result<(), SyncError> {
        let c = self.coordinator;

        let mut cached = c.load_cached::<SpecialNote>().await?;
        cached.retain(|e| e.record.id != id);
        c.save_cached(&cached).await?;

        c.push(NewOperation::delete(Table::SpecialNotes, id)).await?;
        Ok(())
    }
}
