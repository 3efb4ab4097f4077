//! Errors surfaced by the sync coordinator.
//!
//! Remote failures never show up here; they are absorbed into the pending
//! queue.

use super::worker::QueueError;
use crate::store::StoreError;

#[derive(Debug)]
pub enum SyncError {
    /// Input the forms would refuse.
    InvalidInput(String),
    /// The local cache could not be read or written.
    LocalPersistence(StoreError),
    /// The change was saved locally but could not be queued for the remote store.
    Queue(QueueError),
}

impl std::fmt::Display for SyncError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncError::InvalidInput(msg) => write!(f, "{}", msg),
            SyncError::LocalPersistence(e) => write!(f, "Local storage error: {}", e),
            SyncError::Queue(e) => write!(f, "Could not queue change for sync: {}", e),
        }
    }
}

impl std::error::Error for SyncError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SyncError::InvalidInput(_) => None,
            SyncError::LocalPersistence(e) => Some(e),
            SyncError::Queue(e) => Some(e),
        }
    }
}

impl From<StoreError> for SyncError {
    fn from(e: StoreError) -> Self {
        SyncError::LocalPersistence(e)
    }
}

impl From<QueueError> for SyncError {
    fn from(e: QueueError) -> Self {
        SyncError::Queue(e)
    }
}
