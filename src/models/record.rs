use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::table::Table;

/// A row of one of the synced tables.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const TABLE: Table;

    fn id(&self) -> &str;

    /// Refreshes `updated_at`.
    fn touch(&mut self, now: DateTime<Utc>);
}

/// User-supplied fields for a record that does not exist yet.
pub trait Draft {
    type Record: Record;

    /// Rejects input the forms would refuse, with a user-facing message.
    fn validate(&self) -> Result<(), String>;

    fn into_record(self, id: String, now: DateTime<Utc>) -> Self::Record;
}

/// Whether the last local mutation of a record is known to the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    #[default]
    PendingRemote,
    Reconciled,
}

/// A cached record together with its sync status.
///
/// The status is flattened next to the record fields in the local cache and is
/// never sent to the remote store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tracked<T> {
    #[serde(flatten)]
    pub record: T,
    #[serde(default)]
    pub sync_status: SyncStatus,
}

impl<T> Tracked<T> {
    pub fn pending(record: T) -> Self {
        Self {
            record,
            sync_status: SyncStatus::PendingRemote,
        }
    }

    pub fn reconciled(record: T) -> Self {
        Self {
            record,
            sync_status: SyncStatus::Reconciled,
        }
    }

    pub fn is_reconciled(&self) -> bool {
        self.sync_status == SyncStatus::Reconciled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewSpecialNote, SpecialNote};

    #[test]
    fn test_status_is_stored_next_to_record_fields() {
        let note = NewSpecialNote::new("hi").into_record("1".to_string(), Utc::now());
        let json = serde_json::to_value(Tracked::pending(note)).unwrap();

        assert_eq!(json["id"], "1");
        assert_eq!(json["content"], "hi");
        assert_eq!(json["sync_status"], "pending_remote");
    }

    #[test]
    fn test_missing_status_reads_as_pending() {
        let json = serde_json::json!({
            "id": "1",
            "content": "hi",
            "created_at": "2024-01-01T00:00:00Z",
            "updated_at": "2024-01-01T00:00:00Z"
        });
        let tracked: Tracked<SpecialNote> = serde_json::from_value(json).unwrap();
        assert_eq!(tracked.sync_status, SyncStatus::PendingRemote);
        assert!(!tracked.is_reconciled());
    }
}
