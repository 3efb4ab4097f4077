//! Drives the sync layer against a live in-process table server.

use chrono::NaiveDate;
use dailyplan::models::{AchievementStatus, NewAchievement, NewSpecialNote, Table};
use dailyplan::server::{router, ApiKeyEntry, ApiKeys, AppState, TableStore};
use dailyplan::store::{init_db, LocalStore};
use dailyplan::sync::{OperationKind, RemoteStore, RestStore, SyncCoordinator};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const API_KEY: &str = "test-key";
const TIMEOUT: Duration = Duration::from_secs(2);

/// Starts the table server on an ephemeral port and returns its base URL.
async fn start_server(data_dir: &Path) -> String {
    let tables = TableStore::open(&data_dir.join("tables.db")).await.unwrap();
    let api_keys = ApiKeys::new(vec![ApiKeyEntry {
        key: API_KEY.to_string(),
        name: "test".to_string(),
    }]);
    let app = router(AppState {
        tables,
        api_keys: Arc::new(api_keys),
    });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// A URL nothing is listening on.
async fn dead_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

async fn coordinator(db: &Path, url: String) -> SyncCoordinator {
    let local = LocalStore::new(init_db(db).await.unwrap());
    let remote = RestStore::new(url, API_KEY.to_string(), TIMEOUT).unwrap();
    SyncCoordinator::new(local, Arc::new(remote), TIMEOUT)
}

#[tokio::test]
async fn test_offline_changes_reach_server_after_reconnect() {
    let temp_dir = TempDir::new().unwrap();
    let db = temp_dir.path().join("client").join("dailyplan.db");

    // Offline session: nothing is listening at the remote URL.
    let (achievement_id, note_id) = {
        let offline = coordinator(&db, dead_url().await).await;
        assert!(!offline.is_reachable().await);

        let achievement = offline
            .achievements()
            .create(
                NewAchievement::new("Run 5k", NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
                    .with_progress(0)
                    .with_status(AchievementStatus::Planned),
            )
            .await
            .unwrap();
        assert!(!achievement.is_reconciled());

        let note = offline
            .notes()
            .create(NewSpecialNote::new("Buy running shoes"))
            .await
            .unwrap();

        let mut edited = note.record.clone();
        edited.content = "Buy running shoes (size 44)".to_string();
        offline.notes().update(edited).await.unwrap();

        let pending = offline.pending_operations().await.unwrap();
        let kinds: Vec<OperationKind> = pending.iter().map(|op| op.kind).collect();
        assert_eq!(
            kinds,
            vec![OperationKind::Insert, OperationKind::Insert, OperationKind::Update]
        );
        assert!(!offline.sync_now().await);

        (achievement.record.id, note.record.id)
    };

    // Next session on the same device, with the server up.
    let url = start_server(temp_dir.path()).await;
    let online = coordinator(&db, url.clone()).await;
    assert!(online.is_reachable().await);
    assert_eq!(online.pending_operations().await.unwrap().len(), 3);

    assert!(online.sync_now().await);
    assert!(online.pending_operations().await.unwrap().is_empty());
    assert!(online.last_sync().await.unwrap().is_some());

    // Check what the server holds through an independent client.
    let server = RestStore::new(url, API_KEY.to_string(), TIMEOUT).unwrap();
    let achievements = server.fetch_all(Table::Achievements).await.unwrap();
    assert_eq!(achievements.len(), 1);
    assert_eq!(achievements[0]["id"], achievement_id.as_str());
    assert_eq!(achievements[0]["status"], "planned");
    assert!(achievements[0].get("sync_status").is_none());

    let notes = server.fetch_all(Table::SpecialNotes).await.unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0]["id"], note_id.as_str());
    assert_eq!(notes[0]["content"], "Buy running shoes (size 44)");

    let listed = online.achievements().get_all().await;
    assert_eq!(listed.len(), 1);
    assert!(listed[0].is_reconciled());
}

#[tokio::test]
async fn test_online_crud_against_server() {
    let temp_dir = TempDir::new().unwrap();
    let url = start_server(temp_dir.path()).await;
    let sync = coordinator(&temp_dir.path().join("client.db"), url).await;
    let notes = sync.notes();

    let first = notes.create(NewSpecialNote::new("first")).await.unwrap();
    assert!(first.is_reconciled());
    tokio::time::sleep(Duration::from_millis(5)).await;
    let second = notes.create(NewSpecialNote::new("second")).await.unwrap();

    let listed = notes.get_all().await;
    let ids: Vec<&str> = listed.iter().map(|n| n.record.id.as_str()).collect();
    assert_eq!(ids, vec![second.record.id.as_str(), first.record.id.as_str()]);

    notes.delete(&first.record.id).await.unwrap();
    let listed = notes.get_all().await;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].record.id, second.record.id);
    assert!(sync.pending_operations().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_wrong_api_key_keeps_changes_queued() {
    let temp_dir = TempDir::new().unwrap();
    let url = start_server(temp_dir.path()).await;
    let local = LocalStore::new(init_db(&temp_dir.path().join("client.db")).await.unwrap());
    let remote = RestStore::new(url, "wrong".to_string(), TIMEOUT).unwrap();
    let sync = SyncCoordinator::new(local, Arc::new(remote), TIMEOUT);

    // The probe is rejected with 401, so the store counts as unreachable.
    assert!(!sync.is_reachable().await);
    let note = sync
        .notes()
        .create(NewSpecialNote::new("kept locally"))
        .await
        .unwrap();
    assert!(!note.is_reconciled());
    assert_eq!(sync.pending_operations().await.unwrap().len(), 1);
    assert_eq!(sync.notes().get_all().await.len(), 1);
}
