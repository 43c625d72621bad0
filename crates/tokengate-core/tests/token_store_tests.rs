//! Token store behavior over real storage areas

use std::sync::Arc;

use chrono::{Duration, Utc};
use tokengate_core::auth::{FileStorage, MemoryStorage, StorageArea, TokenStore, AUTH_ITEM_NAME};
use tokengate_core::notice::NoticeBoard;

fn open(dir: &std::path::Path) -> TokenStore {
    TokenStore::new(
        Arc::new(FileStorage::new(dir)),
        Arc::new(MemoryStorage::new()),
        Arc::new(NoticeBoard::new()),
    )
}

#[test]
fn test_remembered_token_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    open(dir.path())
        .store("kept", true, Utc::now() + Duration::days(1))
        .unwrap();

    let restarted = open(dir.path());
    assert_eq!(restarted.take().as_deref(), Some("kept"));
}

#[test]
fn test_session_token_does_not_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(dir.path());
    store
        .store("short-lived", false, Utc::now() + Duration::days(1))
        .unwrap();
    assert_eq!(store.take().as_deref(), Some("short-lived"));

    let restarted = open(dir.path());
    assert!(restarted.is_unauthorized());
}

#[test]
fn test_backend_formatted_value_is_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let file = FileStorage::new(dir.path());
    file.set_item(AUTH_ITEM_NAME, r#"{"token":"legacy","expire":"2099-01-01 00:00:00"}"#)
        .unwrap();

    assert_eq!(open(dir.path()).take().as_deref(), Some("legacy"));
}

#[test]
fn test_expired_file_entry_is_removed() {
    let dir = tempfile::tempdir().unwrap();
    let board = NoticeBoard::new();
    let store = TokenStore::new(
        Arc::new(FileStorage::new(dir.path())),
        Arc::new(MemoryStorage::new()),
        Arc::new(board.clone()),
    );
    store
        .store("stale", true, Utc::now() - Duration::minutes(1))
        .unwrap();

    assert!(store.is_unauthorized());
    assert!(FileStorage::new(dir.path())
        .get_item(AUTH_ITEM_NAME)
        .unwrap()
        .is_none());
    assert_eq!(board.history().len(), 1);
}

#[test]
fn test_is_unauthorized_matches_take() {
    let dir = tempfile::tempdir().unwrap();
    let store = open(dir.path());
    let cases = [
        None,
        Some(Utc::now() + Duration::hours(2)),
        Some(Utc::now() - Duration::hours(2)),
    ];
    for expire in cases {
        store.delete().unwrap();
        if let Some(expire) = expire {
            store.store("t", true, expire).unwrap();
        }
        let unauthorized = store.is_unauthorized();
        if let Some(expire) = expire {
            store.store("t", true, expire).unwrap();
        }
        assert_eq!(unauthorized, store.take().is_none());
    }
}

#[test]
fn test_corrupt_storage_file_does_not_block_delete_or_store() {
    let dir = tempfile::tempdir().unwrap();
    let file = FileStorage::new(dir.path());
    std::fs::write(file.path(), r#"{"access_tok"#).unwrap();

    let store = open(dir.path());
    assert!(store.is_unauthorized());
    store.delete().unwrap();

    store
        .store("fresh", true, Utc::now() + Duration::days(1))
        .unwrap();
    assert_eq!(open(dir.path()).take().as_deref(), Some("fresh"));
}
