use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use reqwest::header::{self, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::expiry;
use super::storage::{MemoryStorage, StorageArea};
use crate::notice::{Notice, Notifier};

/// Key under which the credential is kept in either storage area
pub const AUTH_ITEM_NAME: &str = "access_token";

const SESSION_EXPIRED_NOTICE: &str = "Your session has expired, please log in again";

/// The bearer token together with its expiry, as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    pub token: String,
    #[serde(deserialize_with = "expiry::deserialize")]
    pub expire: DateTime<Utc>,
}

impl Credential {
    pub fn is_expired(&self) -> bool {
        self.expire <= Utc::now()
    }

    pub fn time_until_expiry(&self) -> Duration {
        self.expire - Utc::now()
    }

    /// Get minutes remaining until expiry (for display)
    pub fn minutes_until_expiry(&self) -> i64 {
        self.time_until_expiry().num_minutes().max(0)
    }
}

/// Which storage area holds the credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageScope {
    /// Survives restarts ("remember me")
    Persistent,
    /// Dropped when the process exits
    Session,
}

/// Owns the bearer credential across the persistent and session areas.
///
/// No authentication state is cached: every query re-reads storage, and an
/// expired credential is removed on the first read that notices it.
/// Clone is cheap; clones share the same areas.
#[derive(Clone)]
pub struct TokenStore {
    persistent: Arc<dyn StorageArea>,
    session: Arc<dyn StorageArea>,
    notifier: Arc<dyn Notifier>,
}

impl TokenStore {
    pub fn new(
        persistent: Arc<dyn StorageArea>,
        session: Arc<dyn StorageArea>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            persistent,
            session,
            notifier,
        }
    }

    /// Both areas in memory; used by tests and one-shot commands.
    pub fn in_memory(notifier: Arc<dyn Notifier>) -> Self {
        Self::new(
            Arc::new(MemoryStorage::new()),
            Arc::new(MemoryStorage::new()),
            notifier,
        )
    }

    fn area(&self, scope: StorageScope) -> &dyn StorageArea {
        match scope {
            StorageScope::Persistent => self.persistent.as_ref(),
            StorageScope::Session => self.session.as_ref(),
        }
    }

    /// Store a credential, overwriting whatever the chosen area held.
    pub fn store(&self, token: &str, remember: bool, expire: DateTime<Utc>) -> Result<()> {
        let credential = Credential {
            token: token.to_string(),
            expire,
        };
        let scope = if remember {
            StorageScope::Persistent
        } else {
            StorageScope::Session
        };
        let value = serde_json::to_string(&credential)?;
        self.area(scope).set_item(AUTH_ITEM_NAME, &value)?;
        debug!(?scope, %expire, "Credential stored");
        Ok(())
    }

    /// Raw stored value, persistent area first. Empty values count as absent.
    fn read_raw(&self) -> Option<(StorageScope, String)> {
        for scope in [StorageScope::Persistent, StorageScope::Session] {
            match self.area(scope).get_item(AUTH_ITEM_NAME) {
                Ok(Some(value)) if !value.is_empty() => return Some((scope, value)),
                Ok(_) => {}
                Err(e) => warn!(?scope, error = %e, "Failed to read credential"),
            }
        }
        None
    }

    /// Read the stored credential, enforcing expiry.
    ///
    /// Returns `None` when nothing is stored, when the stored value cannot
    /// be parsed, or when it has expired. The latter two also clear both
    /// areas; expiry additionally tells the user.
    pub fn credential(&self) -> Option<Credential> {
        let (scope, raw) = self.read_raw()?;

        let credential: Credential = match serde_json::from_str(&raw) {
            Ok(c) => c,
            Err(e) => {
                warn!(?scope, error = %e, "Discarding malformed stored credential");
                self.clear();
                return None;
            }
        };

        if credential.is_expired() {
            debug!(?scope, expire = %credential.expire, "Stored credential expired");
            self.clear();
            self.notifier.notify(Notice::warning(SESSION_EXPIRED_NOTICE));
            return None;
        }

        Some(credential)
    }

    /// The bearer token if a valid one is stored.
    pub fn take(&self) -> Option<String> {
        self.credential().map(|c| c.token)
    }

    /// Remove the credential from both areas.
    pub fn delete(&self) -> Result<()> {
        self.persistent.remove_item(AUTH_ITEM_NAME)?;
        self.session.remove_item(AUTH_ITEM_NAME)?;
        debug!("Credential deleted");
        Ok(())
    }

    fn clear(&self) {
        if let Err(e) = self.delete() {
            warn!(error = %e, "Failed to clear stored credential");
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.take().is_none()
    }

    /// Which area currently holds a stored value, without expiry checks.
    pub fn scope(&self) -> Option<StorageScope> {
        self.read_raw().map(|(scope, _)| scope)
    }

    /// `Authorization: Bearer <token>` when a valid token exists, else empty.
    pub fn auth_header(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(token) = self.take() {
            match HeaderValue::from_str(&format!("Bearer {}", token)) {
                Ok(value) => {
                    headers.insert(header::AUTHORIZATION, value);
                }
                Err(e) => warn!(error = %e, "Stored token is not a valid header value"),
            }
        }
        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notice::{NoticeBoard, NoticeLevel};

    fn store_with_board() -> (TokenStore, Arc<MemoryStorage>, Arc<MemoryStorage>, NoticeBoard) {
        let persistent = Arc::new(MemoryStorage::new());
        let session = Arc::new(MemoryStorage::new());
        let board = NoticeBoard::new();
        let store = TokenStore::new(persistent.clone(), session.clone(), Arc::new(board.clone()));
        (store, persistent, session, board)
    }

    fn future() -> DateTime<Utc> {
        Utc::now() + Duration::hours(1)
    }

    fn past() -> DateTime<Utc> {
        Utc::now() - Duration::seconds(1)
    }

    #[test]
    fn test_store_then_take_returns_token() {
        let (store, _, _, board) = store_with_board();
        store.store("abc.def.ghi", true, future()).unwrap();
        assert_eq!(store.take().as_deref(), Some("abc.def.ghi"));
        assert!(!store.is_unauthorized());
        assert!(board.history().is_empty());
    }

    #[test]
    fn test_remember_selects_area() {
        let (store, persistent, session, _) = store_with_board();

        store.store("kept", true, future()).unwrap();
        assert!(persistent.get_item(AUTH_ITEM_NAME).unwrap().is_some());
        assert!(session.get_item(AUTH_ITEM_NAME).unwrap().is_none());
        assert_eq!(store.scope(), Some(StorageScope::Persistent));

        store.delete().unwrap();
        store.store("short", false, future()).unwrap();
        assert!(persistent.get_item(AUTH_ITEM_NAME).unwrap().is_none());
        assert!(session.get_item(AUTH_ITEM_NAME).unwrap().is_some());
        assert_eq!(store.scope(), Some(StorageScope::Session));
    }

    #[test]
    fn test_persistent_area_read_first() {
        let (store, _, _, _) = store_with_board();
        store.store("session-token", false, future()).unwrap();
        store.store("persistent-token", true, future()).unwrap();
        assert_eq!(store.take().as_deref(), Some("persistent-token"));
    }

    #[test]
    fn test_expired_credential_is_cleared_everywhere() {
        let (store, persistent, session, board) = store_with_board();
        session.set_item(AUTH_ITEM_NAME, "{\"token\":\"s\",\"expire\":0}").unwrap();
        store.store("old", true, past()).unwrap();

        assert_eq!(store.take(), None);
        assert!(persistent.get_item(AUTH_ITEM_NAME).unwrap().is_none());
        assert!(session.get_item(AUTH_ITEM_NAME).unwrap().is_none());

        let notices = board.history();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Warning);
    }

    #[test]
    fn test_delete_then_take_is_none() {
        let (store, _, _, _) = store_with_board();
        store.delete().unwrap(); // nothing stored
        assert_eq!(store.take(), None);

        store.store("a", true, future()).unwrap();
        store.store("b", false, future()).unwrap();
        store.delete().unwrap();
        assert_eq!(store.take(), None);
        assert!(store.is_unauthorized());
        assert_eq!(store.scope(), None);
    }

    #[test]
    fn test_malformed_credential_is_discarded() {
        let (store, persistent, _, board) = store_with_board();
        persistent.set_item(AUTH_ITEM_NAME, "{not json").unwrap();

        assert_eq!(store.take(), None);
        assert!(persistent.get_item(AUTH_ITEM_NAME).unwrap().is_none());
        assert!(board.history().is_empty());
    }

    #[test]
    fn test_empty_persistent_value_falls_through_to_session() {
        let (store, persistent, session, _) = store_with_board();
        store
            .store("session-tok", false, Utc::now() + Duration::hours(1))
            .unwrap();
        persistent.set_item(AUTH_ITEM_NAME, "").unwrap();

        assert_eq!(store.take().as_deref(), Some("session-tok"));
        assert_eq!(store.scope(), Some(StorageScope::Session));
        assert!(session.get_item(AUTH_ITEM_NAME).unwrap().is_some());
    }

    #[test]
    fn test_stored_value_format() {
        let (store, persistent, _, _) = store_with_board();
        let expire = Utc::now() + Duration::days(7);
        store.store("tok", true, expire).unwrap();

        let raw = persistent.get_item(AUTH_ITEM_NAME).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["token"], "tok");
        assert!(value["expire"].is_string());
    }

    #[test]
    fn test_auth_header() {
        let (store, _, _, _) = store_with_board();
        assert!(store.auth_header().is_empty());

        store.store("xyz", false, future()).unwrap();
        let headers = store.auth_header();
        assert_eq!(
            headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()),
            Some("Bearer xyz")
        );
    }

    #[test]
    fn test_minutes_until_expiry() {
        let credential = Credential {
            token: "t".to_string(),
            expire: Utc::now() + Duration::minutes(30) + Duration::seconds(5),
        };
        assert_eq!(credential.minutes_until_expiry(), 30);

        let expired = Credential {
            token: "t".to_string(),
            expire: past(),
        };
        assert!(expired.is_expired());
        assert_eq!(expired.minutes_until_expiry(), 0);
    }
}
