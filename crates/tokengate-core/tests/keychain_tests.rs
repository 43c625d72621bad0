//! Keychain-backed persistent area, run against an in-process credential store

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Once};

use chrono::{Duration, Utc};
use keyring::credential::{Credential, CredentialApi, CredentialBuilderApi};
use tokengate_core::auth::{KeychainStorage, MemoryStorage, StorageArea, TokenStore};
use tokengate_core::notice::NoticeBoard;

type Secrets = Arc<Mutex<HashMap<(String, String), Vec<u8>>>>;

/// Entries built for the same service and user share one secret,
/// like a real keychain.
struct SharedCredential {
    id: (String, String),
    secrets: Secrets,
}

impl CredentialApi for SharedCredential {
    fn set_password(&self, password: &str) -> keyring::Result<()> {
        self.set_secret(password.as_bytes())
    }

    fn set_secret(&self, secret: &[u8]) -> keyring::Result<()> {
        self.secrets
            .lock()
            .unwrap()
            .insert(self.id.clone(), secret.to_vec());
        Ok(())
    }

    fn get_password(&self) -> keyring::Result<String> {
        let secret = self.get_secret()?;
        String::from_utf8(secret).map_err(|e| keyring::Error::BadEncoding(e.into_bytes()))
    }

    fn get_secret(&self) -> keyring::Result<Vec<u8>> {
        self.secrets
            .lock()
            .unwrap()
            .get(&self.id)
            .cloned()
            .ok_or(keyring::Error::NoEntry)
    }

    fn delete_credential(&self) -> keyring::Result<()> {
        match self.secrets.lock().unwrap().remove(&self.id) {
            Some(_) => Ok(()),
            None => Err(keyring::Error::NoEntry),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct SharedBuilder {
    secrets: Secrets,
}

impl CredentialBuilderApi for SharedBuilder {
    fn build(
        &self,
        _target: Option<&str>,
        service: &str,
        user: &str,
    ) -> keyring::Result<Box<Credential>> {
        Ok(Box::new(SharedCredential {
            id: (service.to_string(), user.to_string()),
            secrets: self.secrets.clone(),
        }))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn install_shared_keychain() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        keyring::set_default_credential_builder(Box::new(SharedBuilder {
            secrets: Arc::default(),
        }));
    });
}

#[test]
fn test_keychain_storage_roundtrip() {
    install_shared_keychain();
    let storage = KeychainStorage::with_service("tokengate-test-roundtrip");

    assert_eq!(storage.get_item("access_token").unwrap(), None);
    storage.set_item("access_token", "v1").unwrap();
    assert_eq!(storage.get_item("access_token").unwrap().as_deref(), Some("v1"));

    storage.remove_item("access_token").unwrap();
    storage.remove_item("access_token").unwrap();
    assert_eq!(storage.get_item("access_token").unwrap(), None);
}

#[test]
fn test_remembered_token_is_read_back_from_keychain() {
    install_shared_keychain();
    let tokens = TokenStore::new(
        Arc::new(KeychainStorage::with_service("tokengate-test-store")),
        Arc::new(MemoryStorage::new()),
        Arc::new(NoticeBoard::new()),
    );

    tokens
        .store("kept", true, Utc::now() + Duration::days(1))
        .unwrap();
    assert_eq!(tokens.take().as_deref(), Some("kept"));

    tokens.delete().unwrap();
    assert!(tokens.is_unauthorized());
}
