use anyhow::{Context, Result};
use keyring::Entry;

use super::storage::StorageArea;

const SERVICE_NAME: &str = "tokengate";

/// Persistent storage area kept in the OS keychain, one entry per key.
pub struct KeychainStorage {
    service: String,
}

impl KeychainStorage {
    pub fn new() -> Self {
        Self::with_service(SERVICE_NAME)
    }

    pub fn with_service(service: &str) -> Self {
        Self {
            service: service.to_string(),
        }
    }

    fn entry(&self, key: &str) -> Result<Entry> {
        Entry::new(&self.service, key).context("Failed to create keyring entry")
    }
}

impl Default for KeychainStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageArea for KeychainStorage {
    /// Retrieve a stored value from the OS keychain
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to retrieve value from keychain"),
        }
    }

    /// Store a value in the OS keychain
    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.entry(key)?
            .set_password(value)
            .context("Failed to store value in keychain")
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete value from keychain"),
        }
    }
}
