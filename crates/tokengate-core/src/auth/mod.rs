//! Authentication module for managing the bearer credential.
//!
//! This module provides:
//! - `TokenStore`: credential persistence with read-time expiry enforcement
//! - `StorageArea`: the string-keyed storage substrate, with memory, file
//!   and OS keychain implementations
//!
//! A credential stored with "remember me" lands in the persistent area,
//! otherwise in the session area that disappears with the process.

pub mod credentials;
pub mod expiry;
pub mod session;
pub mod storage;

pub use credentials::KeychainStorage;
pub use session::{Credential, StorageScope, TokenStore, AUTH_ITEM_NAME};
pub use storage::{FileStorage, MemoryStorage, StorageArea};
