//! tokengate-core: client-side authentication layer.
//!
//! - `auth`: bearer token persistence across persistent and session-scoped
//!   storage areas, with read-time expiry enforcement
//! - `api`: request dispatcher that attaches the bearer header and interprets
//!   the backend `{code, data, message}` envelope
//! - `router`: route table and the navigation guard driven by login state
//! - `notice`: transient user-facing notices
//! - `config`: application configuration

pub mod api;
pub mod auth;
pub mod config;
pub mod notice;
pub mod router;

pub use api::{ApiClient, AuthorizeResponse, Envelope, RequestError};
pub use auth::{StorageArea, StorageScope, TokenStore};
pub use config::Config;
pub use notice::{Notice, NoticeBoard, NoticeLevel, Notifier};
pub use router::{Navigation, Router};
