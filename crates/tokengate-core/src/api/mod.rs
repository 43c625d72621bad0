//! REST API client module.
//!
//! This module provides the `ApiClient` for talking to a backend that wraps
//! every response in a `{code, data, message}` envelope and authenticates
//! with a bearer token obtained from `/api/auth/login`.

pub mod client;
pub mod envelope;
pub mod error;

pub use client::ApiClient;
pub use envelope::{AuthorizeResponse, CodeKind, Envelope, RegisterRequest};
pub use error::{RequestError, TransportError};
