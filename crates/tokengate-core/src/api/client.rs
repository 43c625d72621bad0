//! Request dispatcher for the backend API.
//!
//! Every call attaches the bearer header from the `TokenStore`, parses the
//! response body as an `Envelope`, and resolves to the envelope data or a
//! `RequestError`. Before an error is returned it is logged and turned into
//! a user notice: application failures show the server's message, transport
//! errors show a generic one.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use reqwest::{Client, RequestBuilder};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::envelope::{AuthorizeResponse, CodeKind, Envelope, RegisterRequest};
use super::error::{RequestError, TransportError};
use crate::auth::TokenStore;
use crate::config::Config;
use crate::notice::{Notice, Notifier};

// ============================================================================
// Constants
// ============================================================================

pub const LOGIN_PATH: &str = "/api/auth/login";
pub const LOGOUT_PATH: &str = "/api/auth/logout";
pub const ASK_CODE_PATH: &str = "/api/auth/ask-code";
pub const REGISTER_PATH: &str = "/api/auth/register";

const TRANSPORT_ERROR_NOTICE: &str =
    "Something went wrong, please contact the administrator";

const LOGOUT_NOTICE: &str = "Logged out";

/// API client for the backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    tokens: TokenStore,
    notifier: Arc<dyn Notifier>,
    quiet_failures: bool,
}

impl ApiClient {
    /// Create a client for the configured backend
    pub fn new(config: &Config, tokens: TokenStore, notifier: Arc<dyn Notifier>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            tokens,
            notifier,
            quiet_failures: false,
        })
    }

    /// Skip the notice for application failures; the caller renders them.
    /// Transport errors are always announced.
    pub fn quiet_failures(mut self, quiet: bool) -> Self {
        self.quiet_failures = quiet;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolve a path against the base URL; absolute URLs pass through.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}/{}", self.base_url, path.trim_start_matches('/'))
        }
    }

    // ===== Generic Requests =====

    /// GET `url` with the bearer header and return the envelope data
    pub async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T, RequestError> {
        let request = self
            .client
            .get(self.url(url))
            .headers(self.tokens.auth_header());
        self.dispatch(url, request).await
    }

    /// POST `body` as JSON to `url` with the bearer header
    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T, RequestError> {
        let request = self
            .client
            .post(self.url(url))
            .headers(self.tokens.auth_header())
            .json(body);
        self.dispatch(url, request).await
    }

    async fn dispatch<T: DeserializeOwned>(
        &self,
        url: &str,
        request: RequestBuilder,
    ) -> Result<T, RequestError> {
        let result = Self::execute(url, request).await;
        if let Err(ref e) = result {
            self.report(e);
        }
        result
    }

    async fn execute<T: DeserializeOwned>(
        url: &str,
        request: RequestBuilder,
    ) -> Result<T, RequestError> {
        let response = request.send().await.map_err(TransportError::from)?;
        let status = response.status();
        let body = response.text().await.map_err(TransportError::from)?;
        debug!(url, status = status.as_u16(), "Response received");

        let envelope: Envelope = serde_json::from_str(&body)
            .map_err(|_| TransportError::invalid_response(status, &body))?;

        envelope.into_result(url)?.map_err(|e| {
            warn!(url, error = %e, "Envelope data has unexpected shape");
            TransportError::invalid_response(status, &body).into()
        })
    }

    /// Default handling for a failed request: log, then tell the user.
    fn report(&self, error: &RequestError) {
        match error {
            RequestError::Failure { message, code, url } => {
                warn!(url = %url, code, message = %message, "Request failed");
                if !self.quiet_failures {
                    self.notifier.notify(Notice::warning(message.clone()));
                }
            }
            RequestError::Transport(e) => {
                warn!(error = %e, "Request error");
                self.notifier.notify(Notice::warning(TRANSPORT_ERROR_NOTICE));
            }
            RequestError::Storage(e) => {
                warn!(error = %e, "Credential storage error");
                self.notifier.notify(Notice::warning(TRANSPORT_ERROR_NOTICE));
            }
        }
    }

    // ===== Authentication =====

    /// Log in with a form-encoded username/password.
    ///
    /// On success the returned token is stored, in the persistent area when
    /// `remember` is set and in the session area otherwise.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        remember: bool,
    ) -> Result<AuthorizeResponse, RequestError> {
        let request = self
            .client
            .post(self.url(LOGIN_PATH))
            .form(&[("username", username), ("password", password)]);

        let auth: AuthorizeResponse = self.dispatch(LOGIN_PATH, request).await?;

        if let Err(e) = self.tokens.store(&auth.token, remember, auth.expire) {
            let err = RequestError::Storage(format!("{:#}", e));
            self.report(&err);
            return Err(err);
        }

        info!(username = %auth.username, remember, "Login successful");
        self.notifier
            .notify(Notice::success(format!("Login successful, welcome {}", auth.username)));
        Ok(auth)
    }

    /// Log out on the server, then forget the local credential.
    ///
    /// The local credential is only deleted once the server confirms; when
    /// the call fails it stays in place.
    pub async fn logout(&self) -> Result<(), RequestError> {
        let _: Value = self.get(LOGOUT_PATH).await?;

        if let Err(e) = self.tokens.delete() {
            let err = RequestError::Storage(format!("{:#}", e));
            self.report(&err);
            return Err(err);
        }

        info!("Logout successful");
        self.notifier.notify(Notice::success(LOGOUT_NOTICE));
        Ok(())
    }

    // ===== Registration =====

    /// Ask the backend to email a verification code
    pub async fn ask_code(&self, email: &str, kind: CodeKind) -> Result<(), RequestError> {
        let request = self
            .client
            .get(self.url(ASK_CODE_PATH))
            .headers(self.tokens.auth_header())
            .query(&[("email", email), ("type", kind.as_str())]);
        let _: Value = self.dispatch(ASK_CODE_PATH, request).await?;
        Ok(())
    }

    /// Register a new account with a previously emailed code
    pub async fn register(&self, request: &RegisterRequest) -> Result<(), RequestError> {
        let _: Value = self.post(REGISTER_PATH, request).await?;
        info!(username = %request.username, "Account registered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notice::NoticeBoard;

    fn client(base_url: &str) -> ApiClient {
        let board = Arc::new(NoticeBoard::new());
        let config = Config {
            base_url: base_url.to_string(),
            ..Config::default()
        };
        ApiClient::new(&config, TokenStore::in_memory(board.clone()), board).unwrap()
    }

    #[test]
    fn test_url_joining() {
        let api = client("http://localhost:8080/");
        assert_eq!(api.base_url(), "http://localhost:8080");
        assert_eq!(api.url("/api/auth/login"), "http://localhost:8080/api/auth/login");
        assert_eq!(api.url("api/items"), "http://localhost:8080/api/items");
        assert_eq!(api.url("https://other.example/x"), "https://other.example/x");
    }
}
