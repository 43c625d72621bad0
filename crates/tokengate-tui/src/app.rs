//! Application state management for tokengate.
//!
//! The `App` owns the token store, the API client and the router. Which
//! screen is shown is never stored directly: it is the router's current
//! location, and every change goes through the navigation guard.

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use serde_json::Value;
use tracing::{debug, info, warn};

use tokengate_core::api::{ApiClient, RequestError};
use tokengate_core::auth::{FileStorage, KeychainStorage, MemoryStorage, StorageArea, StorageScope, TokenStore};
use tokengate_core::config::{Config, PersistentBackend};
use tokengate_core::notice::NoticeBoard;
use tokengate_core::router::{Router, HOME_PATH, INDEX_PATH};

// ============================================================================
// Constants
// ============================================================================

/// Maximum length for username input.
const MAX_USERNAME_LENGTH: usize = 50;

/// Maximum length for password input.
/// 128 chars accommodates password managers and passphrases.
const MAX_PASSWORD_LENGTH: usize = 128;

/// Environment variables pre-filling the login form
const USERNAME_ENV: &str = "TOKENGATE_USERNAME";
const PASSWORD_ENV: &str = "TOKENGATE_PASSWORD";

// ============================================================================
// UI State Types
// ============================================================================

/// Screen shown for the router's current location
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Welcome,
    Index,
}

/// Overall application state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Normal,
    ConfirmingQuit,
    Quitting,
}

/// Login form focus state
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoginFocus {
    Username,
    Password,
    Remember,
    Button,
}

impl LoginFocus {
    pub fn next(&self) -> Self {
        match self {
            LoginFocus::Username => LoginFocus::Password,
            LoginFocus::Password => LoginFocus::Remember,
            LoginFocus::Remember => LoginFocus::Button,
            LoginFocus::Button => LoginFocus::Username,
        }
    }

    pub fn prev(&self) -> Self {
        match self {
            LoginFocus::Username => LoginFocus::Button,
            LoginFocus::Password => LoginFocus::Username,
            LoginFocus::Remember => LoginFocus::Password,
            LoginFocus::Button => LoginFocus::Remember,
        }
    }
}

pub struct App {
    pub config: Config,
    pub tokens: TokenStore,
    pub api: ApiClient,
    pub router: Router,
    pub notices: NoticeBoard,

    pub state: AppState,

    pub login_username: String,
    pub login_password: String,
    pub login_remember: bool,
    pub login_focus: LoginFocus,
    pub login_error: Option<String>,

    /// Last payload fetched on the index screen, pretty-printed
    pub index_payload: Option<String>,
    pub status_message: Option<String>,
}

impl App {
    /// Create a new application instance
    pub fn new() -> Result<Self> {
        let config = match Config::load() {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "Failed to load config, using defaults");
                Config::default()
            }
        };
        debug!(base_url = %config.base_url, backend = ?config.persistent_backend, "Config loaded");

        let cache_dir = config.cache_dir().unwrap_or_else(|_| PathBuf::from("./cache"));
        let persistent: Arc<dyn StorageArea> = match config.persistent_backend {
            PersistentBackend::File => Arc::new(FileStorage::new(&cache_dir)),
            PersistentBackend::Keychain => Arc::new(KeychainStorage::new()),
        };

        let notices = NoticeBoard::new();
        let notifier = Arc::new(notices.clone());
        let tokens = TokenStore::new(persistent, Arc::new(MemoryStorage::new()), notifier.clone());
        let api = ApiClient::new(&config, tokens.clone(), notifier)?;
        let router = Router::new(tokens.clone());

        // Get credentials from env vars or config
        let login_username = std::env::var(USERNAME_ENV)
            .ok()
            .or_else(|| config.last_username.clone())
            .unwrap_or_default();
        let login_password = std::env::var(PASSWORD_ENV).unwrap_or_default();
        let login_focus = if login_username.is_empty() {
            LoginFocus::Username
        } else {
            LoginFocus::Password
        };

        let mut app = Self {
            config,
            tokens,
            api,
            router,
            notices,
            state: AppState::Normal,
            login_username,
            login_password,
            login_remember: false,
            login_focus,
            login_error: None,
            index_payload: None,
            status_message: None,
        };
        app.navigate(HOME_PATH);
        Ok(app)
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    pub fn screen(&self) -> Screen {
        match self.router.current() {
            Some(location) if location.path == INDEX_PATH => Screen::Index,
            _ => Screen::Welcome,
        }
    }

    pub fn navigate(&mut self, path: &str) {
        match self.router.navigate(path) {
            Ok(location) => debug!(name = location.name, "Screen changed"),
            Err(e) => {
                warn!(error = %e, "Navigation failed");
                self.status_message = Some(e.to_string());
            }
        }
    }

    /// Re-run the guard for the current screen after the login state changed
    pub fn refresh_route(&mut self) {
        if let Err(e) = self.router.refresh() {
            warn!(error = %e, "Navigation failed");
        }
    }

    /// Username shown on the index screen
    pub fn display_username(&self) -> &str {
        self.config.last_username.as_deref().unwrap_or("unknown user")
    }

    pub fn storage_scope(&self) -> Option<StorageScope> {
        self.tokens.scope()
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    /// Attempt login with the credentials from the login form
    pub async fn attempt_login(&mut self) -> Result<()> {
        let username = self.login_username.trim().to_string();
        let password = self.login_password.clone();

        if username.is_empty() || password.is_empty() {
            self.login_error = Some("Username and password required".to_string());
            return Err(anyhow::anyhow!("Username and password required"));
        }

        self.login_error = None;

        match self.api.login(&username, &password, self.login_remember).await {
            Ok(auth) => {
                self.config.last_username = Some(auth.username);
                if let Err(e) = self.config.save() {
                    warn!(error = %e, "Failed to save config");
                }
                self.login_password.clear();
                self.navigate(INDEX_PATH);
                Ok(())
            }
            Err(e) => {
                self.login_error = Some(Self::user_message(&e));
                Err(e.into())
            }
        }
    }

    /// Short text for the login form; the notice carries the rest
    fn user_message(error: &RequestError) -> String {
        match error {
            RequestError::Failure { message, .. } if !message.is_empty() => message.clone(),
            RequestError::Failure { code, .. } => format!("Login failed (code {})", code),
            RequestError::Transport(_) => {
                "Unable to connect to server. Check your connection.".to_string()
            }
            RequestError::Storage(_) => "Could not save the session".to_string(),
        }
    }

    pub async fn logout(&mut self) {
        if self.api.logout().await.is_ok() {
            self.index_payload = None;
            self.start_login();
        }
        self.refresh_route();
    }

    /// Reset the login form for a fresh attempt
    pub fn start_login(&mut self) {
        self.login_focus = if self.login_username.is_empty() {
            LoginFocus::Username
        } else {
            LoginFocus::Password
        };
        self.login_error = None;
    }

    /// Interactive login on the plain terminal (used for `--login`)
    pub async fn login_interactive(&mut self) -> Result<()> {
        let username = match self.config.last_username.clone() {
            Some(last_user) => {
                print!("Username [{}]: ", last_user);
                io::stdout().flush()?;
                let input = Self::read_line()?;
                if input.is_empty() {
                    last_user
                } else {
                    input
                }
            }
            None => {
                print!("Username: ");
                io::stdout().flush()?;
                Self::read_line()?
            }
        };
        let password = rpassword::prompt_password("Password: ")?;

        println!("\nAuthenticating...");
        let auth = self.api.login(&username, &password, true).await?;

        self.config.last_username = Some(auth.username);
        self.config.save()?;
        info!("Interactive login complete");
        Ok(())
    }

    fn read_line() -> Result<String> {
        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        Ok(input.trim().to_string())
    }

    // =========================================================================
    // Index
    // =========================================================================

    /// Fetch the configured path and keep the payload for display
    pub async fn fetch_index(&mut self) {
        let Some(path) = self.config.index_fetch_path.clone() else {
            self.status_message = Some("Set index_fetch_path in config to fetch data".to_string());
            return;
        };

        self.status_message = None;
        match self.api.get::<Value>(&path).await {
            Ok(data) => {
                self.index_payload =
                    Some(serde_json::to_string_pretty(&data).unwrap_or_else(|_| data.to_string()));
            }
            Err(e) => debug!(error = %e, "Index fetch failed"),
        }
        // The header lookup may have found the credential expired.
        self.refresh_route();
    }
}

// ============================================================================
// Input validation helpers (exported for use in input.rs)
// ============================================================================

/// Check if a character is valid for input (no control characters)
fn is_valid_input_char(c: char) -> bool {
    !c.is_control()
}

/// Check if a username character should be accepted (limit counts chars)
pub fn can_add_username_char(current: &str, c: char) -> bool {
    current.chars().count() < MAX_USERNAME_LENGTH && is_valid_input_char(c)
}

/// Check if a password character should be accepted
pub fn can_add_password_char(current: &str, c: char) -> bool {
    current.chars().count() < MAX_PASSWORD_LENGTH && is_valid_input_char(c)
}

// ============================================================================
// Tests
// ============================================================================
