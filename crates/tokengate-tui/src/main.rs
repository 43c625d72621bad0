//! tokengate - terminal front end for a token-authenticated backend.
//!
//! Shows a login screen until a valid bearer token is stored, then the
//! authenticated index screen. Screen changes go through the route guard.

mod app;
mod ui;

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::{App, AppState};
use tokengate_core::auth::StorageScope;
use tokengate_core::config::Config;
use ui::input::handle_input;
use ui::render::render;

// ============================================================================
// Constants
// ============================================================================

/// Timeout for polling terminal events (in milliseconds)
const EVENT_POLL_TIMEOUT_MS: u64 = 100;

/// Log file name in the cache directory
const LOG_FILE: &str = "tokengate.log";

const USAGE: &str = "\
Usage: tokengate [--status | --login | --logout | --help]

Without arguments the terminal UI starts.

  --status   Print whether a valid session is stored
  --login    Log in on the plain terminal and remember the session
  --logout   Log out and forget the stored session";

/// Initialize the tracing subscriber for logging.
///
/// The TUI owns the terminal, so logs go to a file in the cache directory.
/// Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug).
fn init_tracing() -> WorkerGuard {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let log_dir = Config::default()
        .cache_dir()
        .unwrap_or_else(|_| PathBuf::from("./cache"));
    let file_appender = tracing_appender::rolling::never(log_dir, LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let _log_guard = init_tracing();
    info!("tokengate starting");

    let args: Vec<String> = std::env::args().collect();
    if let Some(command) = args.get(1) {
        return run_command(command).await;
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = match App::new() {
        Ok(mut app) => run_app(&mut terminal, &mut app).await,
        Err(e) => Err(e),
    };

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
    }

    info!("tokengate shutting down");
    Ok(())
}

/// Non-interactive commands
async fn run_command(command: &str) -> Result<()> {
    if matches!(command, "--help" | "-h") {
        println!("{}", USAGE);
        return Ok(());
    }

    let mut app = App::new()?;
    let outcome = match command {
        "--status" => {
            match app.tokens.credential() {
                Some(credential) => {
                    let scope = match app.storage_scope() {
                        Some(StorageScope::Session) => "session",
                        _ => "persistent",
                    };
                    println!(
                        "Authenticated as {} ({} storage, expires in {} min)",
                        app.display_username(),
                        scope,
                        credential.minutes_until_expiry()
                    );
                }
                None => println!("Not authenticated"),
            }
            Ok(())
        }
        "--login" => app.login_interactive().await,
        "--logout" => app.api.logout().await.map_err(Into::into),
        other => {
            eprintln!("Unknown argument: {}\n\n{}", other, USAGE);
            Ok(())
        }
    };

    // Notices would have been toasts in the UI
    for notice in app.notices.history() {
        eprintln!("{}", notice.text);
    }
    outcome
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    info!(base_url = %app.api.base_url(), "UI running");

    loop {
        terminal.draw(|f| render(f, app))?;

        if event::poll(Duration::from_millis(EVENT_POLL_TIMEOUT_MS))? {
            if let Event::Key(key) = event::read()? {
                // Ctrl+C to quit
                if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                    return Ok(());
                }

                if handle_input(app, key).await? {
                    return Ok(());
                }
            }
        }

        if matches!(app.state, AppState::Quitting) {
            return Ok(());
        }
    }
}
