//! Keyboard input handling for the TUI.
//!
//! This module handles all keyboard events and translates them into
//! application state changes.

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};

use crate::app::{can_add_password_char, can_add_username_char, App, AppState, LoginFocus, Screen};

/// Handle keyboard input. Returns true if the app should quit.
pub async fn handle_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    // Handle quit confirmation
    if matches!(app.state, AppState::ConfirmingQuit) {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                app.state = AppState::Quitting;
                return Ok(true);
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                app.state = AppState::Normal;
            }
            _ => {}
        }
        return Ok(false);
    }

    match app.screen() {
        Screen::Welcome => handle_login_input(app, key).await,
        Screen::Index => handle_index_input(app, key).await,
    }
}

async fn handle_login_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match key.code {
        KeyCode::Esc => {
            // Quit if on login screen
            app.state = AppState::Quitting;
            return Ok(true);
        }
        KeyCode::Down | KeyCode::Tab => {
            app.login_focus = app.login_focus.next();
        }
        KeyCode::Up | KeyCode::BackTab => {
            app.login_focus = app.login_focus.prev();
        }
        KeyCode::Enter => match app.login_focus {
            LoginFocus::Username | LoginFocus::Password => {
                app.login_focus = app.login_focus.next();
            }
            LoginFocus::Remember => {
                app.login_remember = !app.login_remember;
            }
            LoginFocus::Button => {
                // On failure login_error is set and the screen stays
                let _ = app.attempt_login().await;
            }
        },
        KeyCode::Backspace => match app.login_focus {
            LoginFocus::Username => {
                app.login_username.pop();
            }
            LoginFocus::Password => {
                app.login_password.pop();
            }
            LoginFocus::Remember | LoginFocus::Button => {}
        },
        KeyCode::Char(' ') if app.login_focus == LoginFocus::Remember => {
            app.login_remember = !app.login_remember;
        }
        KeyCode::Char(c) => match app.login_focus {
            LoginFocus::Username => {
                if can_add_username_char(&app.login_username, c) {
                    app.login_username.push(c);
                }
            }
            LoginFocus::Password => {
                if can_add_password_char(&app.login_password, c) {
                    app.login_password.push(c);
                }
            }
            LoginFocus::Remember | LoginFocus::Button => {}
        },
        _ => {}
    }
    Ok(false)
}

async fn handle_index_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => {
            app.state = AppState::ConfirmingQuit;
        }
        KeyCode::Char('r') => {
            app.fetch_index().await;
        }
        KeyCode::Char('l') => {
            app.logout().await;
        }
        _ => {}
    }
    Ok(false)
}
