use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use tokengate_core::auth::StorageScope;

use crate::app::{App, AppState, LoginFocus, Screen};

use super::styles;

pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title bar
            Constraint::Min(10),   // Main content
            Constraint::Length(2), // Status bar
        ])
        .split(frame.area());

    render_title_bar(frame, app, chunks[0]);
    match app.screen() {
        Screen::Welcome => render_login(frame, app, chunks[1]),
        Screen::Index => render_index(frame, app, chunks[1]),
    }
    render_status_bar(frame, app, chunks[2]);

    if matches!(app.state, AppState::ConfirmingQuit) {
        render_quit_overlay(frame);
    }
}

fn render_title_bar(frame: &mut Frame, app: &App, area: Rect) {
    let title = "  tokengate";
    let location = app
        .router
        .current()
        .map(|l| l.full_path.clone())
        .unwrap_or_default();
    let title_len = title.len();

    let title_line = Line::from(vec![
        Span::styled(title, styles::title_style()),
        Span::raw(" ".repeat(
            area.width
                .saturating_sub(title_len as u16 + location.len() as u16 + 4)
                as usize,
        )),
        Span::styled(location, styles::muted_style()),
    ]);

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());

    let paragraph = Paragraph::new(title_line).block(block);
    frame.render_widget(paragraph, area);
}

fn field_style(focused: bool) -> Style {
    if focused {
        styles::selected_style()
    } else {
        styles::list_item_style()
    }
}

fn render_login(frame: &mut Frame, app: &App, area: Rect) {
    let height = if app.login_error.is_some() { 12 } else { 10 };
    let area = centered_rect_fixed(46, height, area);

    let mut lines = vec![
        Line::from(Span::styled("  Welcome, please log in", styles::title_style())),
        Line::from(""),
    ];

    let username_focused = app.login_focus == LoginFocus::Username;
    let cursor = if username_focused { "▌" } else { "" };
    lines.push(Line::from(vec![
        Span::raw("      "),
        Span::styled("Username: [", styles::muted_style()),
        Span::styled(
            format!("{:<16}{}", app.login_username, cursor),
            field_style(username_focused),
        ),
        Span::styled("]", styles::muted_style()),
    ]));

    let password_focused = app.login_focus == LoginFocus::Password;
    let password_masked = mask_password(&app.login_password);
    let cursor = if password_focused { "▌" } else { "" };
    lines.push(Line::from(vec![
        Span::raw("      "),
        Span::styled("Password: [", styles::muted_style()),
        Span::styled(
            format!("{:<16}{}", password_masked, cursor),
            field_style(password_focused),
        ),
        Span::styled("]", styles::muted_style()),
    ]));

    let remember_focused = app.login_focus == LoginFocus::Remember;
    let checkbox = if app.login_remember { "[x]" } else { "[ ]" };
    lines.push(Line::from(vec![
        Span::raw("      "),
        Span::styled(format!("{} Remember me", checkbox), field_style(remember_focused)),
    ]));

    let button_focused = app.login_focus == LoginFocus::Button;
    let label = if button_focused { " ▶ Login ◀ " } else { "   Login   " };
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::raw("            ["),
        Span::styled(label, field_style(button_focused)),
        Span::raw("]"),
    ]));

    if let Some(ref error) = app.login_error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!(" {}", error),
            styles::error_style(),
        )));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_index(frame: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(3)])
        .split(area);

    let scope = match app.storage_scope() {
        Some(StorageScope::Persistent) => "remembered on this device",
        Some(StorageScope::Session) => "this session only",
        None => "none",
    };
    let summary = vec![
        Line::from(vec![
            Span::styled(" Logged in as ", styles::muted_style()),
            Span::styled(app.display_username().to_string(), styles::highlight_style()),
        ]),
        Line::from(vec![
            Span::styled(" Session: ", styles::muted_style()),
            Span::styled(scope, styles::list_item_style()),
        ]),
    ];
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(false))
        .title(" Account ");
    frame.render_widget(Paragraph::new(summary).block(block), chunks[0]);

    let body = match app.index_payload {
        Some(ref payload) => payload.clone(),
        None => "Press [r] to fetch data".to_string(),
    };
    let title = match app.config.index_fetch_path {
        Some(ref path) => format!(" {} ", path),
        None => " Data ".to_string(),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .title(title);
    frame.render_widget(
        Paragraph::new(body).block(block).wrap(Wrap { trim: false }),
        chunks[1],
    );
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let shortcuts = match app.screen() {
        Screen::Welcome => "[Tab] next field | [Space] toggle | [Esc] quit",
        Screen::Index => "[r]efresh | [l]ogout | [q]uit",
    };

    let (left_text, left_style) = if let Some(notice) = app.notices.current() {
        (format!(" {} ", notice.text), styles::notice_style(notice.level))
    } else if let Some(ref msg) = app.status_message {
        (format!(" {} ", msg), styles::muted_style())
    } else {
        (String::new(), styles::muted_style())
    };
    let right_text = format!(" {} ", shortcuts);

    let width = area.width as usize;
    let padding_len = width
        .saturating_sub(left_text.chars().count())
        .saturating_sub(right_text.len());
    let status_line = Line::from(vec![
        Span::styled(left_text, left_style),
        Span::raw(" ".repeat(padding_len)),
        Span::styled(right_text, styles::muted_style()),
    ]);
    let paragraph = Paragraph::new(status_line).style(styles::status_bar_style());
    frame.render_widget(paragraph, area);
}

/// One star per character, capped to the field width
fn mask_password(password: &str) -> String {
    "*".repeat(password.chars().count().min(16))
}

/// Create a centered rectangle with fixed dimensions
fn centered_rect_fixed(width: u16, height: u16, r: Rect) -> Rect {
    let x = r.x + (r.width.saturating_sub(width)) / 2;
    let y = r.y + (r.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(r.width), height.min(r.height))
}

fn render_quit_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(46, 7, frame.area());
    frame.render_widget(Clear, area);

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            "   Are you sure you want to quit?",
            styles::highlight_style(),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("   Press ", styles::muted_style()),
            Span::styled("[Y]", styles::help_key_style()),
            Span::styled(" to quit, ", styles::muted_style()),
            Span::styled("[N]", styles::help_key_style()),
            Span::styled(" to cancel", styles::muted_style()),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_centered_rect_fixed() {
        let outer = Rect::new(0, 0, 100, 40);
        let inner = centered_rect_fixed(46, 10, outer);
        assert_eq!(inner, Rect::new(27, 15, 46, 10));

        let small = Rect::new(0, 0, 20, 5);
        let clipped = centered_rect_fixed(46, 10, small);
        assert_eq!(clipped.width, 20);
        assert_eq!(clipped.height, 5);
    }

    #[test]
    fn test_mask_password_counts_chars() {
        assert_eq!(mask_password("héé"), "***");
        assert_eq!(mask_password(""), "");
        assert_eq!(mask_password(&"x".repeat(40)).len(), 16);
    }
}
