//! Status bar
//!
//! Displays the session state, the active room and the last notice.

use murmur_app::{App, SessionState};
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
};

use super::display_name;

/// Render the status bar.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let session_status = match app.session_state() {
        SessionState::Starting => Span::styled("Connecting...", Style::default().fg(Color::Yellow)),
        SessionState::Online { username } => Span::styled(
            username
                .as_ref()
                .map_or_else(|| "Online".to_owned(), |name| format!("Online as {name}")),
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        ),
        SessionState::Ended => Span::styled("Offline", Style::default().fg(Color::Red)),
    };

    let room_info = app.channel().map_or_else(String::new, |view| {
        let name = display_name(app.room_name(&view.room_id));
        format!(" | {name} | Messages: {}", view.messages.len())
    });

    let mut spans = vec![
        Span::raw(" "),
        session_status,
        Span::styled(room_info, Style::default().fg(Color::Gray)),
    ];
    if let Some(notice) = app.status_message() {
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(notice, Style::default().fg(Color::White)));
    }

    let paragraph = Paragraph::new(Line::from(spans))
        .style(Style::default().bg(Color::DarkGray).fg(Color::White));

    frame.render_widget(paragraph, area);
}
