//! Chat area
//!
//! Displays the active room's messages, numbered for `/react`, with reaction
//! counts and the typing indicator underneath.

use murmur_app::{App, ChannelView};
use murmur_core::{Message, Timestamp};
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
};

use super::display_name;

const BORDER_SIZE: u16 = 2;
const TYPING_HEIGHT: u16 = 1;
const MILLIS_PER_MINUTE: u64 = 60_000;

/// Render the chat area.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let title = app.active_room().map_or_else(
        || " No Room ".to_owned(),
        |room_id| format!(" {} ", display_name(app.room_name(room_id))),
    );
    let block = Block::default().borders(Borders::ALL).title(title);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let Some(view) = app.channel() else {
        let hint = Paragraph::new(Line::from(Span::styled(
            "Pick a room with Tab or /join <room>",
            Style::default().fg(Color::DarkGray),
        )));
        frame.render_widget(hint, inner);
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(TYPING_HEIGHT)])
        .split(inner);
    let [messages_area, typing_area] = chunks.as_ref() else {
        return;
    };

    render_messages(frame, view, *messages_area);

    if let Some(typing) = view.typing_line() {
        let line = Span::styled(
            typing,
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        );
        frame.render_widget(Paragraph::new(Line::from(line)), *typing_area);
    }
}

/// Messages pinned to the bottom of the area.
fn render_messages(frame: &mut Frame, view: &ChannelView, area: Rect) {
    let items: Vec<ListItem> = view
        .messages
        .iter()
        .enumerate()
        .map(|(i, message)| ListItem::new(message_line(i + 1, message, view)))
        .collect();

    let visible_height = area.height as usize;
    let skip = items.len().saturating_sub(visible_height);
    let visible_items: Vec<_> = items.into_iter().skip(skip).collect();

    frame.render_widget(List::new(visible_items), area);
}

fn message_line<'a>(number: usize, message: &'a Message, view: &ChannelView) -> Line<'a> {
    let mut spans = vec![
        Span::styled(format!("{number:>2} "), Style::default().fg(Color::DarkGray)),
        Span::styled(clock(message.created_at), Style::default().fg(Color::DarkGray)),
        Span::raw(" "),
        Span::styled(
            format!("<{}>", message.author()),
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::raw(message.content.as_str()),
    ];

    if let Some(summary) = reaction_summary(view.reactions_for(&message.id)) {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(summary, Style::default().fg(Color::Yellow)));
    }

    Line::from(spans)
}

/// `HH:MM` of a millisecond timestamp, UTC.
pub(crate) fn clock(created_at: Timestamp) -> String {
    let minutes = created_at / MILLIS_PER_MINUTE;
    format!("{:02}:{:02}", (minutes / 60) % 24, minutes % 60)
}

/// Reaction counts as `👍 2 ❤️ 1`. `None` without reactions.
pub(crate) fn reaction_summary(counts: &[(String, u32)]) -> Option<String> {
    if counts.is_empty() {
        return None;
    }
    let parts: Vec<String> =
        counts.iter().map(|(symbol, count)| format!("{symbol} {count}")).collect();
    Some(parts.join(" "))
}
