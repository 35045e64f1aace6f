//! Rooms sidebar
//!
//! Displays the room list in creation order with the active room marked.

use murmur_app::App;
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem},
};

use super::display_name;

const ACTIVE_PREFIX: &str = ">";
const INACTIVE_PREFIX: &str = " ";

/// Render the rooms sidebar.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .rooms()
        .iter()
        .map(|room| {
            let (prefix, style) = if app.active_room() == Some(&room.id) {
                (ACTIVE_PREFIX, Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
            } else {
                (INACTIVE_PREFIX, Style::default())
            };

            ListItem::new(Line::from(vec![
                Span::raw(prefix),
                Span::styled(display_name(&room.name), style),
            ]))
        })
        .collect();

    let block = Block::default().borders(Borders::ALL).title(" Rooms ");
    let list = List::new(items).block(block);

    frame.render_widget(list, area);
}

#[cfg(test)]
mod tests {
    use murmur_app::{App, AppEvent};

    use crate::ui::test_support::{chatting, draw, room};

    #[test]
    fn active_room_is_marked() {
        let lines = draw(&chatting(), 40, 8);

        assert!(lines[1].starts_with("│>#general"), "got {:?}", lines[1]);
        assert!(lines[2].starts_with("│ #random"), "got {:?}", lines[2]);
    }

    #[test]
    fn rooms_keep_creation_order() {
        let mut app = App::new();
        app.handle(AppEvent::RoomsUpdated(vec![room("zeta", 1), room("#alpha", 2)]));
        let lines = draw(&app, 40, 8);

        assert!(lines[1].starts_with("│ #zeta"));
        assert!(lines[2].starts_with("│ #alpha"));
    }
}
