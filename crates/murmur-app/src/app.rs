//! Application state machine.
//!
//! This module defines the [`App`] state machine, which manages the
//! interactive state of the application completely decoupled from I/O and
//! session mechanics.
//!
//! This is a pure state machine: it consumes [`crate::AppEvent`] inputs and
//! produces [`crate::AppAction`] instructions for the runtime to execute.
//!
//! # Responsibilities
//!
//! - Mirrors the room list and the active room's view as reported by the
//!   session. The App never switches rooms itself; it asks for a switch and
//!   waits for the session to confirm it.
//! - Owns the compose buffer and turns Enter into messages or commands.
//! - Stores terminal dimensions and the last transient notice.

use murmur_core::{Room, RoomId};

use crate::{
    AppAction, AppEvent, ChannelView, InputState, KeyInput, SessionState,
    commands::{self, Command},
};

/// Application state machine.
///
/// Pure state machine that processes events and produces actions.
/// No I/O dependencies - fully testable in simulation.
#[derive(Debug, Clone)]
pub struct App {
    /// Session lifecycle as last reported.
    state: SessionState,
    /// Rooms in sidebar order (creation time).
    rooms: Vec<Room>,
    /// View of the active room. `None` until a room is selected.
    channel: Option<ChannelView>,
    /// Compose buffer.
    input: InputState,
    /// Terminal dimensions (columns, rows).
    terminal_size: (u16, u16),
    /// Transient status message. `None` if no message.
    status_message: Option<String>,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    /// Create a new App waiting for the session to start.
    pub fn new() -> Self {
        Self {
            state: SessionState::Starting,
            rooms: Vec::new(),
            channel: None,
            input: InputState::new(),
            terminal_size: (80, 24),
            status_message: None,
        }
    }

    /// Process an event and return actions.
    pub fn handle(&mut self, event: AppEvent) -> Vec<AppAction> {
        match event {
            AppEvent::Key(key) => self.handle_key(key),
            AppEvent::Tick => vec![],
            AppEvent::Resize(cols, rows) => {
                self.terminal_size = (cols, rows);
                vec![AppAction::Render]
            },
            AppEvent::SessionStarted => {
                self.state = SessionState::Online { username: None };
                vec![AppAction::Render]
            },
            AppEvent::SessionEnded => {
                self.state = SessionState::Ended;
                self.channel = None;
                self.status_message = Some("Logged out".into());
                vec![AppAction::Render]
            },
            AppEvent::RoomsUpdated(rooms) => {
                self.rooms = rooms;
                vec![AppAction::Render]
            },
            AppEvent::ProfileUpdated(profile) => {
                if self.state != SessionState::Ended {
                    self.state = SessionState::Online { username: Some(profile.username) };
                }
                vec![AppAction::Render]
            },
            AppEvent::RoomSelected { room_id } => {
                self.channel = Some(ChannelView::new(room_id));
                vec![AppAction::Render]
            },
            AppEvent::MessagesUpdated { room_id, messages } => {
                if let Some(view) = self.channel_for(&room_id) {
                    view.messages = messages;
                }
                vec![AppAction::Render]
            },
            AppEvent::TypingUpdated { room_id, usernames } => {
                if let Some(view) = self.channel_for(&room_id) {
                    view.typing = usernames;
                }
                vec![AppAction::Render]
            },
            AppEvent::ReactionsUpdated { room_id, message_id, counts } => {
                if let Some(view) = self.channel_for(&room_id) {
                    view.reactions.insert(message_id, counts);
                }
                vec![AppAction::Render]
            },
            AppEvent::MessageSent { content } => {
                if self.input.buffer().trim() == content {
                    self.input.clear();
                }
                vec![AppAction::Render]
            },
            AppEvent::Notice { message } => {
                self.status_message = Some(message);
                vec![AppAction::Render]
            },
            AppEvent::Error { message } => {
                self.status_message = Some(format!("Error: {message}"));
                vec![AppAction::Render]
            },
        }
    }

    fn channel_for(&mut self, room_id: &RoomId) -> Option<&mut ChannelView> {
        self.channel.as_mut().filter(|view| &view.room_id == room_id)
    }

    /// Handle keyboard input.
    fn handle_key(&mut self, key: KeyInput) -> Vec<AppAction> {
        match key {
            KeyInput::Char(_) | KeyInput::Backspace | KeyInput::Delete => {
                if !self.input.apply(key) {
                    return vec![];
                }
                vec![AppAction::Typing, AppAction::Render]
            },
            KeyInput::Left | KeyInput::Right | KeyInput::Home | KeyInput::End => {
                self.input.apply(key);
                vec![AppAction::Render]
            },
            KeyInput::Enter => self.handle_enter(),
            KeyInput::Tab => self.cycle_room(true),
            KeyInput::BackTab => self.cycle_room(false),
            KeyInput::Esc => vec![AppAction::Quit],
            KeyInput::Up | KeyInput::Down => vec![],
        }
    }

    /// Handle Enter key (send message or execute command).
    ///
    /// Messages stay in the buffer until the session confirms them, so a
    /// failed send leaves the draft for resubmission.
    fn handle_enter(&mut self) -> Vec<AppAction> {
        if self.input.buffer().trim().is_empty() {
            return vec![];
        }

        let command = commands::parse(self.input.buffer());
        if let Command::Message { content } = command {
            return self.send_message(content);
        }

        self.input.clear();
        match command {
            Command::Message { .. } => vec![],
            Command::Join { room } => self.join(&room),
            Command::React { index, symbol } => self.react(index, symbol),
            Command::Retry => vec![AppAction::RetryHistory, AppAction::Render],
            Command::Logout => vec![AppAction::Logout],
            Command::Quit => vec![AppAction::Quit],
            Command::Help => self.status(commands::HELP),
            Command::Unknown { input } => self.status(format!("Unknown command: /{input}")),
            Command::InvalidArgs { command, error } => self.status(format!("/{command}: {error}")),
        }
    }

    /// Send a message to the active room.
    pub fn send_message(&mut self, content: String) -> Vec<AppAction> {
        if self.channel.is_none() {
            return self.status("No room selected");
        }
        vec![AppAction::SendMessage { content }, AppAction::Render]
    }

    /// Switch to a room by name (with or without `#`) or id.
    pub fn join(&mut self, room: &str) -> Vec<AppAction> {
        let wanted = room.trim_start_matches('#');
        let found = self
            .rooms
            .iter()
            .find(|r| r.name.trim_start_matches('#') == wanted || r.id.as_str() == wanted);

        match found {
            Some(room) => vec![AppAction::SelectRoom { room_id: room.id.clone() }, AppAction::Render],
            None => self.status(format!("No room named {room}")),
        }
    }

    /// React to the n-th displayed message (1-based).
    pub fn react(&mut self, index: usize, symbol: String) -> Vec<AppAction> {
        let message_id = self
            .channel
            .as_ref()
            .and_then(|view| view.messages.get(index.saturating_sub(1)))
            .map(|m| m.id.clone());

        match message_id {
            Some(message_id) => vec![AppAction::React { message_id, symbol }, AppAction::Render],
            None => self.status(format!("No message #{index}")),
        }
    }

    /// Ask for the next (or previous) room in sidebar order.
    fn cycle_room(&mut self, forward: bool) -> Vec<AppAction> {
        let len = self.rooms.len();
        if len == 0 {
            return vec![];
        }

        let current = self.active_room().and_then(|id| self.rooms.iter().position(|r| &r.id == id));
        let next = match (current, forward) {
            (None, _) => 0,
            (Some(i), true) => (i + 1) % len,
            (Some(i), false) => (i + len - 1) % len,
        };

        if current == Some(next) {
            return vec![];
        }
        self.rooms
            .get(next)
            .map(|room| vec![AppAction::SelectRoom { room_id: room.id.clone() }])
            .unwrap_or_default()
    }

    fn status(&mut self, message: impl Into<String>) -> Vec<AppAction> {
        self.status_message = Some(message.into());
        vec![AppAction::Render]
    }

    /// Set a status message to display to the user.
    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
    }

    /// Session lifecycle as last reported.
    pub fn session_state(&self) -> &SessionState {
        &self.state
    }

    /// Rooms in sidebar order.
    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    /// Display name of a room. Falls back to the id.
    pub fn room_name<'a>(&'a self, room_id: &'a RoomId) -> &'a str {
        self.rooms.iter().find(|r| &r.id == room_id).map_or(room_id.as_str(), |r| r.name.as_str())
    }

    /// Currently selected room. `None` before the first selection.
    pub fn active_room(&self) -> Option<&RoomId> {
        self.channel.as_ref().map(|view| &view.room_id)
    }

    /// View of the active room.
    pub fn channel(&self) -> Option<&ChannelView> {
        self.channel.as_ref()
    }

    /// Compose buffer.
    pub fn input(&self) -> &InputState {
        &self.input
    }

    /// Terminal dimensions (columns, rows).
    pub fn terminal_size(&self) -> (u16, u16) {
        self.terminal_size
    }

    /// Transient status message. `None` if no message.
    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use murmur_core::MessageRow;

    use super::*;

    fn room(id: &str, created_at: u64) -> Room {
        Room { id: id.into(), name: format!("#{id}"), created_at }
    }

    fn app_in_general() -> App {
        let mut app = App::new();
        app.handle(AppEvent::SessionStarted);
        app.handle(AppEvent::RoomsUpdated(vec![room("general", 1), room("random", 2), room("dev", 3)]));
        app.handle(AppEvent::RoomSelected { room_id: "general".into() });
        app
    }

    fn type_text(app: &mut App, text: &str) -> Vec<AppAction> {
        text.chars().flat_map(|c| app.handle(AppEvent::Key(KeyInput::Char(c)))).collect()
    }

    #[test]
    fn every_edit_announces_typing() {
        let mut app = app_in_general();
        let actions = type_text(&mut app, "hi");
        assert_eq!(actions.iter().filter(|a| **a == AppAction::Typing).count(), 2);

        let actions = app.handle(AppEvent::Key(KeyInput::Left));
        assert_eq!(actions, [AppAction::Render]);
    }

    #[test]
    fn command_edits_announce_typing() {
        let mut app = app_in_general();
        let actions = type_text(&mut app, "/help");
        assert_eq!(actions.iter().filter(|a| **a == AppAction::Typing).count(), 5);

        let actions = app.handle(AppEvent::Key(KeyInput::Backspace));
        assert_eq!(actions, [AppAction::Typing, AppAction::Render]);
    }

    #[test]
    fn enter_sends_message_and_keeps_draft_until_confirmed() {
        let mut app = app_in_general();
        type_text(&mut app, "hello");

        let actions = app.handle(AppEvent::Key(KeyInput::Enter));
        assert_eq!(actions, [AppAction::SendMessage { content: "hello".into() }, AppAction::Render]);
        assert_eq!(app.input().buffer(), "hello");

        app.handle(AppEvent::MessageSent { content: "hello".into() });
        assert!(app.input().is_empty());
    }

    #[test]
    fn confirmation_of_older_message_keeps_new_draft() {
        let mut app = app_in_general();
        type_text(&mut app, "second");
        app.handle(AppEvent::MessageSent { content: "first".into() });
        assert_eq!(app.input().buffer(), "second");
    }

    #[test]
    fn tab_requests_next_room_without_switching() {
        let mut app = app_in_general();

        let actions = app.handle(AppEvent::Key(KeyInput::Tab));
        assert_eq!(actions, [AppAction::SelectRoom { room_id: "random".into() }]);
        assert_eq!(app.active_room(), Some(&"general".into()));

        let actions = app.handle(AppEvent::Key(KeyInput::BackTab));
        assert_eq!(actions, [AppAction::SelectRoom { room_id: "dev".into() }]);
    }

    #[test]
    fn room_selected_resets_channel_view() {
        let mut app = app_in_general();
        app.handle(AppEvent::TypingUpdated { room_id: "general".into(), usernames: vec!["bob".into()] });
        app.handle(AppEvent::RoomSelected { room_id: "random".into() });

        let view = app.channel().unwrap();
        assert!(view.typing.is_empty());
        assert!(view.messages.is_empty());
    }

    #[test]
    fn updates_for_inactive_room_are_ignored() {
        let mut app = app_in_general();
        app.handle(AppEvent::TypingUpdated { room_id: "random".into(), usernames: vec!["bob".into()] });
        assert!(app.channel().unwrap().typing.is_empty());
    }

    #[test]
    fn join_command_resolves_room_names() {
        let mut app = app_in_general();
        type_text(&mut app, "/join #dev");
        let actions = app.handle(AppEvent::Key(KeyInput::Enter));

        assert_eq!(actions, [AppAction::SelectRoom { room_id: "dev".into() }, AppAction::Render]);
        assert!(app.input().is_empty());

        type_text(&mut app, "/join nowhere");
        app.handle(AppEvent::Key(KeyInput::Enter));
        assert_eq!(app.status_message(), Some("No room named nowhere"));
    }

    #[test]
    fn react_command_targets_displayed_message() {
        let mut app = app_in_general();
        let message = MessageRow {
            id: "m1".into(),
            room_id: "general".into(),
            user_id: "u2".into(),
            content: "hi".into(),
            created_at: 1,
        }
        .enrich(Some("bob".into()));
        app.handle(AppEvent::MessagesUpdated { room_id: "general".into(), messages: vec![message] });

        type_text(&mut app, "/react 1 +1");
        let actions = app.handle(AppEvent::Key(KeyInput::Enter));
        assert_eq!(actions, [
            AppAction::React { message_id: "m1".into(), symbol: "👍".into() },
            AppAction::Render
        ]);

        type_text(&mut app, "/react 2 +1");
        app.handle(AppEvent::Key(KeyInput::Enter));
        assert_eq!(app.status_message(), Some("No message #2"));
    }

    #[test]
    fn esc_quits_and_logout_ends_session() {
        let mut app = app_in_general();
        assert_eq!(app.handle(AppEvent::Key(KeyInput::Esc)), [AppAction::Quit]);

        type_text(&mut app, "/logout");
        assert_eq!(app.handle(AppEvent::Key(KeyInput::Enter)), [AppAction::Logout]);
    }

    #[test]
    fn send_without_room_sets_status() {
        let mut app = App::new();
        type_text(&mut app, "hello");
        let actions = app.handle(AppEvent::Key(KeyInput::Enter));

        assert_eq!(actions, [AppAction::Render]);
        assert_eq!(app.status_message(), Some("No room selected"));
    }
}
