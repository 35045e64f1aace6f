//! Session directory.
//!
//! The room list and a cache of profiles seen during the session. The room
//! list is replaced wholesale on every reload; there is no incremental
//! diffing.

use std::collections::HashMap;

use murmur_core::{Profile, Room, RoomId, UserId};

/// Rooms and profiles known to the session.
#[derive(Debug, Clone)]
pub struct SessionDirectory {
    /// Local user.
    user_id: UserId,
    /// Rooms ordered by creation time, then id.
    rooms: Vec<Room>,
    /// Profiles by user.
    profiles: HashMap<UserId, Profile>,
    /// Whether the room list has loaded at least once.
    loaded: bool,
}

impl SessionDirectory {
    /// Create an empty directory for the local user.
    pub fn new(user_id: UserId) -> Self {
        Self { user_id, rooms: Vec::new(), profiles: HashMap::new(), loaded: false }
    }

    /// Replace the room list.
    ///
    /// Returns true if this was the first load.
    pub fn replace_rooms(&mut self, mut rooms: Vec<Room>) -> bool {
        rooms.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        self.rooms = rooms;
        !std::mem::replace(&mut self.loaded, true)
    }

    /// Rooms ordered by creation time.
    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    /// Room by id. `None` if not in the current list.
    pub fn room(&self, room_id: &RoomId) -> Option<&Room> {
        self.rooms.iter().find(|r| &r.id == room_id)
    }

    /// Whether the room list has loaded.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Cache a profile.
    pub fn remember(&mut self, profile: Profile) {
        self.profiles.insert(profile.id.clone(), profile);
    }

    /// Cached profile of a user.
    pub fn profile(&self, user_id: &UserId) -> Option<&Profile> {
        self.profiles.get(user_id)
    }

    /// The local user's profile, once loaded.
    pub fn own_profile(&self) -> Option<&Profile> {
        self.profiles.get(&self.user_id)
    }

    /// The local user's username, once loaded.
    pub fn own_username(&self) -> Option<&str> {
        self.own_profile().map(|p| p.username.as_str())
    }
}
