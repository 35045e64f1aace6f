//! In-process demo backend.
//!
//! The binary runs against a [`MemoryBackend`] so it works without a server.
//! A [`DemoPeer`] keeps the rooms alive by typing and posting now and then.

use std::time::Duration;

use murmur_core::Environment;
use murmur_harness::MemoryBackend;
use rand::{Rng, SeedableRng, rngs::StdRng, seq::SliceRandom};

const LINES: [&str; 6] = [
    "anyone around?",
    "just pushed the fix",
    "lunch in ten",
    "that build is green again",
    "can someone review my branch?",
    "brb",
];

/// Seed rooms and profiles for a local session.
///
/// Rooms are created in the order given, which is also the sidebar order.
pub fn seed_backend(user_id: &str, username: &str, rooms: &[String]) -> MemoryBackend {
    let backend = MemoryBackend::new();
    backend.seed_profile(user_id, username);
    for room in rooms {
        backend.seed_room(room.trim_start_matches('#'));
    }
    backend
}

/// A simulated user chatting in the seeded rooms.
pub struct DemoPeer {
    backend: MemoryBackend,
    user_id: String,
    rooms: Vec<String>,
    rng: StdRng,
}

impl DemoPeer {
    /// Register the peer's profile and post a greeting in the first room.
    pub fn join(backend: MemoryBackend, user_id: &str, rooms: &[String]) -> Self {
        let rooms: Vec<String> =
            rooms.iter().map(|r| r.trim_start_matches('#').to_owned()).collect();
        backend.seed_profile(user_id, user_id);

        if let Some(first) = rooms.first()
            && let Err(error) = backend.insert_as(user_id, first, "hi! type /help to get started")
        {
            tracing::warn!(%error, peer = user_id, "demo greeting failed");
        }

        Self { backend, user_id: user_id.to_owned(), rooms, rng: StdRng::from_entropy() }
    }

    /// Chat forever: pause, type for a moment, then post.
    pub async fn run<E: Environment>(mut self, env: E) {
        loop {
            let pause = Duration::from_millis(self.rng.gen_range(4_000..12_000));
            env.sleep(pause).await;

            let Some(room) = self.rooms.choose(&mut self.rng).cloned() else {
                return;
            };
            let line = LINES.choose(&mut self.rng).copied().unwrap_or("hi");

            self.backend.track_as(&room, &self.user_id, true);
            env.sleep(Duration::from_millis(self.rng.gen_range(800..2_500))).await;
            self.backend.track_as(&room, &self.user_id, false);

            match self.backend.insert_as(&self.user_id, &room, line) {
                Ok(row) => {
                    tracing::debug!(peer = %self.user_id, %room, message_id = %row.id, "demo peer posted");
                },
                Err(error) => {
                    tracing::warn!(%error, peer = %self.user_id, %room, "demo peer post failed");
                },
            }

            // Clocks that never block would otherwise starve the executor.
            tokio::task::yield_now().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use murmur_harness::SimEnv;

    use super::*;

    fn rooms(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| (*n).to_owned()).collect()
    }

    #[test]
    fn seeding_keeps_room_order() {
        let backend = seed_backend("alice", "alice", &rooms(&["#general", "random"]));

        let names: Vec<_> = backend.rooms().into_iter().map(|r| r.name).collect();
        assert_eq!(names, ["general", "random"]);
        assert_eq!(backend.profile("alice").map(|p| p.username), Some("alice".into()));
    }

    #[test]
    fn peer_greets_first_room() {
        let backend = seed_backend("alice", "alice", &rooms(&["general", "random"]));
        DemoPeer::join(backend.clone(), "bob", &rooms(&["general", "random"]));

        let greeting = backend.messages_in("general");
        assert_eq!(greeting.len(), 1);
        assert_eq!(greeting[0].user_id.as_str(), "bob");
        assert!(backend.messages_in("random").is_empty());
    }

    #[tokio::test]
    async fn peer_posts_on_virtual_time() {
        let backend = seed_backend("alice", "alice", &rooms(&["general"]));
        let peer = DemoPeer::join(backend.clone(), "bob", &rooms(&["general"]));

        let env = SimEnv::new();
        let task = tokio::spawn(peer.run(env));
        while backend.messages_in("general").len() < 3 {
            tokio::task::yield_now().await;
        }
        task.abort();

        assert!(backend.typing_in("general").is_empty());
    }
}
