//! Typing indicators
//!
//! Tracks which connections are typing. The room a typer belongs to is read
//! from the registry at query time, so switching rooms mid-typing moves the
//! indicator with the connection. Clearing is always client-driven.

use std::collections::HashSet;

use crate::registry::ConnectionRegistry;
use crate::types::{ClientId, RoomId};

#[derive(Debug, Default)]
pub struct PresenceTracker {
    typing: HashSet<ClientId>,
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flag or unflag a connection as typing. Returns true if the set changed.
    pub fn set_typing(&mut self, client_id: ClientId, is_typing: bool) -> bool {
        if is_typing {
            self.typing.insert(client_id)
        } else {
            self.typing.remove(&client_id)
        }
    }

    #[cfg(test)]
    pub fn is_typing(&self, client_id: ClientId) -> bool {
        self.typing.contains(&client_id)
    }

    /// Drop any typing flag for a departed connection
    pub fn clear(&mut self, client_id: ClientId) -> bool {
        self.typing.remove(&client_id)
    }

    /// Sorted display names of the connections typing in `room`
    pub fn typing_names(&self, room: &RoomId, registry: &ConnectionRegistry) -> Vec<String> {
        let mut names: Vec<String> = self
            .typing
            .iter()
            .filter_map(|id| registry.get(*id))
            .filter(|c| &c.current_room == room)
            .map(|c| c.username.clone())
            .collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with(names: &[&str]) -> (ConnectionRegistry, Vec<ClientId>) {
        let mut registry = ConnectionRegistry::new();
        let ids = names
            .iter()
            .map(|name| {
                let id = ClientId::new();
                registry.register(id, name.to_string()).unwrap();
                id
            })
            .collect();
        (registry, ids)
    }

    #[test]
    fn test_typing_names_sorted() {
        let (registry, ids) = registry_with(&["Carol", "Alice", "Bob"]);
        let mut presence = PresenceTracker::new();
        for id in &ids {
            presence.set_typing(*id, true);
        }

        assert_eq!(
            presence.typing_names(&RoomId::general(), &registry),
            vec!["Alice", "Bob", "Carol"]
        );
    }

    #[test]
    fn test_set_typing_reports_change() {
        let (_registry, ids) = registry_with(&["Alice"]);
        let mut presence = PresenceTracker::new();

        assert!(presence.set_typing(ids[0], true));
        assert!(!presence.set_typing(ids[0], true));
        assert!(presence.is_typing(ids[0]));
        assert!(presence.set_typing(ids[0], false));
        assert!(!presence.set_typing(ids[0], false));
    }

    #[test]
    fn test_room_change_moves_indicator() {
        let (mut registry, ids) = registry_with(&["Alice", "Bob"]);
        let mut presence = PresenceTracker::new();
        presence.set_typing(ids[0], true);
        presence.set_typing(ids[1], true);

        let tech = RoomId::from("tech");
        registry.set_room(ids[1], tech.clone());

        assert_eq!(presence.typing_names(&RoomId::general(), &registry), vec!["Alice"]);
        assert_eq!(presence.typing_names(&tech, &registry), vec!["Bob"]);
    }

    #[test]
    fn test_clear_on_disconnect() {
        let (mut registry, ids) = registry_with(&["Alice"]);
        let mut presence = PresenceTracker::new();
        presence.set_typing(ids[0], true);

        registry.remove(ids[0]);
        assert!(presence.typing_names(&RoomId::general(), &registry).is_empty());
        assert!(presence.clear(ids[0]));
        assert!(!presence.is_typing(ids[0]));
    }
}
