//! Room store
//!
//! Holds the pre-provisioned rooms, each with a bounded message history and
//! per-connection unread counters.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use serde::Serialize;

use crate::chat::{ChatMessage, Mutation};
use crate::error::CoreError;
use crate::types::{ClientId, MessageId, RoomId};

/// Default number of messages kept per room
pub const DEFAULT_HISTORY_CAP: usize = 100;

/// Rooms available at startup: (id, display name)
pub const DEFAULT_ROOMS: &[(&str, &str)] = &[
    ("general", "General"),
    ("random", "Random"),
    ("tech", "Tech Talk"),
];

/// A chat room
///
/// Unread entries for connections that have since disconnected are left in
/// place; rooms are few and live for the whole process.
#[derive(Debug)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    messages: VecDeque<ChatMessage>,
    unread: HashMap<ClientId, u32>,
}

impl Room {
    pub fn new(id: RoomId, name: String) -> Self {
        Self {
            id,
            name,
            messages: VecDeque::new(),
            unread: HashMap::new(),
        }
    }

    /// Messages oldest-first
    pub fn messages(&self) -> &VecDeque<ChatMessage> {
        &self.messages
    }

    fn message_mut(&mut self, message_id: MessageId) -> Result<&mut ChatMessage, CoreError> {
        self.messages
            .iter_mut()
            .find(|m| m.id == message_id)
            .ok_or(CoreError::MessageNotFound(message_id))
    }
}

/// Entry of a `room_list` event, personalised for one connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomSummary {
    pub id: RoomId,
    pub name: String,
    pub unread_count: u32,
}

/// All rooms, keyed by id, in provisioning order
#[derive(Debug)]
pub struct RoomStore {
    rooms: HashMap<RoomId, Room>,
    order: Vec<RoomId>,
    history_cap: usize,
}

impl RoomStore {
    /// Create the store with the default rooms
    pub fn new(history_cap: usize) -> Self {
        Self::with_rooms(
            DEFAULT_ROOMS
                .iter()
                .map(|(id, name)| (RoomId::from(*id), name.to_string())),
            history_cap,
        )
    }

    /// Create the store with an explicit room set
    pub fn with_rooms(rooms: impl IntoIterator<Item = (RoomId, String)>, history_cap: usize) -> Self {
        let mut store = Self {
            rooms: HashMap::new(),
            order: Vec::new(),
            history_cap: history_cap.max(1),
        };
        for (id, name) in rooms {
            if store.rooms.contains_key(&id) {
                continue;
            }
            store.order.push(id.clone());
            store.rooms.insert(id.clone(), Room::new(id, name));
        }
        store
    }

    pub fn room(&self, room_id: &RoomId) -> Result<&Room, CoreError> {
        self.rooms
            .get(room_id)
            .ok_or_else(|| CoreError::RoomNotFound(room_id.clone()))
    }

    fn room_mut(&mut self, room_id: &RoomId) -> Result<&mut Room, CoreError> {
        self.rooms
            .get_mut(room_id)
            .ok_or_else(|| CoreError::RoomNotFound(room_id.clone()))
    }

    /// Append a message, evicting the oldest once the cap is exceeded
    pub fn append(&mut self, room_id: &RoomId, message: ChatMessage) -> Result<(), CoreError> {
        let cap = self.history_cap;
        let room = self.room_mut(room_id)?;
        room.messages.push_back(message);
        while room.messages.len() > cap {
            room.messages.pop_front();
        }
        Ok(())
    }

    pub fn find_message(
        &self,
        room_id: &RoomId,
        message_id: MessageId,
    ) -> Result<&ChatMessage, CoreError> {
        self.room(room_id)?
            .messages
            .iter()
            .find(|m| m.id == message_id)
            .ok_or(CoreError::MessageNotFound(message_id))
    }

    /// Full history, oldest-first
    pub fn history(&self, room_id: &RoomId) -> Result<Vec<ChatMessage>, CoreError> {
        Ok(self.room(room_id)?.messages.iter().cloned().collect())
    }

    /// Add one to a connection's unread counter, returning the new value
    pub fn increment_unread(&mut self, room_id: &RoomId, client_id: ClientId) -> Result<u32, CoreError> {
        let room = self.room_mut(room_id)?;
        let count = room.unread.entry(client_id).or_insert(0);
        *count += 1;
        Ok(*count)
    }

    pub fn clear_unread(&mut self, room_id: &RoomId, client_id: ClientId) -> Result<(), CoreError> {
        self.room_mut(room_id)?.unread.insert(client_id, 0);
        Ok(())
    }

    /// Unread count, 0 when never set or the room is unknown
    pub fn unread_for(&self, room_id: &RoomId, client_id: ClientId) -> u32 {
        self.rooms
            .get(room_id)
            .and_then(|room| room.unread.get(&client_id).copied())
            .unwrap_or(0)
    }

    /// Add `client_id` to the reactors of `emoji` on a message
    ///
    /// Returns the message's full reaction map.
    pub fn add_reaction(
        &mut self,
        room_id: &RoomId,
        message_id: MessageId,
        emoji: &str,
        client_id: ClientId,
    ) -> Result<Mutation<BTreeMap<String, BTreeSet<ClientId>>>, CoreError> {
        let message = self.room_mut(room_id)?.message_mut(message_id)?;
        let added = message.add_reaction(emoji, client_id);
        let reactions = message.reactions.clone();
        Ok(if added {
            Mutation::Changed(reactions)
        } else {
            Mutation::Unchanged(reactions)
        })
    }

    /// Add `client_id` to a message's read receipts
    pub fn mark_read(
        &mut self,
        room_id: &RoomId,
        message_id: MessageId,
        client_id: ClientId,
    ) -> Result<Mutation<BTreeSet<ClientId>>, CoreError> {
        let message = self.room_mut(room_id)?.message_mut(message_id)?;
        let added = message.mark_read(client_id);
        let read_by = message.read_by.clone();
        Ok(if added {
            Mutation::Changed(read_by)
        } else {
            Mutation::Unchanged(read_by)
        })
    }

    /// Room list with the unread counts of one connection
    pub fn room_list(&self, client_id: ClientId) -> Vec<RoomSummary> {
        self.order
            .iter()
            .filter_map(|id| self.rooms.get(id))
            .map(|room| RoomSummary {
                id: room.id.clone(),
                name: room.name.clone(),
                unread_count: room.unread.get(&client_id).copied().unwrap_or(0),
            })
            .collect()
    }
}

impl Default for RoomStore {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAP)
    }
}
