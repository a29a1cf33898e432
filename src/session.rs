//! Session lifecycle
//!
//! Join and disconnect sequencing on top of the dispatcher state.

use tracing::info;

use crate::dispatcher::{DispatchResult, MessageDispatcher, Outbound};
use crate::message::ServerMessage;
use crate::types::{ClientId, RoomId};

impl MessageDispatcher {
    /// Register a connection and bring it into the default room
    ///
    /// Sends, in order: the presence list and a joined notice to everyone,
    /// then the room list and the room's history to the joiner.
    pub fn join(&mut self, client_id: ClientId, username: String) -> DispatchResult {
        self.rooms.room(&RoomId::general())?;
        let connection = self.registry.register(client_id, username)?;
        let room = connection.current_room.clone();
        self.rooms.clear_unread(&room, client_id)?;

        info!("{} joined the chat as {}", client_id, connection.username);

        Ok(vec![
            self.presence_list(),
            Outbound::everyone(ServerMessage::UserJoined {
                id: client_id,
                username: connection.username,
            }),
            Outbound::to(
                client_id,
                ServerMessage::RoomList {
                    rooms: self.rooms.room_list(client_id),
                },
            ),
            Outbound::to(
                client_id,
                ServerMessage::HistorySnapshot {
                    messages: self.rooms.history(&room)?,
                    room,
                },
            ),
        ])
    }

    /// Forget a connection
    ///
    /// Unread counters keyed by the departed id stay behind in the rooms.
    /// Disconnecting an id that never joined produces nothing.
    pub fn disconnect(&mut self, client_id: ClientId) -> Vec<Outbound> {
        self.presence.clear(client_id);
        let Some(connection) = self.registry.remove(client_id) else {
            return Vec::new();
        };

        info!("{} left the chat", connection.username);

        vec![
            self.presence_list(),
            Outbound::to_many(
                self.registry.in_room(&connection.current_room),
                ServerMessage::UserLeft {
                    id: client_id,
                    username: connection.username,
                },
            ),
        ]
    }
}
