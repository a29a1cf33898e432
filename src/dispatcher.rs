//! Event dispatcher
//!
//! Owns the registry, room store and typing tracker. Each inbound event is
//! resolved to a connection, applied to the state, and turned into a list of
//! outbound events, each paired with the connections that should receive it.
//! Nothing here touches the transport, so every operation is synchronous.

use tracing::{debug, info, warn};

use crate::chat::{ChatMessage, DirectMessage, Payload};
use crate::error::CoreError;
use crate::message::{ClientMessage, ServerMessage};
use crate::presence::PresenceTracker;
use crate::registry::{Connection, ConnectionRegistry};
use crate::room::RoomStore;
use crate::search::{self, DEFAULT_PAGE_SIZE};
use crate::types::{ClientId, MessageId, RoomId, Status};

/// Who an outbound event is delivered to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Audience {
    /// A single connection
    Connection(ClientId),
    /// An explicit set of connections, resolved at dispatch time
    Connections(Vec<ClientId>),
    /// Every open connection
    Everyone,
}

/// An event together with its audience
#[derive(Debug, Clone)]
pub struct Outbound {
    pub audience: Audience,
    pub event: ServerMessage,
}

impl Outbound {
    pub fn to(client_id: ClientId, event: ServerMessage) -> Self {
        Self {
            audience: Audience::Connection(client_id),
            event,
        }
    }

    pub fn to_many(client_ids: Vec<ClientId>, event: ServerMessage) -> Self {
        Self {
            audience: Audience::Connections(client_ids),
            event,
        }
    }

    pub fn everyone(event: ServerMessage) -> Self {
        Self {
            audience: Audience::Everyone,
            event,
        }
    }
}

pub type DispatchResult = Result<Vec<Outbound>, CoreError>;

/// Holds all shared chat state
///
/// Callers serialize access (the `ChatServer` actor owns the only instance),
/// so every snapshot taken here reflects fully applied mutations.
#[derive(Debug)]
pub struct MessageDispatcher {
    pub(crate) registry: ConnectionRegistry,
    pub(crate) rooms: RoomStore,
    pub(crate) presence: PresenceTracker,
    page_size: usize,
}

impl MessageDispatcher {
    pub fn new(
        registry: ConnectionRegistry,
        rooms: RoomStore,
        presence: PresenceTracker,
        page_size: usize,
    ) -> Self {
        Self {
            registry,
            rooms,
            presence,
            page_size: page_size.max(1),
        }
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn rooms(&self) -> &RoomStore {
        &self.rooms
    }

    pub fn presence(&self) -> &PresenceTracker {
        &self.presence
    }

    /// Handle one inbound event from `client_id`
    ///
    /// Not-found outcomes are dropped; other errors are reported back to the
    /// requester only.
    pub fn handle(&mut self, client_id: ClientId, msg: ClientMessage) -> Vec<Outbound> {
        let result = match msg {
            ClientMessage::Join { username } => self.join(client_id, username),
            ClientMessage::SendMessage { message } => {
                self.send_message(client_id, Payload::Text { message })
            }
            ClientMessage::SendFile {
                file_name,
                file_data,
                file_type,
            } => self.send_message(
                client_id,
                Payload::File {
                    file_name,
                    file_data,
                    file_type,
                },
            ),
            ClientMessage::JoinRoom { room } => self.join_room(client_id, room),
            ClientMessage::AddReaction {
                message_id,
                emoji,
                room,
            } => self.add_reaction(client_id, &room, message_id, &emoji),
            ClientMessage::MarkAsRead { message_id, room } => {
                self.mark_as_read(client_id, &room, message_id)
            }
            ClientMessage::ChangeStatus { status } => self.change_status(client_id, status),
            ClientMessage::Typing { is_typing } => self.typing(client_id, is_typing),
            ClientMessage::SearchMessages { query, room } => self.search(client_id, &room, query),
            ClientMessage::LoadMoreMessages { room, before } => {
                self.load_more(client_id, &room, before)
            }
            ClientMessage::PrivateMessage { to, message } => {
                self.private_message(client_id, to, message)
            }
        };

        match result {
            Ok(outbound) => outbound,
            Err(err) if err.is_not_found() => {
                debug!("Dropping request from {}: {}", client_id, err);
                Vec::new()
            }
            Err(err) => {
                warn!("Rejecting request from {}: {}", client_id, err);
                vec![Outbound::to(client_id, err.into())]
            }
        }
    }

    pub(crate) fn connection(&self, client_id: ClientId) -> Result<&Connection, CoreError> {
        self.registry
            .get(client_id)
            .ok_or(CoreError::ConnectionNotFound(client_id))
    }

    /// Post a text or file message to the sender's current room
    ///
    /// Every other connection viewing a different room gets one more unread
    /// message for the target room and a fresh room list.
    pub fn send_message(&mut self, client_id: ClientId, payload: Payload) -> DispatchResult {
        let sender = self.connection(client_id)?;
        let room = sender.current_room.clone();
        let message = ChatMessage::new(client_id, sender.username.clone(), room.clone(), payload);

        self.rooms.append(&room, message.clone())?;
        self.registry.touch(client_id);

        let elsewhere: Vec<ClientId> = self
            .registry
            .list_all()
            .into_iter()
            .filter(|c| c.id != client_id && c.current_room != room)
            .map(|c| c.id)
            .collect();
        for other in &elsewhere {
            self.rooms.increment_unread(&room, *other)?;
        }

        debug!("Message {} from {} in {}", message.id, client_id, room);

        let mut outbound = vec![Outbound::to_many(
            self.registry.in_room(&room),
            ServerMessage::ReceiveMessage { message },
        )];
        outbound.extend(elsewhere.into_iter().map(|other| {
            Outbound::to(
                other,
                ServerMessage::RoomList {
                    rooms: self.rooms.room_list(other),
                },
            )
        }));
        Ok(outbound)
    }

    /// Switch the connection to `room` and clear its unread count there
    pub fn join_room(&mut self, client_id: ClientId, room: RoomId) -> DispatchResult {
        let history = self.rooms.history(&room)?;
        if !self.registry.set_room(client_id, room.clone()) {
            return Err(CoreError::ConnectionNotFound(client_id));
        }
        self.rooms.clear_unread(&room, client_id)?;

        info!("Client {} switched to room {}", client_id, room);

        Ok(vec![
            Outbound::to(
                client_id,
                ServerMessage::HistorySnapshot {
                    room,
                    messages: history,
                },
            ),
            Outbound::to(
                client_id,
                ServerMessage::RoomList {
                    rooms: self.rooms.room_list(client_id),
                },
            ),
        ])
    }

    /// React to a message; duplicates are not broadcast
    pub fn add_reaction(
        &mut self,
        client_id: ClientId,
        room: &RoomId,
        message_id: MessageId,
        emoji: &str,
    ) -> DispatchResult {
        self.connection(client_id)?;
        let Some(reactions) = self
            .rooms
            .add_reaction(room, message_id, emoji, client_id)?
            .changed()
        else {
            return Ok(Vec::new());
        };

        Ok(vec![Outbound::to_many(
            self.registry.in_room(room),
            ServerMessage::ReactionAdded {
                message_id,
                emoji: emoji.to_string(),
                user_id: client_id,
                reactions,
            },
        )])
    }

    /// Record a read receipt; duplicates are not broadcast
    pub fn mark_as_read(
        &mut self,
        client_id: ClientId,
        room: &RoomId,
        message_id: MessageId,
    ) -> DispatchResult {
        self.connection(client_id)?;
        let Some(read_by) = self.rooms.mark_read(room, message_id, client_id)?.changed() else {
            return Ok(Vec::new());
        };

        Ok(vec![Outbound::to_many(
            self.registry.in_room(room),
            ServerMessage::MessageRead {
                message_id,
                user_id: client_id,
                read_by,
            },
        )])
    }

    pub fn change_status(&mut self, client_id: ClientId, status: Status) -> DispatchResult {
        if !self.registry.set_status(client_id, status) {
            return Err(CoreError::ConnectionNotFound(client_id));
        }
        debug!("Client {} is now {:?}", client_id, status);
        Ok(vec![self.presence_list()])
    }

    /// Update the typing flag and send the room its typing names
    pub fn typing(&mut self, client_id: ClientId, is_typing: bool) -> DispatchResult {
        let room = self.connection(client_id)?.current_room.clone();
        self.presence.set_typing(client_id, is_typing);

        Ok(vec![Outbound::to_many(
            self.registry.in_room(&room),
            ServerMessage::TypingUsers {
                users: self.presence.typing_names(&room, &self.registry),
                room,
            },
        )])
    }

    pub fn search(&self, client_id: ClientId, room: &RoomId, query: String) -> DispatchResult {
        self.connection(client_id)?;
        let results = search::search(&self.rooms, room, &query)?;
        Ok(vec![Outbound::to(
            client_id,
            ServerMessage::SearchResults { results, query },
        )])
    }

    pub fn load_more(&self, client_id: ClientId, room: &RoomId, before: MessageId) -> DispatchResult {
        self.connection(client_id)?;
        let page = search::older_than(&self.rooms, room, before, self.page_size)?;
        Ok(vec![Outbound::to(
            client_id,
            ServerMessage::OlderPage {
                room: room.clone(),
                messages: page.messages,
                has_more: page.has_more,
            },
        )])
    }

    /// Relay a one-to-one message to the recipient and echo it to the sender
    pub fn private_message(&mut self, client_id: ClientId, to: ClientId, message: String) -> DispatchResult {
        let sender = self.connection(client_id)?.username.clone();
        self.connection(to)?;
        self.registry.touch(client_id);

        let direct = DirectMessage::new(client_id, sender, to, message);
        let mut audience = vec![to];
        if to != client_id {
            audience.push(client_id);
        }
        Ok(vec![Outbound::to_many(
            audience,
            ServerMessage::PrivateMessage { message: direct },
        )])
    }

    /// Presence list for every connection
    pub(crate) fn presence_list(&self) -> Outbound {
        Outbound::everyone(ServerMessage::PresenceList {
            users: self.registry.list_all(),
        })
    }
}

impl Default for MessageDispatcher {
    fn default() -> Self {
        Self::new(
            ConnectionRegistry::new(),
            RoomStore::default(),
            PresenceTracker::new(),
            DEFAULT_PAGE_SIZE,
        )
    }
}
