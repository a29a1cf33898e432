//! Message protocol definitions
//!
//! JSON-based bidirectional message protocol using Serde's tagged enum
//! for type-safe serialization/deserialization.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::chat::{ChatMessage, DirectMessage};
use crate::error::CoreError;
use crate::registry::Connection;
use crate::room::RoomSummary;
use crate::types::{ClientId, MessageId, RoomId, Status};

/// Client → Server message
///
/// All messages from client to server. Uses tagged enum with snake_case naming.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Register with a display name (required before anything else)
    Join { username: String },
    /// Send a text message to the current room
    SendMessage { message: String },
    /// Send a file to the current room
    SendFile {
        file_name: String,
        file_data: String,
        file_type: String,
    },
    /// Switch to another room
    JoinRoom { room: RoomId },
    /// React to a message
    AddReaction {
        message_id: MessageId,
        emoji: String,
        room: RoomId,
    },
    /// Read receipt for a message
    MarkAsRead { message_id: MessageId, room: RoomId },
    /// Change presence status
    ChangeStatus { status: Status },
    /// Typing started / stopped
    Typing { is_typing: bool },
    /// Search a room's history
    SearchMessages { query: String, room: RoomId },
    /// Request the page of messages before `before`
    LoadMoreMessages { room: RoomId, before: MessageId },
    /// One-to-one message to another connection
    PrivateMessage { to: ClientId, message: String },
}

/// Server → Client message
///
/// All messages from server to client. Uses tagged enum with snake_case naming.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Connection successful, client ID issued
    Connected { client_id: ClientId },
    /// Everyone currently joined
    PresenceList { users: Vec<Connection> },
    /// Someone joined the chat
    UserJoined { id: ClientId, username: String },
    /// Someone left the chat
    UserLeft { id: ClientId, username: String },
    /// Rooms with the recipient's unread counts
    RoomList { rooms: Vec<RoomSummary> },
    /// Full history of a room
    HistorySnapshot {
        room: RoomId,
        messages: Vec<ChatMessage>,
    },
    /// New message in the recipient's room
    ReceiveMessage { message: ChatMessage },
    /// Names of the users typing in a room
    TypingUsers { room: RoomId, users: Vec<String> },
    /// A reaction was added to a message
    ReactionAdded {
        message_id: MessageId,
        emoji: String,
        user_id: ClientId,
        reactions: BTreeMap<String, BTreeSet<ClientId>>,
    },
    /// A message was read
    MessageRead {
        message_id: MessageId,
        user_id: ClientId,
        read_by: BTreeSet<ClientId>,
    },
    /// Older history page
    OlderPage {
        room: RoomId,
        messages: Vec<ChatMessage>,
        has_more: bool,
    },
    /// Search hits, echoing the query
    SearchResults {
        results: Vec<ChatMessage>,
        query: String,
    },
    /// One-to-one message
    PrivateMessage { message: DirectMessage },
    /// Error occurred
    Error { code: ErrorCode, message: String },
}

/// Error codes for ServerMessage::Error
///
/// Represents different error scenarios that can be communicated to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// `join` sent twice on the same connection
    DuplicateConnection,
    /// Empty search query
    InvalidQuery,
    /// Unknown room, message or connection
    NotFound,
    /// Invalid message format
    InvalidMessage,
}

impl ServerMessage {
    /// Reply for a frame that could not be parsed
    pub fn invalid_message(err: &serde_json::Error) -> Self {
        ServerMessage::Error {
            code: ErrorCode::InvalidMessage,
            message: format!("Invalid message format: {}", err),
        }
    }
}

/// Convert CoreError to ServerMessage for client notification
impl From<CoreError> for ServerMessage {
    fn from(err: CoreError) -> Self {
        let code = match &err {
            CoreError::DuplicateConnection(_) => ErrorCode::DuplicateConnection,
            CoreError::InvalidQuery => ErrorCode::InvalidQuery,
            CoreError::RoomNotFound(_)
            | CoreError::MessageNotFound(_)
            | CoreError::ConnectionNotFound(_) => ErrorCode::NotFound,
        };
        ServerMessage::Error {
            code,
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_deserialize() {
        let json = r#"{"type": "join", "username": "Alice"}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        match msg {
            ClientMessage::Join { username } => assert_eq!(username, "Alice"),
            _ => panic!("Wrong variant"),
        }
    }

    #[test]
    fn test_reaction_deserialize() {
        let id = MessageId::new();
        let json = format!(
            r#"{{"type": "add_reaction", "message_id": "{}", "emoji": "👍", "room": "tech"}}"#,
            id
        );
        let msg: ClientMessage = serde_json::from_str(&json).unwrap();
        match msg {
            ClientMessage::AddReaction {
                message_id,
                emoji,
                room,
            } => {
                assert_eq!(message_id, id);
                assert_eq!(emoji, "👍");
                assert_eq!(room, RoomId::from("tech"));
            }
            _ => panic!("Wrong variant"),
        }
    }

    #[test]
    fn test_status_and_typing_deserialize() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type": "change_status", "status": "busy"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::ChangeStatus { status: Status::Busy }));

        let msg: ClientMessage =
            serde_json::from_str(r#"{"type": "typing", "is_typing": true}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Typing { is_typing: true }));
    }

    #[test]
    fn test_unknown_type_rejected() {
        let result = serde_json::from_str::<ClientMessage>(r#"{"type": "create_room"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_server_message_serialize() {
        let id = ClientId::new();
        let msg = ServerMessage::Connected { client_id: id };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"type\":\"connected\""));
        assert!(json.contains(&format!("\"client_id\":\"{}\"", id)));
    }

    #[test]
    fn test_older_page_serialize() {
        let msg = ServerMessage::OlderPage {
            room: RoomId::general(),
            messages: Vec::new(),
            has_more: false,
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "older_page");
        assert_eq!(json["room"], "general");
        assert_eq!(json["has_more"], false);
    }

    #[test]
    fn test_invalid_message_reply() {
        let err = serde_json::from_str::<ClientMessage>(r#"{"type": "send_message""#).unwrap_err();
        let msg = ServerMessage::invalid_message(&err);
        let json = serde_json::to_string(&msg).unwrap();

        assert!(json.contains("\"type\":\"error\""));
        assert!(json.contains("\"code\":\"invalid_message\""));
        assert!(json.contains("Invalid message format"));
    }

    #[test]
    fn test_error_code_serialize() {
        let msg: ServerMessage = CoreError::InvalidQuery.into();
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"code\":\"invalid_query\""));

        let msg: ServerMessage = CoreError::DuplicateConnection(ClientId::new()).into();
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"code\":\"duplicate_connection\""));
    }
}
