//! Error types for the chat server
//!
//! Defines transport-level errors, domain errors raised by the room state,
//! and message send errors. Uses thiserror for ergonomic error definitions.

use thiserror::Error;

use crate::types::{ClientId, MessageId, RoomId};

/// Application-level errors
///
/// Fatal errors that terminate a connection or prevent startup.
#[derive(Debug, Error)]
pub enum AppError {
    /// WebSocket protocol error (fatal)
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// JSON serialization/deserialization error
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error (fatal)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Channel send error (fatal - internal channel broken)
    #[error("Channel send error")]
    ChannelSend,

    /// Invalid startup configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Domain errors raised by the registry, room store and query logic
///
/// None of these are fatal: a not-found request is dropped, the rest are
/// reported back to the requesting connection only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// No room with the given id
    #[error("Room not found: {0}")]
    RoomNotFound(RoomId),

    /// No message with the given id in the room's history
    #[error("Message not found: {0}")]
    MessageNotFound(MessageId),

    /// Connection has not joined (or already left)
    #[error("Connection not found: {0}")]
    ConnectionNotFound(ClientId),

    /// Registration called twice for a live connection
    #[error("Connection already registered: {0}")]
    DuplicateConnection(ClientId),

    /// Empty search term
    #[error("Search query must not be empty")]
    InvalidQuery,
}

impl CoreError {
    /// Whether this error means "unknown id" (silently dropped)
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CoreError::RoomNotFound(_)
                | CoreError::MessageNotFound(_)
                | CoreError::ConnectionNotFound(_)
        )
    }
}

/// Message send errors
///
/// Occurs when attempting to send messages through closed or full channels.
#[derive(Debug, Error)]
pub enum SendError {
    /// The receiving end of the channel has been closed
    #[error("Channel closed")]
    ChannelClosed,

    /// The connection is not draining its outbound queue
    #[error("Channel full")]
    ChannelFull,
}
