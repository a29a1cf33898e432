//! Client struct definition
//!
//! The outbound half of a connection as seen by the `ChatServer` actor.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::error::SendError;
use crate::message::ServerMessage;
use crate::types::ClientId;

/// Connected client
///
/// Holds the connection id and the channel feeding its WebSocket write task.
#[derive(Debug)]
pub struct Client {
    /// Unique identifier for this client
    pub id: ClientId,
    /// Server → Client message channel
    pub sender: mpsc::Sender<ServerMessage>,
}

impl Client {
    /// Create a new client with the given ID and sender channel
    pub fn new(id: ClientId, sender: mpsc::Sender<ServerMessage>) -> Self {
        Self { id, sender }
    }

    /// Queue a message for this client without waiting
    ///
    /// Fails if the channel is closed (client disconnected) or full (client
    /// not keeping up); the message is dropped in both cases.
    pub fn send(&self, msg: ServerMessage) -> Result<(), SendError> {
        self.sender.try_send(msg).map_err(|e| match e {
            TrySendError::Full(_) => SendError::ChannelFull,
            TrySendError::Closed(_) => SendError::ChannelClosed,
        })
    }
}
