//! Chat message model
//!
//! A message is immutable after creation except for its reaction map and
//! read-receipt set, both of which only ever grow.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::types::{ClientId, MessageId, RoomId};

/// Message body: a text line or an uploaded file
///
/// File data is an opaque encoded blob and is never inspected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Payload {
    Text {
        message: String,
    },
    File {
        file_name: String,
        file_data: String,
        file_type: String,
    },
}

/// A message stored in a room's history
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub id: MessageId,
    /// Display name of the sender at send time
    pub sender: String,
    pub sender_id: ClientId,
    pub timestamp: DateTime<Utc>,
    pub room: RoomId,
    #[serde(flatten)]
    pub payload: Payload,
    /// emoji -> connections that reacted with it
    pub reactions: BTreeMap<String, BTreeSet<ClientId>>,
    pub read_by: BTreeSet<ClientId>,
}

impl ChatMessage {
    /// Create a new message; the sender has implicitly read it
    pub fn new(sender_id: ClientId, sender: String, room: RoomId, payload: Payload) -> Self {
        Self {
            id: MessageId::new(),
            sender,
            sender_id,
            timestamp: Utc::now(),
            room,
            payload,
            reactions: BTreeMap::new(),
            read_by: BTreeSet::from([sender_id]),
        }
    }

    /// Text body, if this is a text message
    pub fn text(&self) -> Option<&str> {
        match &self.payload {
            Payload::Text { message } => Some(message),
            Payload::File { .. } => None,
        }
    }

    /// Record a reaction. Returns false if it was already present.
    pub fn add_reaction(&mut self, emoji: &str, client_id: ClientId) -> bool {
        self.reactions
            .entry(emoji.to_string())
            .or_default()
            .insert(client_id)
    }

    /// Record a read receipt. Returns false if it was already present.
    pub fn mark_read(&mut self, client_id: ClientId) -> bool {
        self.read_by.insert(client_id)
    }
}

/// A one-to-one message, relayed but not stored
#[derive(Debug, Clone, Serialize)]
pub struct DirectMessage {
    pub id: MessageId,
    pub sender: String,
    pub sender_id: ClientId,
    pub recipient_id: ClientId,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl DirectMessage {
    pub fn new(sender_id: ClientId, sender: String, recipient_id: ClientId, message: String) -> Self {
        Self {
            id: MessageId::new(),
            sender,
            sender_id,
            recipient_id,
            message,
            timestamp: Utc::now(),
        }
    }
}

/// Outcome of an idempotent mutation
///
/// Both variants are successes; `Unchanged` tells the caller the state was
/// already as requested so nothing needs to be broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation<T> {
    Changed(T),
    Unchanged(T),
}

impl<T> Mutation<T> {
    pub fn is_changed(&self) -> bool {
        matches!(self, Mutation::Changed(_))
    }

    pub fn into_inner(self) -> T {
        match self {
            Mutation::Changed(value) | Mutation::Unchanged(value) => value,
        }
    }

    /// The new value, only if something changed
    pub fn changed(self) -> Option<T> {
        match self {
            Mutation::Changed(value) => Some(value),
            Mutation::Unchanged(_) => None,
        }
    }
}
