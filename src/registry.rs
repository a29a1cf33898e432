//! Connection registry
//!
//! Maps each joined connection to its display name, current room and
//! presence status.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::CoreError;
use crate::types::{ClientId, RoomId, Status};

/// A joined connection
///
/// Created by `join`, removed on disconnect. The username is fixed for the
/// lifetime of the session.
#[derive(Debug, Clone, Serialize)]
pub struct Connection {
    pub id: ClientId,
    pub username: String,
    pub current_room: RoomId,
    pub status: Status,
    pub last_activity: DateTime<Utc>,
    /// Registration order, used to keep the presence list stable
    #[serde(skip)]
    seq: u64,
}

/// All joined connections
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: HashMap<ClientId, Connection>,
    next_seq: u64,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection in the `general` room with status `online`
    pub fn register(&mut self, id: ClientId, username: String) -> Result<Connection, CoreError> {
        if self.contains(id) {
            return Err(CoreError::DuplicateConnection(id));
        }

        let connection = Connection {
            id,
            username,
            current_room: RoomId::general(),
            status: Status::Online,
            last_activity: Utc::now(),
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.connections.insert(id, connection.clone());
        Ok(connection)
    }

    pub fn get(&self, id: ClientId) -> Option<&Connection> {
        self.connections.get(&id)
    }

    pub fn contains(&self, id: ClientId) -> bool {
        self.connections.contains_key(&id)
    }

    /// Move a connection to another room
    ///
    /// Returns false if the connection is unknown (e.g. it just disconnected).
    pub fn set_room(&mut self, id: ClientId, room: RoomId) -> bool {
        let Some(connection) = self.connections.get_mut(&id) else {
            return false;
        };
        connection.current_room = room;
        connection.last_activity = Utc::now();
        true
    }

    /// Change presence status. Returns false if the connection is unknown.
    pub fn set_status(&mut self, id: ClientId, status: Status) -> bool {
        let Some(connection) = self.connections.get_mut(&id) else {
            return false;
        };
        connection.status = status;
        connection.last_activity = Utc::now();
        true
    }

    /// Refresh the last-activity timestamp
    pub fn touch(&mut self, id: ClientId) {
        if let Some(connection) = self.connections.get_mut(&id) {
            connection.last_activity = Utc::now();
        }
    }

    /// Remove a connection. Idempotent.
    pub fn remove(&mut self, id: ClientId) -> Option<Connection> {
        self.connections.remove(&id)
    }

    /// Snapshot of all connections in registration order
    pub fn list_all(&self) -> Vec<Connection> {
        let mut all: Vec<Connection> = self.connections.values().cloned().collect();
        all.sort_by_key(|c| c.seq);
        all
    }

    /// Ids of the connections whose current room is `room`
    pub fn in_room(&self, room: &RoomId) -> Vec<ClientId> {
        let mut members: Vec<&Connection> = self
            .connections
            .values()
            .filter(|c| &c.current_room == room)
            .collect();
        members.sort_by_key(|c| c.seq);
        members.into_iter().map(|c| c.id).collect()
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
