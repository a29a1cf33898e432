//! ChatServer Actor implementation
//!
//! The central actor that owns all chat state and the outbound channel of
//! every open connection. Uses the Actor pattern with mpsc channels for
//! message passing, so state changes are applied one command at a time.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::client::Client;
use crate::dispatcher::{Audience, MessageDispatcher, Outbound};
use crate::error::SendError;
use crate::message::{ClientMessage, ServerMessage};
use crate::types::ClientId;

/// Commands sent from handlers to the ChatServer actor
#[derive(Debug)]
pub enum ServerCommand {
    /// New transport connection opened
    Connect {
        client_id: ClientId,
        sender: mpsc::Sender<ServerMessage>,
    },
    /// Transport connection closed
    Disconnect { client_id: ClientId },
    /// Parsed message from a client
    Inbound {
        client_id: ClientId,
        message: ClientMessage,
    },
}

/// The main ChatServer actor
///
/// Processes commands from client handlers and delivers the resulting events.
pub struct ChatServer {
    /// All open connections, joined or not: ClientId -> Client
    clients: HashMap<ClientId, Client>,
    /// Chat state
    dispatcher: MessageDispatcher,
    /// Command receiver channel
    receiver: mpsc::Receiver<ServerCommand>,
}

impl ChatServer {
    /// Create a new ChatServer with the given state and command receiver
    pub fn new(dispatcher: MessageDispatcher, receiver: mpsc::Receiver<ServerCommand>) -> Self {
        Self {
            clients: HashMap::new(),
            dispatcher,
            receiver,
        }
    }

    /// Run the ChatServer event loop
    ///
    /// Continuously receives and processes commands until all senders are dropped.
    pub async fn run(mut self) {
        info!("ChatServer started");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd);
        }

        info!("ChatServer shutting down");
    }

    /// Process a single command
    fn handle_command(&mut self, cmd: ServerCommand) {
        match cmd {
            ServerCommand::Connect { client_id, sender } => {
                self.handle_connect(client_id, sender);
            }
            ServerCommand::Disconnect { client_id } => {
                self.handle_disconnect(client_id);
            }
            ServerCommand::Inbound { client_id, message } => {
                let outbound = self.dispatcher.handle(client_id, message);
                self.deliver(outbound);
            }
        }
    }

    /// Handle new client connection
    fn handle_connect(&mut self, client_id: ClientId, sender: mpsc::Sender<ServerMessage>) {
        info!("Client {} connected", client_id);
        self.clients.insert(client_id, Client::new(client_id, sender));
        debug!(
            "Open connections: {}, joined: {}",
            self.clients.len(),
            self.dispatcher.registry().len()
        );
    }

    /// Handle client disconnection
    fn handle_disconnect(&mut self, client_id: ClientId) {
        info!("Client {} disconnected", client_id);

        // Stop delivering to the departed client before notifying the rest
        self.clients.remove(&client_id);
        let outbound = self.dispatcher.disconnect(client_id);
        self.deliver(outbound);

        debug!(
            "Open connections: {}, joined: {}",
            self.clients.len(),
            self.dispatcher.registry().len()
        );
    }

    /// Hand each event to its audience
    fn deliver(&self, outbound: Vec<Outbound>) {
        for Outbound { audience, event } in outbound {
            match audience {
                Audience::Connection(client_id) => self.send_to(client_id, event),
                Audience::Connections(client_ids) => {
                    for client_id in client_ids {
                        self.send_to(client_id, event.clone());
                    }
                }
                Audience::Everyone => {
                    for client_id in self.clients.keys() {
                        self.send_to(*client_id, event.clone());
                    }
                }
            }
        }
    }

    /// Helper: Best-effort send to one connection
    fn send_to(&self, client_id: ClientId, event: ServerMessage) {
        let Some(client) = self.clients.get(&client_id) else {
            return;
        };
        match client.send(event) {
            Ok(()) => {}
            Err(SendError::ChannelFull) => {
                warn!("Outbound queue full for {}, dropping event", client_id);
            }
            Err(SendError::ChannelClosed) => {
                debug!("Client {} channel closed", client_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RoomId;

    struct Harness {
        cmd_tx: mpsc::Sender<ServerCommand>,
    }

    impl Harness {
        fn start() -> Self {
            let (cmd_tx, cmd_rx) = mpsc::channel(64);
            tokio::spawn(ChatServer::new(MessageDispatcher::default(), cmd_rx).run());
            Self { cmd_tx }
        }

        async fn connect(&self) -> (ClientId, mpsc::Receiver<ServerMessage>) {
            let client_id = ClientId::new();
            let (tx, rx) = mpsc::channel(64);
            self.cmd_tx
                .send(ServerCommand::Connect {
                    client_id,
                    sender: tx,
                })
                .await
                .unwrap();
            (client_id, rx)
        }

        async fn send(&self, client_id: ClientId, message: ClientMessage) {
            self.cmd_tx
                .send(ServerCommand::Inbound { client_id, message })
                .await
                .unwrap();
        }
    }

    /// Receive until an event matches, skipping the rest
    async fn expect<F>(rx: &mut mpsc::Receiver<ServerMessage>, pred: F) -> ServerMessage
    where
        F: Fn(&ServerMessage) -> bool,
    {
        loop {
            let msg = rx.recv().await.expect("channel closed");
            if pred(&msg) {
                return msg;
            }
        }
    }

    #[tokio::test]
    async fn test_join_delivers_room_list_and_history() {
        let server = Harness::start();
        let (a, mut rx_a) = server.connect().await;

        server
            .send(a, ClientMessage::Join { username: "Alice".to_string() })
            .await;

        assert!(matches!(rx_a.recv().await, Some(ServerMessage::PresenceList { .. })));
        assert!(matches!(rx_a.recv().await, Some(ServerMessage::UserJoined { .. })));
        match rx_a.recv().await {
            Some(ServerMessage::RoomList { rooms }) => assert_eq!(rooms.len(), 3),
            other => panic!("Unexpected event: {:?}", other),
        }
        match rx_a.recv().await {
            Some(ServerMessage::HistorySnapshot { room, messages }) => {
                assert_eq!(room, RoomId::general());
                assert!(messages.is_empty());
            }
            other => panic!("Unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_message_fanout_and_unread() {
        let server = Harness::start();
        let (a, mut rx_a) = server.connect().await;
        let (b, mut rx_b) = server.connect().await;

        server
            .send(a, ClientMessage::Join { username: "A".to_string() })
            .await;
        server
            .send(b, ClientMessage::Join { username: "B".to_string() })
            .await;
        server
            .send(b, ClientMessage::JoinRoom { room: RoomId::from("tech") })
            .await;
        server
            .send(a, ClientMessage::SendMessage { message: "hi".to_string() })
            .await;

        let msg = expect(&mut rx_a, |m| matches!(m, ServerMessage::ReceiveMessage { .. })).await;
        match msg {
            ServerMessage::ReceiveMessage { message } => assert_eq!(message.text(), Some("hi")),
            _ => unreachable!(),
        }

        // B's room list after switching has no unread; the refresh after A's message has one
        expect(&mut rx_b, |m| matches!(m, ServerMessage::HistorySnapshot { room, .. } if room.as_str() == "tech")).await;
        expect(&mut rx_b, |m| matches!(m, ServerMessage::RoomList { .. })).await;
        match expect(&mut rx_b, |m| matches!(m, ServerMessage::RoomList { .. })).await {
            ServerMessage::RoomList { rooms } => assert_eq!(rooms[0].unread_count, 1),
            _ => unreachable!(),
        }

        server
            .send(b, ClientMessage::JoinRoom { room: RoomId::general() })
            .await;
        match expect(&mut rx_b, |m| matches!(m, ServerMessage::HistorySnapshot { .. })).await {
            ServerMessage::HistorySnapshot { messages, .. } => {
                assert_eq!(messages.len(), 1);
                assert_eq!(messages[0].text(), Some("hi"));
            }
            _ => unreachable!(),
        }
        match expect(&mut rx_b, |m| matches!(m, ServerMessage::RoomList { .. })).await {
            ServerMessage::RoomList { rooms } => assert_eq!(rooms[0].unread_count, 0),
            _ => unreachable!(),
        }
    }

    #[tokio::test]
    async fn test_disconnect_notifies_remaining() {
        let server = Harness::start();
        let (a, _rx_a) = server.connect().await;
        let (b, mut rx_b) = server.connect().await;

        server
            .send(a, ClientMessage::Join { username: "Alice".to_string() })
            .await;
        server
            .send(b, ClientMessage::Join { username: "Bob".to_string() })
            .await;
        server
            .cmd_tx
            .send(ServerCommand::Disconnect { client_id: a })
            .await
            .unwrap();

        match expect(&mut rx_b, |m| matches!(m, ServerMessage::UserLeft { .. })).await {
            ServerMessage::UserLeft { username, .. } => assert_eq!(username, "Alice"),
            _ => unreachable!(),
        }
    }

    #[tokio::test]
    async fn test_duplicate_join_reports_error() {
        let server = Harness::start();
        let (a, mut rx_a) = server.connect().await;

        server
            .send(a, ClientMessage::Join { username: "Alice".to_string() })
            .await;
        server
            .send(a, ClientMessage::Join { username: "Alice".to_string() })
            .await;

        let msg = expect(&mut rx_a, |m| matches!(m, ServerMessage::Error { .. })).await;
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"code\":\"duplicate_connection\""));
    }
}
