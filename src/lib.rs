//! Multi-room WebSocket Chat Server Library
//!
//! A WebSocket chat server built with tokio-tungstenite using the Actor
//! pattern for state management. All state lives in memory for the lifetime
//! of the process.
//!
//! # Features
//! - Pre-provisioned rooms with bounded message history
//! - Text and file messages
//! - Per-room unread counters
//! - Presence status and typing indicators
//! - Emoji reactions and read receipts
//! - History search and pagination
//! - Private messages
//!
//! # Architecture
//! Uses the Actor pattern with `mpsc` channels:
//! - `ChatServer` is the central actor; it owns the `MessageDispatcher`,
//!   which owns the `ConnectionRegistry`, `RoomStore` and `PresenceTracker`
//! - Each connection has a `handler` task communicating with the server
//! - The dispatcher is synchronous and transport-agnostic: it returns
//!   events paired with their audience, and the actor delivers them
//!
//! # Example
//! ```ignore
//! use tokio::net::TcpListener;
//! use tokio::sync::mpsc;
//! use chat_rooms::{ChatServer, MessageDispatcher, handle_connection};
//!
//! #[tokio::main]
//! async fn main() {
//!     let listener = TcpListener::bind("127.0.0.1:8080").await.unwrap();
//!     let (cmd_tx, cmd_rx) = mpsc::channel(256);
//!
//!     tokio::spawn(ChatServer::new(MessageDispatcher::default(), cmd_rx).run());
//!
//!     while let Ok((stream, _)) = listener.accept().await {
//!         let cmd_tx = cmd_tx.clone();
//!         tokio::spawn(handle_connection(stream, cmd_tx, 64));
//!     }
//! }
//! ```

pub mod chat;
pub mod client;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod message;
pub mod presence;
pub mod registry;
pub mod room;
pub mod search;
pub mod server;
pub mod session;
pub mod types;

// Re-export main types for convenience
pub use chat::{ChatMessage, DirectMessage, Mutation, Payload};
pub use client::Client;
pub use config::ServerConfig;
pub use dispatcher::{Audience, MessageDispatcher, Outbound};
pub use error::{AppError, CoreError, SendError};
pub use handler::handle_connection;
pub use message::{ClientMessage, ErrorCode, ServerMessage};
pub use presence::PresenceTracker;
pub use registry::{Connection, ConnectionRegistry};
pub use room::{Room, RoomStore, RoomSummary};
pub use search::Page;
pub use server::{ChatServer, ServerCommand};
pub use types::{ClientId, MessageId, RoomId, Status};
