//! Multi-room WebSocket Chat Server - Entry Point
//!
//! Starts the TCP listener and ChatServer actor, accepting connections.

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use chat_rooms::{
    handle_connection, ChatServer, ConnectionRegistry, MessageDispatcher, PresenceTracker,
    RoomStore, ServerConfig,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging with environment filter
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=chat_rooms=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("chat_rooms=info")),
        )
        .init();

    let config = ServerConfig::from_env()?;

    // Start TCP listener
    let listener = TcpListener::bind(&config.addr).await?;
    info!("WebSocket Chat Server listening on {}", config.addr);

    // Create ChatServer actor channel and start
    let dispatcher = MessageDispatcher::new(
        ConnectionRegistry::new(),
        RoomStore::new(config.history_cap),
        PresenceTracker::new(),
        config.page_size,
    );
    let (cmd_tx, cmd_rx) = mpsc::channel(config.channel_buffer);
    tokio::spawn(ChatServer::new(dispatcher, cmd_rx).run());

    info!(
        "ChatServer actor started (history cap {}, page size {})",
        config.history_cap, config.page_size
    );

    // Connection accept loop
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                info!("New connection from {}", addr);
                let cmd_tx = cmd_tx.clone();
                let buffer = config.client_buffer;

                // Spawn handler task for each connection
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, cmd_tx, buffer).await {
                        error!("Connection handler error: {}", e);
                    }
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}
