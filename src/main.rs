//! Room chat hub - Entry Point
//!
//! Starts the TCP listener and ChatServer actor, accepting connections.

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use chat_room_hub::{handle_connection, AttachmentIngester, ChatServer, Config, FsStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging with environment filter
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=chat_room_hub=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("chat_room_hub=info")),
        )
        .init();

    let config = Config::from_env();

    // Attachment storage must be usable before accepting anyone
    let store = FsStore::open(config.upload_dir.clone()).await?;
    info!("Storing attachments in {}", config.upload_dir.display());

    // Start TCP listener
    let listener = TcpListener::bind(&config.bind_addr).await?;
    info!("WebSocket Chat Hub listening on {}", config.bind_addr);

    // Create ChatServer actor and start
    let (server, cmd_tx) =
        ChatServer::channel(AttachmentIngester::new(Arc::new(store)), config.command_buffer);
    tokio::spawn(server.run());

    info!("ChatServer actor started");

    // Connection accept loop
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                info!("New connection from {}", addr);
                let cmd_tx = cmd_tx.clone();

                // Spawn handler task for each connection
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, cmd_tx).await {
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
