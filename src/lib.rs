//! Multi-room WebSocket Chat Hub Library
//!
//! A WebSocket chat hub built with tokio-tungstenite using the Actor
//! pattern for state management.
//!
//! # Features
//! - Room creation with shareable 6-character codes
//! - Joining a room by code, with history replay (last 100 messages)
//! - Real-time chat messaging, in the same order for every member
//! - Attachment uploads (images, video, documents) up to 16 MiB
//! - Typing indicators
//! - Disconnection handling
//!
//! # Architecture
//! Uses the Actor pattern with `mpsc` channels:
//! - `ChatServer` is the central actor owning the connection registry,
//!   the code index and the room directory
//! - Each connection has a `handler` task communicating with the server
//! - Upload storage runs on its own task and reports back to the actor
//! - No locks needed - all state access goes through message passing
//!
//! # Example
//! ```ignore
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//! use chat_room_hub::{handle_connection, AttachmentIngester, ChatServer, MemoryStore};
//!
//! #[tokio::main]
//! async fn main() {
//!     let listener = TcpListener::bind("127.0.0.1:8080").await.unwrap();
//!     let ingester = AttachmentIngester::new(Arc::new(MemoryStore::new()));
//!     let (server, cmd_tx) = ChatServer::channel(ingester, 256);
//!
//!     tokio::spawn(server.run());
//!
//!     while let Ok((stream, _)) = listener.accept().await {
//!         let cmd_tx = cmd_tx.clone();
//!         tokio::spawn(handle_connection(stream, cmd_tx));
//!     }
//! }
//! ```

pub mod attachment;
pub mod client;
pub mod codes;
pub mod config;
pub mod error;
pub mod handler;
pub mod message;
pub mod registry;
pub mod room;
pub mod server;
pub mod storage;
pub mod types;

// Re-export main types for convenience
pub use attachment::{Attachment, AttachmentCategory, AttachmentIngester};
pub use client::{Client, Session};
pub use codes::CodeIndex;
pub use config::Config;
pub use error::{AppError, SendError};
pub use handler::handle_connection;
pub use message::{ChatMessage, ClientMessage, ErrorCode, ServerMessage};
pub use registry::ConnectionRegistry;
pub use room::{Room, RoomDirectory};
pub use server::{ChatServer, ServerCommand};
pub use storage::{AttachmentStore, FsStore, MemoryStore, StorageError};
pub use types::{ClientId, RoomCode};
