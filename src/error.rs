//! Error types for the chat hub
//!
//! Defines application-level errors and message send errors.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

use crate::storage::StorageError;

/// Application-level errors
///
/// Covers both fatal errors (connection termination) and
/// business errors (reported to the originating client only).
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

    /// No room is bound to the given code
    #[error("Invalid room code: {0}")]
    InvalidCode(String),

    /// Event from a connection with no bound session
    #[error("Unknown session")]
    UnknownSession,

    /// Display name is empty or too long
    #[error("Invalid display name")]
    InvalidDisplayName,

    /// Code was already bound to a room
    #[error("Room code collision: {0}")]
    CodeCollision(String),

    /// Attachment extension is not on the allowlist
    #[error("Attachment type not allowed: {0}")]
    DisallowedAttachmentType(String),

    /// Attachment exceeds the size limit
    #[error("Attachment too large: {size} bytes (limit {limit})")]
    PayloadTooLarge { size: usize, limit: usize },

    /// Upload payload could not be decoded
    #[error("Invalid upload payload: {0}")]
    InvalidPayload(#[from] base64::DecodeError),

    /// Attachment bytes could not be persisted
    #[error("Storage failure: {0}")]
    StorageFailure(#[from] StorageError),
}

/// Message send errors
///
/// Occurs when an outbound message cannot be queued for a client.
#[derive(Debug, Error)]
pub enum SendError {
    /// The receiving end of the channel has been closed
    #[error("Channel closed")]
    ChannelClosed,

    /// The client is not draining its queue
    #[error("Channel full")]
    ChannelFull,
}
