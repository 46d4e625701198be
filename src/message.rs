//! Message protocol definitions
//!
//! JSON-based bidirectional message protocol using Serde's tagged enum
//! for type-safe serialization/deserialization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::attachment::Attachment;
use crate::error::AppError;

/// Client → Server message
///
/// All messages from client to server. Uses tagged enum with snake_case naming.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Create (or reuse) a room by name and get a fresh code for it
    CreateRoom {
        display_name: String,
        #[serde(default)]
        room_name: Option<String>,
    },
    /// Join the room a code resolves to
    JoinWithCode { display_name: String, code: String },
    /// Send a chat message to the current room
    SendMessage { text: String },
    /// Upload an attachment; `data` is base64
    UploadFile { filename: String, data: String },
    /// Indicate typing
    Typing,
}

/// One entry of a room's history
///
/// Immutable once appended; `seq` is its position within the room.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub display_name: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub seq: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment: Option<Attachment>,
}

/// Server → Client message
///
/// All messages from server to client. Uses tagged enum with snake_case naming.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Connection successful, client ID issued
    Connected { client_id: String },
    /// Room created, with the code to share and the room's history
    RoomCreated {
        room_name: String,
        code: String,
        history: Vec<ChatMessage>,
    },
    /// Room joined by code
    RoomJoined {
        room_name: String,
        code: String,
        history: Vec<ChatMessage>,
    },
    /// Chat message (text or attachment) in the current room
    Message(ChatMessage),
    /// Current member list of the room, in join order
    UsersUpdate { members: Vec<String> },
    /// Someone entered the room
    UserJoined {
        display_name: String,
        timestamp: DateTime<Utc>,
    },
    /// Someone left the room
    UserLeft {
        display_name: String,
        timestamp: DateTime<Utc>,
    },
    /// Someone in the room is typing
    UserTyping { display_name: String },
    /// Request failed
    Error { code: ErrorCode, message: String },
    /// Upload failed
    UploadError { code: ErrorCode, message: String },
}

/// Error codes for `ServerMessage::Error` and `ServerMessage::UploadError`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Code does not resolve to any room
    InvalidCode,
    /// Display name empty or too long
    InvalidDisplayName,
    /// Extension not on the allowlist
    DisallowedAttachmentType,
    /// Attachment over the size limit
    PayloadTooLarge,
    /// Upload data was not valid base64
    InvalidPayload,
    /// Attachment could not be stored
    StorageFailure,
    /// Invalid message format
    InvalidMessage,
    /// Anything else
    Internal,
}

/// Convert AppError to ServerMessage for client notification
///
/// Upload-path failures become `UploadError`, everything else `Error`.
impl From<AppError> for ServerMessage {
    fn from(err: AppError) -> Self {
        let message = err.to_string();
        match err {
            AppError::InvalidCode(_) => ServerMessage::Error {
                code: ErrorCode::InvalidCode,
                message: "Invalid room code".to_string(),
            },
            AppError::InvalidDisplayName => ServerMessage::Error {
                code: ErrorCode::InvalidDisplayName,
                message,
            },
            AppError::Json(_) => ServerMessage::Error {
                code: ErrorCode::InvalidMessage,
                message,
            },
            AppError::DisallowedAttachmentType(_) => ServerMessage::UploadError {
                code: ErrorCode::DisallowedAttachmentType,
                message,
            },
            AppError::PayloadTooLarge { .. } => ServerMessage::UploadError {
                code: ErrorCode::PayloadTooLarge,
                message,
            },
            AppError::InvalidPayload(_) => ServerMessage::UploadError {
                code: ErrorCode::InvalidPayload,
                message,
            },
            // Storage details stay in the server log
            AppError::StorageFailure(_) => ServerMessage::UploadError {
                code: ErrorCode::StorageFailure,
                message: "Failed to store attachment".to_string(),
            },
            _ => ServerMessage::Error {
                code: ErrorCode::Internal,
                message: "Internal error".to_string(),
            },
        }
    }
}
