//! Client struct definition
//!
//! Represents a live connection: its ID, outbound channel and the
//! session bound to it once it has entered a room.

use tokio::sync::mpsc;

use crate::error::SendError;
use crate::message::ServerMessage;
use crate::types::ClientId;

/// Identity bound to a connection while it is in a room
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub client_id: ClientId,
    pub display_name: String,
    pub room_name: String,
}

/// Connected client information
#[derive(Debug)]
pub struct Client {
    /// Server → Client message channel
    pub sender: mpsc::Sender<ServerMessage>,
    /// Bound session (None until create/join)
    pub session: Option<Session>,
}

impl Client {
    /// Create a new, unauthenticated client with the given sender channel
    pub fn new(sender: mpsc::Sender<ServerMessage>) -> Self {
        Self {
            sender,
            session: None,
        }
    }

    /// Queue a message for this client without waiting
    ///
    /// Never blocks the hub; a full queue is reported as `ChannelFull`.
    pub fn send(&self, msg: ServerMessage) -> Result<(), SendError> {
        self.sender.try_send(msg).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SendError::ChannelFull,
            mpsc::error::TrySendError::Closed(_) => SendError::ChannelClosed,
        })
    }
}
