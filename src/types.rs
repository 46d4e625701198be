//! Basic type definitions for the chat hub
//!
//! Provides newtype wrappers for type safety:
//! - `ClientId`: UUID-based unique connection identifier
//! - `RoomCode`: 6-character uppercase alphanumeric room code

use rand::Rng;
use uuid::Uuid;

/// Characters a room code is drawn from
pub const CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Length of every room code
pub const CODE_LEN: usize = 6;

/// Unique connection identifier (newtype pattern)
///
/// Wraps a UUID v4 for type-safe client identification.
/// Implements Hash and Eq for use as HashMap keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(pub Uuid);

impl ClientId {
    /// Create a new random client ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Room code (6-character uppercase alphanumeric)
///
/// Shared out-of-band so others can join a room.
/// Generated randomly or parsed from user input.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoomCode(pub String);

impl RoomCode {
    /// Draw a random code, every character uniform over `[A-Z0-9]`
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let code = (0..CODE_LEN)
            .map(|_| CODE_CHARSET[rng.gen_range(0..CODE_CHARSET.len())] as char)
            .collect();
        Self(code)
    }

    /// Create a RoomCode from user input (trimmed, converted to uppercase)
    pub fn from_string(code: &str) -> Self {
        Self(code.trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RoomCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
