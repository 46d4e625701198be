//! Room and RoomDirectory definitions
//!
//! A room is a named, long-lived group with an ordered member list and a
//! bounded message history. Rooms are created on first use and never deleted.

use std::collections::{HashMap, VecDeque};

use chrono::Utc;

use crate::attachment::Attachment;
use crate::message::ChatMessage;
use crate::types::ClientId;

/// Maximum number of messages kept per room
pub const HISTORY_CAPACITY: usize = 100;

/// One room member
///
/// Keyed by connection; two members may share a display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub client_id: ClientId,
    pub display_name: String,
}

/// Multi-member chat room
#[derive(Debug)]
pub struct Room {
    /// Room name
    pub name: String,
    /// Members in join order
    pub members: Vec<Member>,
    /// Most recent messages, oldest first
    pub history: VecDeque<ChatMessage>,
    /// Sequence number for the next appended message
    next_seq: u64,
}

impl Room {
    /// Create a new empty room
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            members: Vec::new(),
            history: VecDeque::with_capacity(HISTORY_CAPACITY),
            next_seq: 0,
        }
    }

    pub fn add_member(&mut self, client_id: ClientId, display_name: &str) {
        self.members.push(Member {
            client_id,
            display_name: display_name.to_string(),
        });
    }

    /// Remove a member by connection
    ///
    /// Returns the removed member, or None if it was not in the room.
    pub fn remove_member(&mut self, client_id: ClientId) -> Option<Member> {
        let pos = self.members.iter().position(|m| m.client_id == client_id)?;
        Some(self.members.remove(pos))
    }

    /// Display names in join order
    pub fn member_names(&self) -> Vec<String> {
        self.members.iter().map(|m| m.display_name.clone()).collect()
    }

    pub fn member_ids(&self) -> Vec<ClientId> {
        self.members.iter().map(|m| m.client_id).collect()
    }

    /// Append a message, evicting the oldest past capacity
    pub fn append(
        &mut self,
        display_name: &str,
        text: String,
        attachment: Option<Attachment>,
    ) -> ChatMessage {
        let message = ChatMessage {
            display_name: display_name.to_string(),
            text,
            timestamp: Utc::now(),
            seq: self.next_seq,
            attachment,
        };
        self.next_seq += 1;

        self.history.push_back(message.clone());
        while self.history.len() > HISTORY_CAPACITY {
            self.history.pop_front();
        }
        message
    }

    pub fn history(&self) -> Vec<ChatMessage> {
        self.history.iter().cloned().collect()
    }
}

/// Owns every room, keyed by name
#[derive(Debug, Default)]
pub struct RoomDirectory {
    rooms: HashMap<String, Room>,
}

impl RoomDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a room, creating it empty on first use
    pub fn ensure(&mut self, room_name: &str) -> &mut Room {
        self.rooms
            .entry(room_name.to_string())
            .or_insert_with(|| Room::new(room_name))
    }

    pub fn get(&self, room_name: &str) -> Option<&Room> {
        self.rooms.get(room_name)
    }

    pub fn add_member(&mut self, room_name: &str, client_id: ClientId, display_name: &str) {
        self.ensure(room_name).add_member(client_id, display_name);
    }

    /// No-op if the room or member is absent
    pub fn remove_member(&mut self, room_name: &str, client_id: ClientId) -> Option<Member> {
        self.rooms.get_mut(room_name)?.remove_member(client_id)
    }

    pub fn append_message(
        &mut self,
        room_name: &str,
        display_name: &str,
        text: String,
        attachment: Option<Attachment>,
    ) -> ChatMessage {
        self.ensure(room_name).append(display_name, text, attachment)
    }

    /// Member names and history, for replay to a joining client
    pub fn snapshot(&self, room_name: &str) -> (Vec<String>, Vec<ChatMessage>) {
        self.rooms
            .get(room_name)
            .map(|r| (r.member_names(), r.history()))
            .unwrap_or_default()
    }

    /// Broadcast audience for a room
    pub fn member_ids(&self, room_name: &str) -> Vec<ClientId> {
        self.rooms
            .get(room_name)
            .map(Room::member_ids)
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}
