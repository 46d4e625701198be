//! Connection registry
//!
//! Maps connection IDs to live clients and the session bound to each.

use std::collections::HashMap;

use tokio::sync::mpsc;

use crate::client::{Client, Session};
use crate::message::ServerMessage;
use crate::types::ClientId;

#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    clients: HashMap<ClientId, Client>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new, unauthenticated connection
    pub fn connect(&mut self, client_id: ClientId, sender: mpsc::Sender<ServerMessage>) {
        self.clients.insert(client_id, Client::new(sender));
    }

    /// Bind (or overwrite) the session for a live connection
    ///
    /// Returns false if the connection is not live.
    pub fn register(&mut self, client_id: ClientId, display_name: &str, room_name: &str) -> bool {
        let Some(client) = self.clients.get_mut(&client_id) else {
            return false;
        };
        client.session = Some(Session {
            client_id,
            display_name: display_name.to_string(),
            room_name: room_name.to_string(),
        });
        true
    }

    pub fn lookup(&self, client_id: ClientId) -> Option<&Session> {
        self.clients.get(&client_id).and_then(|c| c.session.as_ref())
    }

    pub fn client(&self, client_id: ClientId) -> Option<&Client> {
        self.clients.get(&client_id)
    }

    /// Drop the connection, returning the session it held
    ///
    /// A second call for the same ID returns None.
    pub fn remove(&mut self, client_id: ClientId) -> Option<Session> {
        self.clients.remove(&client_id).and_then(|c| c.session)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with(client_id: ClientId) -> (ConnectionRegistry, mpsc::Receiver<ServerMessage>) {
        let (tx, rx) = mpsc::channel(8);
        let mut registry = ConnectionRegistry::new();
        registry.connect(client_id, tx);
        (registry, rx)
    }

    #[test]
    fn test_register_and_lookup() {
        let id = ClientId::new();
        let (mut registry, _rx) = registry_with(id);

        assert!(registry.lookup(id).is_none());
        assert!(registry.register(id, "alice", "general"));

        let session = registry.lookup(id).unwrap();
        assert_eq!(session.display_name, "alice");
        assert_eq!(session.room_name, "general");

        // Overwrite is allowed
        assert!(registry.register(id, "alice", "random"));
        assert_eq!(registry.lookup(id).unwrap().room_name, "random");
    }

    #[test]
    fn test_register_unknown_connection() {
        let mut registry = ConnectionRegistry::new();
        assert!(!registry.register(ClientId::new(), "alice", "general"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_remove_is_idempotent() {
        let id = ClientId::new();
        let (mut registry, _rx) = registry_with(id);
        registry.register(id, "alice", "general");

        let session = registry.remove(id).unwrap();
        assert_eq!(session.display_name, "alice");
        assert!(registry.remove(id).is_none());
        assert!(registry.client(id).is_none());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_remove_unauthenticated() {
        let id = ClientId::new();
        let (mut registry, _rx) = registry_with(id);

        assert!(registry.remove(id).is_none());
        assert!(registry.is_empty());
    }
}
