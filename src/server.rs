//! ChatServer Actor implementation
//!
//! The central actor that owns all hub state: connections and their sessions,
//! room codes, and rooms. Every mutation arrives as a `ServerCommand` on one
//! channel, so commands are applied one at a time in arrival order and each
//! broadcast sees the membership as of that command.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::attachment::{self, Attachment, AttachmentIngester};
use crate::client::Session;
use crate::codes::CodeIndex;
use crate::error::{AppError, SendError};
use crate::message::ServerMessage;
use crate::registry::ConnectionRegistry;
use crate::room::{Room, RoomDirectory};
use crate::types::{ClientId, RoomCode};

/// Room used when `create_room` names none
pub const DEFAULT_ROOM: &str = "general";

/// Longest accepted display name, in characters
pub const MAX_DISPLAY_NAME_CHARS: usize = 20;

/// Commands sent from handlers to the ChatServer actor
#[derive(Debug)]
pub enum ServerCommand {
    /// New client connected
    Connect {
        client_id: ClientId,
        sender: mpsc::Sender<ServerMessage>,
    },
    /// Client disconnected
    Disconnect { client_id: ClientId },
    /// Create a room (or reuse one by name) under a fresh code
    CreateRoom {
        client_id: ClientId,
        display_name: String,
        room_name: Option<String>,
    },
    /// Join the room a code resolves to
    JoinWithCode {
        client_id: ClientId,
        display_name: String,
        code: String,
    },
    /// Send a chat message
    SendMessage { client_id: ClientId, text: String },
    /// Upload an attachment (base64 payload)
    UploadFile {
        client_id: ClientId,
        filename: String,
        data: String,
    },
    /// Result of an upload that was ingested off the actor
    AttachmentReady {
        client_id: ClientId,
        /// Room the upload was sent from
        room_name: String,
        result: Result<Attachment, AppError>,
    },
    /// Client is typing
    Typing { client_id: ClientId },
}

/// The main ChatServer actor
///
/// Also the session state machine: a connection with no session in the
/// registry is unauthenticated, one with a session is joined.
pub struct ChatServer {
    /// Connections and the session bound to each
    registry: ConnectionRegistry,
    /// Room code -> room name
    codes: CodeIndex,
    /// Room name -> Room
    rooms: RoomDirectory,
    /// Validates and stores uploads
    ingester: AttachmentIngester,
    /// Command receiver channel
    receiver: mpsc::Receiver<ServerCommand>,
    /// Handle for posting upload results back to ourselves
    commands: mpsc::WeakSender<ServerCommand>,
    /// Clients whose queue overflowed during the current command
    lagging: Vec<ClientId>,
}

impl ChatServer {
    /// Create a ChatServer together with the sender used to reach it
    ///
    /// The actor keeps only a weak handle to its own channel, so `run`
    /// returns once every returned sender (and its clones) is dropped.
    pub fn channel(
        ingester: AttachmentIngester,
        buffer: usize,
    ) -> (Self, mpsc::Sender<ServerCommand>) {
        let (cmd_tx, receiver) = mpsc::channel(buffer);
        let server = Self {
            registry: ConnectionRegistry::new(),
            codes: CodeIndex::new(),
            rooms: RoomDirectory::new(),
            ingester,
            receiver,
            commands: cmd_tx.downgrade(),
            lagging: Vec::new(),
        };
        (server, cmd_tx)
    }

    /// Run the ChatServer event loop
    ///
    /// Continuously receives and processes commands until all senders are dropped.
    pub async fn run(mut self) {
        info!("ChatServer started");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd);
        }

        info!("ChatServer shutting down");
    }

    /// Process a single command
    fn handle_command(&mut self, cmd: ServerCommand) {
        match cmd {
            ServerCommand::Connect { client_id, sender } => {
                self.handle_connect(client_id, sender);
            }
            ServerCommand::Disconnect { client_id } => {
                self.handle_disconnect(client_id);
            }
            ServerCommand::CreateRoom {
                client_id,
                display_name,
                room_name,
            } => {
                self.handle_create_room(client_id, display_name, room_name);
            }
            ServerCommand::JoinWithCode {
                client_id,
                display_name,
                code,
            } => {
                self.handle_join_with_code(client_id, display_name, code);
            }
            ServerCommand::SendMessage { client_id, text } => {
                self.handle_send_message(client_id, text);
            }
            ServerCommand::UploadFile {
                client_id,
                filename,
                data,
            } => {
                self.handle_upload(client_id, filename, data);
            }
            ServerCommand::AttachmentReady {
                client_id,
                room_name,
                result,
            } => {
                self.handle_attachment_ready(client_id, room_name, result);
            }
            ServerCommand::Typing { client_id } => {
                self.handle_typing(client_id);
            }
        }

        self.evict_lagging();
    }

    /// Disconnect every client that fell a full queue behind
    ///
    /// Their handler sees the outbound channel close and shuts the socket,
    /// so the client reconnects instead of carrying a stale member list.
    fn evict_lagging(&mut self) {
        while let Some(client_id) = self.lagging.pop() {
            if self.registry.client(client_id).is_some() {
                warn!("Client {} is not keeping up, disconnecting", client_id);
                self.handle_disconnect(client_id);
            }
        }
    }

    /// Handle new client connection
    fn handle_connect(&mut self, client_id: ClientId, sender: mpsc::Sender<ServerMessage>) {
        info!("Client {} connected", client_id);
        self.registry.connect(client_id, sender);
        debug!(
            "Total clients: {}, Total rooms: {}",
            self.registry.len(),
            self.rooms.len()
        );
    }

    /// Handle client disconnection
    ///
    /// Safe to receive more than once; later calls find nothing to remove.
    fn handle_disconnect(&mut self, client_id: ClientId) {
        if let Some(session) = self.registry.remove(client_id) {
            info!(
                "Client {} ({}) left room '{}'",
                client_id, session.display_name, session.room_name
            );
            self.leave_room(&session);
        }

        debug!(
            "Total clients: {}, Total rooms: {}",
            self.registry.len(),
            self.rooms.len()
        );
    }

    /// Handle room creation
    fn handle_create_room(
        &mut self,
        client_id: ClientId,
        display_name: String,
        room_name: Option<String>,
    ) {
        if self.registry.client(client_id).is_none() {
            debug!("Ignoring create_room from unknown client {}", client_id);
            return;
        }

        let display_name = match validate_display_name(&display_name) {
            Ok(name) => name,
            Err(e) => {
                self.send_to(client_id, e.into());
                return;
            }
        };

        let room_name = room_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| DEFAULT_ROOM.to_string());

        let code = self.codes.issue(&room_name);
        info!(
            "Client {} created room '{}' with code {}",
            client_id, room_name, code
        );

        self.enter_room(client_id, display_name, room_name, code, true);
    }

    /// Handle joining by code
    fn handle_join_with_code(&mut self, client_id: ClientId, display_name: String, code: String) {
        if self.registry.client(client_id).is_none() {
            debug!("Ignoring join_with_code from unknown client {}", client_id);
            return;
        }

        let display_name = match validate_display_name(&display_name) {
            Ok(name) => name,
            Err(e) => {
                self.send_to(client_id, e.into());
                return;
            }
        };

        let code = RoomCode::from_string(&code);
        let resolved = self.codes.resolve(&code).map(str::to_string);
        let room_name = match resolved {
            Ok(room_name) => room_name,
            Err(e) => {
                info!("Client {} tried invalid code {}", client_id, code);
                self.send_to(client_id, e.into());
                return;
            }
        };

        info!(
            "Client {} joined room '{}' with code {}",
            client_id, room_name, code
        );

        self.enter_room(client_id, display_name, room_name, code, false);
    }

    /// Handle chat message
    fn handle_send_message(&mut self, client_id: ClientId, text: String) {
        let Some(session) = self.registry.lookup(client_id).cloned() else {
            debug!("{} from {}, ignoring message", AppError::UnknownSession, client_id);
            return;
        };

        if text.trim().is_empty() {
            return;
        }

        self.post(&session, text, None);
    }

    /// Handle upload
    ///
    /// Decoding and storage run on a separate task; the result comes back
    /// as `AttachmentReady` so the actor never waits on storage I/O.
    fn handle_upload(&mut self, client_id: ClientId, filename: String, data: String) {
        let Some(room_name) = self.registry.lookup(client_id).map(|s| s.room_name.clone()) else {
            debug!("{} from {}, ignoring upload", AppError::UnknownSession, client_id);
            return;
        };

        if attachment::classify(&filename).is_none() {
            info!("Client {} uploaded disallowed file '{}'", client_id, filename);
            self.send_to(client_id, AppError::DisallowedAttachmentType(filename).into());
            return;
        }

        // Smallest size the payload can decode to; skip decoding what is
        // certain to be rejected
        let limit = self.ingester.max_bytes();
        let decoded_at_least = (data.len() / 4 * 3).saturating_sub(2);
        if decoded_at_least > limit {
            info!(
                "Client {} upload '{}' over limit ({} bytes)",
                client_id, filename, decoded_at_least
            );
            let err = AppError::PayloadTooLarge {
                size: decoded_at_least,
                limit,
            };
            self.send_to(client_id, err.into());
            return;
        }

        let Some(commands) = self.commands.upgrade() else {
            return;
        };
        let ingester = self.ingester.clone();

        tokio::spawn(async move {
            let result = match BASE64.decode(data.as_bytes()) {
                Ok(bytes) => ingester.ingest(&bytes, &filename).await,
                Err(e) => Err(e.into()),
            };
            if commands
                .send(ServerCommand::AttachmentReady {
                    client_id,
                    room_name,
                    result,
                })
                .await
                .is_err()
            {
                debug!("Server closed before upload from {} finished", client_id);
            }
        });
    }

    /// Handle a finished upload
    ///
    /// Posted only to the room it was uploaded from, and only if the
    /// uploader is still there.
    fn handle_attachment_ready(
        &mut self,
        client_id: ClientId,
        room_name: String,
        result: Result<Attachment, AppError>,
    ) {
        match result {
            Ok(attachment) => {
                let session = self
                    .registry
                    .lookup(client_id)
                    .filter(|s| s.room_name == room_name)
                    .cloned();
                let Some(session) = session else {
                    debug!(
                        "Uploader {} left room '{}', not posting {}",
                        client_id, room_name, attachment.storage_ref
                    );
                    return;
                };
                info!(
                    "Client {} shared '{}' in room '{}'",
                    client_id, attachment.original_filename, session.room_name
                );
                self.post(&session, String::new(), Some(attachment));
            }
            Err(e) => {
                warn!("Upload from {} failed: {}", client_id, e);
                self.send_to(client_id, e.into());
            }
        }
    }

    /// Handle typing indicator
    fn handle_typing(&mut self, client_id: ClientId) {
        let Some(session) = self.registry.lookup(client_id) else {
            return;
        };

        let msg = ServerMessage::UserTyping {
            display_name: session.display_name.clone(),
        };
        let room_name = session.room_name.clone();
        self.broadcast_except(&room_name, client_id, msg);
    }

    /// Helper: bind a session to a room and announce it
    ///
    /// A client already in a room leaves it first.
    fn enter_room(
        &mut self,
        client_id: ClientId,
        display_name: String,
        room_name: String,
        code: RoomCode,
        created: bool,
    ) {
        if let Some(previous) = self.registry.lookup(client_id).cloned() {
            info!(
                "Client {} moving from room '{}' to '{}'",
                client_id, previous.room_name, room_name
            );
            self.leave_room(&previous);
        }

        self.registry.register(client_id, &display_name, &room_name);
        self.rooms.add_member(&room_name, client_id, &display_name);

        let (members, history) = self.rooms.snapshot(&room_name);
        let reply = if created {
            ServerMessage::RoomCreated {
                room_name: room_name.clone(),
                code: code.to_string(),
                history,
            }
        } else {
            ServerMessage::RoomJoined {
                room_name: room_name.clone(),
                code: code.to_string(),
                history,
            }
        };
        self.send_to(client_id, reply);

        self.broadcast(
            &room_name,
            ServerMessage::UserJoined {
                display_name,
                timestamp: Utc::now(),
            },
        );
        self.broadcast(&room_name, ServerMessage::UsersUpdate { members });
    }

    /// Helper: remove a session's member entry and tell the rest of the room
    fn leave_room(&mut self, session: &Session) {
        if self
            .rooms
            .remove_member(&session.room_name, session.client_id)
            .is_none()
        {
            return;
        }

        self.broadcast(
            &session.room_name,
            ServerMessage::UserLeft {
                display_name: session.display_name.clone(),
                timestamp: Utc::now(),
            },
        );
        let members = self
            .rooms
            .get(&session.room_name)
            .map(Room::member_names)
            .unwrap_or_default();
        self.broadcast(&session.room_name, ServerMessage::UsersUpdate { members });
    }

    /// Helper: append to the session's room and fan the message out
    fn post(&mut self, session: &Session, text: String, attachment: Option<Attachment>) {
        let message =
            self.rooms
                .append_message(&session.room_name, &session.display_name, text, attachment);
        debug!(
            "Room '{}' message #{} from {}",
            session.room_name, message.seq, session.display_name
        );
        self.broadcast(&session.room_name, ServerMessage::Message(message));
    }

    /// Helper: deliver to every current member of a room
    fn broadcast(&mut self, room_name: &str, msg: ServerMessage) {
        for member in self.rooms.member_ids(room_name) {
            self.send_to(member, msg.clone());
        }
    }

    /// Helper: deliver to every current member of a room but one
    fn broadcast_except(&mut self, room_name: &str, except: ClientId, msg: ServerMessage) {
        for member in self.rooms.member_ids(room_name) {
            if member != except {
                self.send_to(member, msg.clone());
            }
        }
    }

    /// Helper: best-effort delivery to one client
    ///
    /// A full queue marks the client for eviction once the current
    /// command is done.
    fn send_to(&mut self, client_id: ClientId, msg: ServerMessage) {
        let Some(client) = self.registry.client(client_id) else {
            return;
        };
        match client.send(msg) {
            Ok(()) => {}
            Err(SendError::ChannelFull) => {
                warn!("Dropped message for {}: queue full", client_id);
                self.lagging.push(client_id);
            }
            Err(SendError::ChannelClosed) => {
                debug!("Dropped message for {}: channel closed", client_id);
            }
        }
    }
}

/// Trim a display name and check it is usable
fn validate_display_name(display_name: &str) -> Result<String, AppError> {
    let name = display_name.trim();
    if name.is_empty() || name.chars().count() > MAX_DISPLAY_NAME_CHARS {
        return Err(AppError::InvalidDisplayName);
    }
    Ok(name.to_string())
}
