//! WebSocket connection handler
//!
//! Handles individual client connections: WebSocket handshake,
//! message parsing, and bidirectional communication with the ChatServer.

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use crate::attachment::MAX_ATTACHMENT_BYTES;
use crate::error::AppError;
use crate::message::{ClientMessage, ErrorCode, ServerMessage};
use crate::server::ServerCommand;
use crate::types::ClientId;

/// Outbound queue depth per client; a client this far behind is disconnected
const CLIENT_QUEUE_SIZE: usize = 256;

/// Largest accepted frame
///
/// Twice the base64 size of the largest attachment, so oversized uploads
/// still reach the hub and get an `upload_error` instead of a dropped socket.
const MAX_FRAME_BYTES: usize = MAX_ATTACHMENT_BYTES.div_ceil(3) * 4 * 2;

fn websocket_config() -> WebSocketConfig {
    let mut config = WebSocketConfig::default();
    config.max_message_size = Some(MAX_FRAME_BYTES);
    config.max_frame_size = Some(MAX_FRAME_BYTES);
    config
}

/// Handle a new TCP connection
///
/// Performs WebSocket handshake, sets up bidirectional communication,
/// and manages the connection lifecycle. Closing the socket, for any
/// reason, disconnects the client from the hub.
pub async fn handle_connection(
    stream: TcpStream,
    cmd_tx: mpsc::Sender<ServerCommand>,
) -> Result<(), AppError> {
    let peer_addr = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    debug!("New TCP connection from {}", peer_addr);

    // WebSocket handshake
    let ws_stream =
        tokio_tungstenite::accept_async_with_config(stream, Some(websocket_config())).await?;
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    // Generate client ID
    let client_id = ClientId::new();
    info!("Client {} connected from {}", client_id, peer_addr);

    // Create channel for server -> client messages
    let (msg_tx, mut msg_rx) = mpsc::channel::<ServerMessage>(CLIENT_QUEUE_SIZE);

    // Only the hub holds the outbound channel open; when it drops this
    // client the write task ends and the socket closes
    let error_tx = msg_tx.downgrade();

    // Register with ChatServer
    if cmd_tx
        .send(ServerCommand::Connect {
            client_id,
            sender: msg_tx,
        })
        .await
        .is_err()
    {
        error!("Failed to register client {} - server closed", client_id);
        return Err(AppError::ChannelSend);
    }

    // Send connection success message
    let connected_msg = ServerMessage::Connected {
        client_id: client_id.to_string(),
    };
    let json = serde_json::to_string(&connected_msg)?;
    ws_sender.send(Message::Text(json)).await?;

    // Clone cmd_tx for read task
    let cmd_tx_read = cmd_tx.clone();

    // Spawn read task (WebSocket -> ServerCommand)
    let read_task = tokio::spawn(async move {
        while let Some(msg_result) = ws_receiver.next().await {
            match msg_result {
                Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(client_msg) => {
                        let cmd = client_message_to_command(client_id, client_msg);
                        if cmd_tx_read.send(cmd).await.is_err() {
                            debug!("Server closed, ending read task for {}", client_id);
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("Invalid JSON from {}: {}", client_id, e);
                        if let Some(tx) = error_tx.upgrade() {
                            let _ = tx.try_send(ServerMessage::Error {
                                code: ErrorCode::InvalidMessage,
                                message: format!("Invalid message format: {}", e),
                            });
                        }
                    }
                },
                Ok(Message::Close(_)) => {
                    debug!("Client {} sent close frame", client_id);
                    break;
                }
                Ok(Message::Ping(_)) => {
                    // Pong is handled automatically by tungstenite
                    debug!("Ping from {}", client_id);
                }
                Ok(_) => {
                    // Binary and other message types - ignore
                }
                Err(e) => {
                    error!("WebSocket error for {}: {}", client_id, e);
                    break;
                }
            }
        }
        debug!("Read task ended for {}", client_id);
    });

    // Spawn write task (ServerMessage -> WebSocket)
    let write_task = tokio::spawn(async move {
        while let Some(msg) = msg_rx.recv().await {
            match serde_json::to_string(&msg) {
                Ok(json) => {
                    if ws_sender.send(Message::Text(json)).await.is_err() {
                        debug!("WebSocket send failed, ending write task");
                        break;
                    }
                }
                Err(e) => {
                    error!("Failed to serialize message: {}", e);
                }
            }
        }
        debug!("Write task ended for client");

        let _ = ws_sender.close().await;
    });

    // Wait for either task to complete
    tokio::select! {
        _ = read_task => {
            debug!("Read task completed for {}", client_id);
        }
        _ = write_task => {
            debug!("Write task completed for {}", client_id);
        }
    }

    // Send disconnect command
    let _ = cmd_tx.send(ServerCommand::Disconnect { client_id }).await;

    info!("Client {} disconnected", client_id);

    Ok(())
}

/// Convert a ClientMessage to a ServerCommand
fn client_message_to_command(client_id: ClientId, msg: ClientMessage) -> ServerCommand {
    match msg {
        ClientMessage::CreateRoom {
            display_name,
            room_name,
        } => ServerCommand::CreateRoom {
            client_id,
            display_name,
            room_name,
        },
        ClientMessage::JoinWithCode { display_name, code } => ServerCommand::JoinWithCode {
            client_id,
            display_name,
            code,
        },
        ClientMessage::SendMessage { text } => ServerCommand::SendMessage { client_id, text },
        ClientMessage::UploadFile { filename, data } => ServerCommand::UploadFile {
            client_id,
            filename,
            data,
        },
        ClientMessage::Typing => ServerCommand::Typing { client_id },
    }
}
