//! WebSocket connection lifecycle for session participants.

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::{
    sync::{broadcast, mpsc},
    task::JoinHandle,
};
use tracing::{info, warn};

use crate::{
    dto::ws::{ClientMessage, ServerMessage},
    services::session_service::{self, BuzzFeedback},
    state::SharedState,
};

/// Notice unicast when a realtime subscribe names a session that does not
/// exist.
const SESSION_NOT_FOUND: &str = "Session not found.";

/// Internal error type for socket delivery.
#[derive(Debug, Error)]
enum SocketError {
    /// Writer channel closed, the connection should be terminated.
    #[error("connection closed")]
    ConnectionClosed,
}

/// Handle the full lifecycle for an individual participant WebSocket
/// connection.
///
/// A dedicated writer task keeps outbound messages flowing even while we await
/// inbound frames; a second task forwards the subscribed session's broadcast
/// events into the writer. Dropping the connection tears both down but leaves
/// the player's session membership untouched.
pub async fn handle_socket(state: SharedState, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let mut subscription: Option<JoinHandle<()>> = None;

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(command) => {
                    handle_command(&state, command, &outbound_tx, &mut subscription).await;
                }
                Err(err) => {
                    warn!(error = %err, "failed to parse client message");
                }
            },
            Ok(Message::Ping(payload)) => {
                let _ = outbound_tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(frame)) => {
                info!("participant closed");
                let _ = outbound_tx.send(Message::Close(frame));
                break;
            }
            Ok(Message::Binary(_)) => {}
            Ok(Message::Pong(_)) => {}
            Err(err) => {
                warn!(error = %err, "websocket error");
                break;
            }
        }
    }

    if let Some(forwarder) = subscription.take() {
        forwarder.abort();
    }
    finalize(writer_task, outbound_tx).await;
}

/// Dispatch one parsed client command.
///
/// Realtime failures are silent no-ops except a subscribe against a missing
/// session, which gets a one-shot `error_message`.
async fn handle_command(
    state: &SharedState,
    command: ClientMessage,
    outbound_tx: &mpsc::UnboundedSender<Message>,
    subscription: &mut Option<JoinHandle<()>>,
) {
    match command {
        ClientMessage::JoinSession { sid, role, name } => {
            match session_service::subscribe(state, &sid).await {
                Ok((events, snapshot)) => {
                    info!(
                        %sid,
                        ?role,
                        name = name.as_deref().unwrap_or("-"),
                        "participant subscribed"
                    );
                    // Re-joining moves the connection to the new session.
                    if let Some(previous) = subscription.take() {
                        previous.abort();
                    }
                    *subscription = Some(spawn_forwarder(events, outbound_tx.clone()));
                    let _ = send_message_to_websocket(outbound_tx, &ServerMessage::state(snapshot));
                }
                Err(err) => {
                    info!(%sid, error = %err, "subscribe rejected");
                    let _ = send_message_to_websocket(
                        outbound_tx,
                        &ServerMessage::ErrorMessage {
                            message: SESSION_NOT_FOUND.to_string(),
                        },
                    );
                }
            }
        }
        ClientMessage::StartGame { sid } => {
            session_service::start_round(state, &sid).await;
        }
        ClientMessage::ResetGame { sid } => {
            session_service::reset_round(state, &sid).await;
        }
        ClientMessage::Buzz { sid, name } => {
            if session_service::buzz(state, &sid, &name).await == BuzzFeedback::Fouled {
                let _ = send_message_to_websocket(outbound_tx, &ServerMessage::YouFouled);
            }
        }
        ClientMessage::Unknown => {}
    }
}

/// Forward session broadcast events into this connection's writer.
///
/// A lagged subscriber drops the missed events and keeps going; the stream
/// ends when either side goes away.
fn spawn_forwarder(
    mut events: broadcast::Receiver<ServerMessage>,
    outbound_tx: mpsc::UnboundedSender<Message>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if send_message_to_websocket(&outbound_tx, &event).is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "subscriber lagged; events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

/// Serialize a payload and push it onto the provided WebSocket sender.
///
/// Serialization failure is permanent (a bug), so it is logged and swallowed;
/// a closed writer channel is surfaced so the caller can stop the connection.
fn send_message_to_websocket(
    tx: &mpsc::UnboundedSender<Message>,
    value: &ServerMessage,
) -> Result<(), SocketError> {
    let payload = match serde_json::to_string(value) {
        Ok(payload) => payload,
        Err(err) => {
            warn!(error = %err, "failed to serialize message `{value:?}`");
            return Ok(());
        }
    };

    tx.send(Message::Text(payload.into()))
        .map_err(|_| SocketError::ConnectionClosed)
}

/// Ensure the writer task winds down before we return from the socket handler.
async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}
