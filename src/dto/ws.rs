//! WebSocket wire messages exchanged with session participants.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::dto::session::SessionSummary;

/// Role announced by a connection when it subscribes to a session.
///
/// Informational only; it does not gate any command.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantRole {
    /// The connection drives the round (start/reset).
    Moderator,
    /// The connection races the buzzer.
    Player,
}

/// Messages accepted from session WebSocket clients.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Subscribe this connection to a session's event group.
    JoinSession {
        /// Target session id.
        sid: String,
        /// Announced role of the connection.
        role: ParticipantRole,
        /// Player name, informational at subscribe time.
        #[serde(default)]
        name: Option<String>,
    },
    /// Start the round.
    StartGame {
        /// Target session id.
        sid: String,
    },
    /// End the round and clear all submissions.
    ResetGame {
        /// Target session id.
        sid: String,
    },
    /// Race the buzzer.
    Buzz {
        /// Target session id.
        sid: String,
        /// Buzzing player's name.
        name: String,
    },
    /// Any unrecognised message type, ignored silently.
    #[serde(other)]
    Unknown,
}

/// Messages pushed to session WebSocket clients.
#[derive(Clone, Debug, Serialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Full session snapshot, sent on subscribe and after a reset.
    State(SessionSummary),
    /// Round started or stopped.
    GameState {
        /// Whether a round is now running.
        active: bool,
    },
    /// A player joined the session.
    PlayerJoined {
        /// Session the player joined.
        sid: String,
        /// The new player's name.
        name: String,
        /// Updated roster in join order.
        players: Vec<String>,
    },
    /// A buzz was accepted and ranked.
    NewSubmission {
        /// Name of the player who buzzed.
        name: String,
        /// Buzz arrival time in milliseconds since the Unix epoch.
        timestamp: u64,
    },
    /// The round was reset.
    Reset,
    /// Unicast to a connection whose buzz came in early.
    YouFouled,
    /// Unicast error notice, e.g. subscribing to a missing session.
    ErrorMessage {
        /// Human-readable description.
        message: String,
    },
}

impl ServerMessage {
    /// Convenience constructor for the snapshot message.
    pub fn state(summary: SessionSummary) -> Self {
        Self::State(summary)
    }
}
