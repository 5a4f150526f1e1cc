//! Orchestration of session transitions for both gateways.
//!
//! Request/response callers get structured [`ServiceError`]s; realtime
//! callers use the fire-and-forget variants that swallow invalid input and
//! missing sessions, per the socket semantics.

use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use tokio::sync::{Mutex, broadcast};
use tracing::{debug, info};
use validator::ValidationError;

use crate::{
    dto::{
        session::{self, CreateSessionRequest, SessionCreated, SessionSummary},
        validation::{is_valid_name, validate_name, validate_sid},
        ws::ServerMessage,
    },
    error::ServiceError,
    state::{BuzzOutcome, Session, SharedState},
};

/// Feedback relayed to the realtime gateway after a buzz command.
#[derive(Debug, Eq, PartialEq)]
pub enum BuzzFeedback {
    /// The buzz was ranked and announced to the session.
    Accepted,
    /// The buzz was early; the connection must be told it fouled.
    Fouled,
    /// Nothing happened (duplicate, locked out, unknown session or name).
    Ignored,
}

/// Open a new session under the requested 4-digit id.
pub async fn create_session(
    state: &SharedState,
    request: CreateSessionRequest,
) -> Result<SessionCreated, ServiceError> {
    let sid = request.sid;
    validate_sid(&sid).map_err(|err| ServiceError::InvalidId(validation_message(err)))?;
    state.create_session(&sid)?;

    info!(%sid, "session created");
    Ok(SessionCreated { sid })
}

/// Snapshot a session for the request/response surface.
pub async fn session_summary(
    state: &SharedState,
    sid: &str,
) -> Result<SessionSummary, ServiceError> {
    let handle = require_session(state, sid)?;
    let session = handle.lock().await;
    Ok(SessionSummary::from((sid, &*session)))
}

/// Register a player in an existing session and announce the new roster.
pub async fn join_session(
    state: &SharedState,
    sid: &str,
    name: &str,
) -> Result<(), ServiceError> {
    validate_name(name).map_err(|err| ServiceError::InvalidName(validation_message(err)))?;
    let name = name.trim();

    let handle = require_session(state, sid)?;
    let players = {
        let mut session = handle.lock().await;
        session.join(name)?;
        session.player_names()
    };

    info!(%sid, %name, "player joined");
    state.hub().publish(
        sid,
        ServerMessage::PlayerJoined {
            sid: sid.to_string(),
            name: name.to_string(),
            players,
        },
    );
    Ok(())
}

/// Subscribe a connection to a session's event group.
///
/// The receiver is registered before the snapshot is taken so no event falls
/// between the two; the caller unicasts the returned snapshot to the new
/// subscriber only.
pub async fn subscribe(
    state: &SharedState,
    sid: &str,
) -> Result<(broadcast::Receiver<ServerMessage>, SessionSummary), ServiceError> {
    let handle = require_session(state, sid)?;
    let receiver = state.hub().subscribe(sid);
    let session = handle.lock().await;
    Ok((receiver, SessionSummary::from((sid, &*session))))
}

/// Start the round. Silent no-op when the session does not exist.
pub async fn start_round(state: &SharedState, sid: &str) {
    let Some(handle) = state.session(sid) else {
        debug!(%sid, "start ignored: unknown session");
        return;
    };

    handle.lock().await.start();
    info!(%sid, "round started");
    state
        .hub()
        .publish(sid, ServerMessage::GameState { active: true });
}

/// Reset the round. Silent no-op when the session does not exist.
///
/// Subscribers observe `reset`, then `game_state{active:false}`, then the
/// full `state` snapshot, in that order.
pub async fn reset_round(state: &SharedState, sid: &str) {
    let Some(handle) = state.session(sid) else {
        debug!(%sid, "reset ignored: unknown session");
        return;
    };

    let summary = {
        let mut session = handle.lock().await;
        session.reset();
        SessionSummary::from((sid, &*session))
    };

    info!(%sid, "round reset");
    let hub = state.hub();
    hub.publish(sid, ServerMessage::Reset);
    hub.publish(sid, ServerMessage::GameState { active: false });
    hub.publish(sid, ServerMessage::state(summary));
}

/// Arbitrate a buzz from the realtime gateway.
///
/// Unknown sessions and syntactically invalid names are silent no-ops. An
/// accepted buzz is announced to all session subscribers; a foul is reported
/// back to the caller for unicast delivery only.
pub async fn buzz(state: &SharedState, sid: &str, name: &str) -> BuzzFeedback {
    if !is_valid_name(name) {
        debug!(%sid, "buzz ignored: invalid name");
        return BuzzFeedback::Ignored;
    }
    let name = name.trim();

    let Some(handle) = state.session(sid) else {
        debug!(%sid, "buzz ignored: unknown session");
        return BuzzFeedback::Ignored;
    };

    // Status check, sequence draw, and submission append happen under one
    // lock acquisition so concurrent buzzes serialize cleanly.
    let outcome = {
        let mut session = handle.lock().await;
        session.buzz(name, now_epoch_ms(), || state.next_seq())
    };

    match outcome {
        BuzzOutcome::Accepted(submission) => {
            info!(%sid, %name, epoch_ms = submission.epoch_ms, seq = submission.seq, "buzz ranked");
            state.hub().publish(
                sid,
                ServerMessage::NewSubmission {
                    name: submission.name,
                    timestamp: submission.epoch_ms,
                },
            );
            BuzzFeedback::Accepted
        }
        BuzzOutcome::Fouled => {
            info!(%sid, %name, "early buzz fouled");
            BuzzFeedback::Fouled
        }
        BuzzOutcome::Ignored => BuzzFeedback::Ignored,
    }
}

/// Export the session leaderboard as CSV.
pub async fn submissions_csv(state: &SharedState, sid: &str) -> Result<String, ServiceError> {
    let handle = require_session(state, sid)?;
    let session = handle.lock().await;
    Ok(session::submissions_csv(&session))
}

fn require_session(state: &SharedState, sid: &str) -> Result<Arc<Mutex<Session>>, ServiceError> {
    state
        .session(sid)
        .ok_or_else(|| ServiceError::NotFound(format!("session `{sid}` not found")))
}

fn now_epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

fn validation_message(err: ValidationError) -> String {
    err.message
        .as_ref()
        .map(|message| message.to_string())
        .unwrap_or_else(|| err.code.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::AppConfig, dto::ws::ServerMessage, state::AppState};

    fn state() -> SharedState {
        AppState::new(&AppConfig::default())
    }

    async fn create(state: &SharedState, sid: &str) {
        create_session(state, CreateSessionRequest { sid: sid.into() })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn create_rejects_bad_ids_and_duplicates() {
        let state = state();

        let err = create_session(&state, CreateSessionRequest { sid: "12a4".into() })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidId(_)));

        create(&state, "1234").await;
        let err = create_session(&state, CreateSessionRequest { sid: "1234".into() })
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn join_requires_existing_session() {
        let state = state();
        let err = join_session(&state, "1234", "Alice").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn join_trims_validates_and_broadcasts() {
        let state = state();
        create(&state, "1234").await;
        let (mut events, _) = subscribe(&state, "1234").await.unwrap();

        let err = join_session(&state, "1234", "not a name!").await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidName(_)));

        join_session(&state, "1234", "  Alice  ").await.unwrap();
        let err = join_session(&state, "1234", "Alice").await.unwrap_err();
        assert!(matches!(err, ServiceError::NameTaken(_)));

        match events.recv().await.unwrap() {
            ServerMessage::PlayerJoined { sid, name, players } => {
                assert_eq!(sid, "1234");
                assert_eq!(name, "Alice");
                assert_eq!(players, vec!["Alice"]);
            }
            other => panic!("expected player_joined, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn same_name_can_join_distinct_sessions() {
        let state = state();
        create(&state, "1111").await;
        create(&state, "2222").await;

        join_session(&state, "1111", "Alice").await.unwrap();
        join_session(&state, "2222", "Alice").await.unwrap();
    }

    #[tokio::test]
    async fn subscribe_requires_existing_session_and_snapshots() {
        let state = state();
        assert!(subscribe(&state, "9999").await.is_err());

        create(&state, "9999").await;
        join_session(&state, "9999", "Bob").await.unwrap();
        let (_events, snapshot) = subscribe(&state, "9999").await.unwrap();
        assert_eq!(snapshot.players, vec!["Bob"]);
        assert!(!snapshot.active);
    }

    #[tokio::test]
    async fn start_and_buzz_on_unknown_session_are_silent() {
        let state = state();
        start_round(&state, "0000").await;
        reset_round(&state, "0000").await;
        assert_eq!(buzz(&state, "0000", "Alice").await, BuzzFeedback::Ignored);
    }

    #[tokio::test]
    async fn early_buzz_fouls_and_stays_fouled() {
        let state = state();
        create(&state, "0007").await;
        join_session(&state, "0007", "Tom").await.unwrap();
        let (mut events, _) = subscribe(&state, "0007").await.unwrap();
        // Drain the join broadcast if it raced the subscription.
        while let Ok(event) = events.try_recv() {
            assert!(matches!(event, ServerMessage::PlayerJoined { .. }));
        }

        assert_eq!(buzz(&state, "0007", "Tom").await, BuzzFeedback::Fouled);
        // No submission broadcast for a foul.
        assert!(events.try_recv().is_err());

        start_round(&state, "0007").await;
        // Foul is sticky across the start transition.
        assert_eq!(buzz(&state, "0007", "Tom").await, BuzzFeedback::Ignored);

        let summary = session_summary(&state, "0007").await.unwrap();
        assert!(summary.submissions.is_empty());
    }

    #[tokio::test]
    async fn ranked_buzzes_are_announced_and_positioned() {
        let state = state();
        create(&state, "1234").await;
        join_session(&state, "1234", "Alice").await.unwrap();
        join_session(&state, "1234", "Bob").await.unwrap();
        start_round(&state, "1234").await;
        let (mut events, _) = subscribe(&state, "1234").await.unwrap();

        assert_eq!(buzz(&state, "1234", "Bob").await, BuzzFeedback::Accepted);
        assert_eq!(buzz(&state, "1234", "Alice").await, BuzzFeedback::Accepted);
        // Duplicate buzz is a no-op.
        assert_eq!(buzz(&state, "1234", "Bob").await, BuzzFeedback::Ignored);

        match events.recv().await.unwrap() {
            ServerMessage::NewSubmission { name, .. } => assert_eq!(name, "Bob"),
            other => panic!("expected new_submission, got {other:?}"),
        }

        let summary = session_summary(&state, "1234").await.unwrap();
        let order: Vec<(usize, &str)> = summary
            .submissions
            .iter()
            .map(|view| (view.position, view.name.as_str()))
            .collect();
        assert_eq!(order, vec![(1, "Bob"), (2, "Alice")]);
    }

    #[tokio::test]
    async fn reset_emits_reset_game_state_then_snapshot() {
        let state = state();
        create(&state, "1234").await;
        join_session(&state, "1234", "Alice").await.unwrap();
        start_round(&state, "1234").await;
        buzz(&state, "1234", "Alice").await;

        let (mut events, _) = subscribe(&state, "1234").await.unwrap();
        reset_round(&state, "1234").await;

        assert!(matches!(events.recv().await.unwrap(), ServerMessage::Reset));
        assert!(matches!(
            events.recv().await.unwrap(),
            ServerMessage::GameState { active: false }
        ));
        match events.recv().await.unwrap() {
            ServerMessage::State(summary) => {
                assert!(!summary.active);
                assert!(summary.submissions.is_empty());
                assert_eq!(summary.players, vec!["Alice"]);
            }
            other => panic!("expected state snapshot, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn csv_export_matches_ranking() {
        let state = state();
        create(&state, "4242").await;
        join_session(&state, "4242", "Alice").await.unwrap();
        join_session(&state, "4242", "Bob").await.unwrap();
        start_round(&state, "4242").await;
        buzz(&state, "4242", "Bob").await;
        buzz(&state, "4242", "Alice").await;

        let csv = submissions_csv(&state, "4242").await.unwrap();
        let lines: Vec<&str> = csv.split("\r\n").filter(|line| !line.is_empty()).collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "Position,Name,TimestampISO,EpochMS");
        assert!(lines[1].starts_with("\"1\",\"Bob\","));
        assert!(lines[2].starts_with("\"2\",\"Alice\","));

        let err = submissions_csv(&state, "0000").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }
}
