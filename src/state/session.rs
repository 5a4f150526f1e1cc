//! Per-session entity and the buzz-arbitration state machine.
//!
//! All transitions are synchronous and never block on I/O; callers serialize
//! them through the per-session lock owned by [`crate::state::AppState`].

use std::time::SystemTime;

use indexmap::IndexMap;
use serde::Serialize;
use thiserror::Error;

/// Sticky per-player status within the current round.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerStatus {
    /// The player has not buzzed in this round.
    #[default]
    Idle,
    /// The player holds a ranked submission in this round.
    Buzzed,
    /// The player buzzed while no round was running and is locked out until reset.
    Foul,
}

/// A recorded, valid (non-foul) buzz.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Submission {
    /// Name of the player who buzzed.
    pub name: String,
    /// Wall-clock arrival time in milliseconds since the Unix epoch.
    pub epoch_ms: u64,
    /// Process-wide monotonic counter value, tie-breaker for equal timestamps.
    pub seq: u64,
}

/// Error returned when a join transition is rejected.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum JoinError {
    /// The name is already registered in this session.
    #[error("name `{0}` is already taken in this session")]
    NameTaken(String),
}

/// Result of applying a buzz transition.
#[derive(Debug, Eq, PartialEq)]
pub enum BuzzOutcome {
    /// The buzz was valid and ranked; carries the recorded submission.
    Accepted(Submission),
    /// The round was not running; the player is now fouled and must be told so.
    Fouled,
    /// Duplicate or locked-out buzz, no state change and no notification.
    Ignored,
}

/// One buzzer-game room and its round state.
///
/// `players` doubles as the status map: every joined name has exactly one
/// status entry, and iteration preserves join order for stable display.
#[derive(Debug)]
pub struct Session {
    active: bool,
    players: IndexMap<String, PlayerStatus>,
    submissions: Vec<Submission>,
    created_at: SystemTime,
}

impl Session {
    /// Create an idle session with no players.
    pub fn new() -> Self {
        Self {
            active: false,
            players: IndexMap::new(),
            submissions: Vec::new(),
            created_at: SystemTime::now(),
        }
    }

    /// Whether a round is currently running.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Instant the session was created, kept for a future eviction sweep.
    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    /// Player names in join order.
    pub fn player_names(&self) -> Vec<String> {
        self.players.keys().cloned().collect()
    }

    /// Current status of a joined player.
    pub fn status(&self, name: &str) -> Option<PlayerStatus> {
        self.players.get(name).copied()
    }

    /// Register a new player with status [`PlayerStatus::Idle`].
    ///
    /// Names are case-sensitive exact strings; the caller validates syntax.
    pub fn join(&mut self, name: &str) -> Result<(), JoinError> {
        if self.players.contains_key(name) {
            return Err(JoinError::NameTaken(name.to_string()));
        }
        self.players.insert(name.to_string(), PlayerStatus::Idle);
        Ok(())
    }

    /// Start a round. Idempotent; player statuses and submissions are untouched.
    pub fn start(&mut self) {
        self.active = true;
    }

    /// End the round: clear submissions and return every player to idle.
    ///
    /// Player membership survives resets.
    pub fn reset(&mut self) {
        self.active = false;
        self.submissions.clear();
        for status in self.players.values_mut() {
            *status = PlayerStatus::Idle;
        }
    }

    /// Arbitrate a buzz.
    ///
    /// A player who already buzzed or fouled is ignored outright, so fouls stay
    /// sticky across a later `start` and duplicate buzzes from retries collapse
    /// into one submission. While no round runs the buzz is a foul; otherwise it
    /// is ranked with `epoch_ms` and a sequence number drawn from `next_seq`
    /// only at the moment of acceptance.
    pub fn buzz(
        &mut self,
        name: &str,
        epoch_ms: u64,
        next_seq: impl FnOnce() -> u64,
    ) -> BuzzOutcome {
        // A name missing from the map counts as idle so an un-joined buzz still
        // resolves deterministically instead of panicking.
        let status = self.players.get(name).copied().unwrap_or_default();

        if matches!(status, PlayerStatus::Buzzed | PlayerStatus::Foul) {
            return BuzzOutcome::Ignored;
        }

        if !self.active {
            self.players.insert(name.to_string(), PlayerStatus::Foul);
            return BuzzOutcome::Fouled;
        }

        let submission = Submission {
            name: name.to_string(),
            epoch_ms,
            seq: next_seq(),
        };
        self.players.insert(name.to_string(), PlayerStatus::Buzzed);
        self.submissions.push(submission.clone());
        BuzzOutcome::Accepted(submission)
    }

    /// Submissions of the current round ordered by `(epoch_ms, seq)` ascending.
    ///
    /// Rank is the 1-based index in this order. The sequence number breaks ties
    /// between buzzes landing in the same millisecond.
    pub fn ranked(&self) -> Vec<Submission> {
        let mut ranked = self.submissions.clone();
        ranked.sort_by_key(|submission| (submission.epoch_ms, submission.seq));
        ranked
    }

    /// Number of submissions recorded in the current round.
    pub fn submission_count(&self) -> usize {
        self.submissions.len()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq_from(counter: &mut u64) -> u64 {
        *counter += 1;
        *counter
    }

    #[test]
    fn join_registers_player_as_idle() {
        let mut session = Session::new();
        session.join("Alice").unwrap();

        assert_eq!(session.status("Alice"), Some(PlayerStatus::Idle));
        assert_eq!(session.player_names(), vec!["Alice"]);
    }

    #[test]
    fn joining_same_name_twice_is_a_conflict() {
        let mut session = Session::new();
        session.join("Alice").unwrap();

        assert_eq!(
            session.join("Alice"),
            Err(JoinError::NameTaken("Alice".into()))
        );
        assert_eq!(session.player_names().len(), 1);
    }

    #[test]
    fn names_are_case_sensitive() {
        let mut session = Session::new();
        session.join("Alice").unwrap();
        session.join("alice").unwrap();

        assert_eq!(session.player_names(), vec!["Alice", "alice"]);
    }

    #[test]
    fn player_order_is_join_order() {
        let mut session = Session::new();
        for name in ["Carol", "Alice", "Bob"] {
            session.join(name).unwrap();
        }

        assert_eq!(session.player_names(), vec!["Carol", "Alice", "Bob"]);
    }

    #[test]
    fn start_is_idempotent() {
        let mut session = Session::new();
        session.join("Alice").unwrap();
        session.start();
        session.buzz("Alice", 10, || 1);
        session.start();

        assert!(session.is_active());
        assert_eq!(session.status("Alice"), Some(PlayerStatus::Buzzed));
        assert_eq!(session.submission_count(), 1);
    }

    #[test]
    fn buzz_while_inactive_fouls_without_submission() {
        let mut session = Session::new();
        session.join("Tom").unwrap();

        assert_eq!(session.buzz("Tom", 10, || 1), BuzzOutcome::Fouled);
        assert_eq!(session.status("Tom"), Some(PlayerStatus::Foul));
        assert_eq!(session.submission_count(), 0);
    }

    #[test]
    fn foul_is_sticky_and_silent_on_repeat() {
        let mut session = Session::new();
        session.join("Tom").unwrap();
        session.buzz("Tom", 10, || 1);

        // Still inactive: no re-foul, no second notification.
        assert_eq!(session.buzz("Tom", 11, || 2), BuzzOutcome::Ignored);

        // Foul survives the transition into an active round until reset.
        session.start();
        assert_eq!(session.buzz("Tom", 12, || 3), BuzzOutcome::Ignored);
        assert_eq!(session.status("Tom"), Some(PlayerStatus::Foul));
        assert_eq!(session.submission_count(), 0);
    }

    #[test]
    fn active_buzz_records_one_submission_per_player() {
        let mut session = Session::new();
        session.join("Bob").unwrap();
        session.start();

        let outcome = session.buzz("Bob", 100, || 7);
        assert_eq!(
            outcome,
            BuzzOutcome::Accepted(Submission {
                name: "Bob".into(),
                epoch_ms: 100,
                seq: 7,
            })
        );
        assert_eq!(session.status("Bob"), Some(PlayerStatus::Buzzed));

        // Duplicate buzz before reset is a no-op.
        assert_eq!(session.buzz("Bob", 101, || 8), BuzzOutcome::Ignored);
        assert_eq!(session.submission_count(), 1);
    }

    #[test]
    fn reset_clears_round_but_keeps_players() {
        let mut session = Session::new();
        session.join("Alice").unwrap();
        session.join("Tom").unwrap();
        session.buzz("Tom", 5, || 1);
        session.start();
        session.buzz("Alice", 6, || 2);

        session.reset();

        assert!(!session.is_active());
        assert_eq!(session.submission_count(), 0);
        assert_eq!(session.player_names(), vec!["Alice", "Tom"]);
        assert_eq!(session.status("Alice"), Some(PlayerStatus::Idle));
        assert_eq!(session.status("Tom"), Some(PlayerStatus::Idle));
    }

    #[test]
    fn ranking_orders_by_timestamp_then_sequence() {
        let mut session = Session::new();
        for name in ["A", "B", "C", "D"] {
            session.join(name).unwrap();
        }
        session.start();

        let mut counter = 0;
        session.buzz("C", 300, || seq_from(&mut counter));
        session.buzz("A", 100, || seq_from(&mut counter));
        // Same millisecond: sequence numbers decide.
        session.buzz("B", 100, || seq_from(&mut counter));
        session.buzz("D", 200, || seq_from(&mut counter));

        let ranked = session.ranked();
        let order: Vec<&str> = ranked
            .iter()
            .map(|submission| submission.name.as_str())
            .collect();
        // B beats no one on timestamp but loses the tie against A on sequence.
        assert_eq!(order, vec!["A", "B", "D", "C"]);
    }

    #[test]
    fn full_round_with_two_players() {
        let mut session = Session::new();
        session.join("Alice").unwrap();
        session.join("Bob").unwrap();
        session.start();

        let mut counter = 0;
        session.buzz("Bob", 50, || seq_from(&mut counter));
        let ranked = session.ranked();
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].name, "Bob");

        session.buzz("Alice", 60, || seq_from(&mut counter));
        let ranked = session.ranked();
        assert_eq!(
            ranked.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(),
            vec!["Bob", "Alice"]
        );

        session.reset();
        assert_eq!(session.submission_count(), 0);
        assert_eq!(session.status("Alice"), Some(PlayerStatus::Idle));
        assert_eq!(session.status("Bob"), Some(PlayerStatus::Idle));
    }
}
