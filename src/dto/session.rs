//! REST payloads for session bootstrap, membership, and inspection.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{dto::format_epoch_ms, state::session::Session};

/// Payload used to open a brand-new session.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateSessionRequest {
    /// Requested 4-digit session id.
    pub sid: String,
}

/// Confirmation returned once a session has been created.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionCreated {
    /// Id of the freshly created session.
    pub sid: String,
}

/// Payload used by a player to join an existing session.
#[derive(Debug, Deserialize, ToSchema)]
pub struct JoinRequest {
    /// Display name, 1-20 ASCII letters after trimming.
    pub name: String,
}

/// Acknowledgement for side-effect-only requests.
#[derive(Debug, Serialize, ToSchema)]
pub struct JoinAck {
    /// Always true on success.
    pub ok: bool,
}

/// One ranked buzz as exposed to REST and realtime clients.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, ToSchema)]
pub struct SubmissionView {
    /// 1-based rank in the current round.
    pub position: usize,
    /// Name of the player who buzzed.
    pub name: String,
    /// Buzz arrival time in milliseconds since the Unix epoch.
    pub timestamp: u64,
}

/// Public projection of a session, also used as the realtime `state` snapshot.
#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct SessionSummary {
    /// Session id.
    pub sid: String,
    /// Whether a round is running.
    pub active: bool,
    /// Player names in join order.
    pub players: Vec<String>,
    /// Current leaderboard, rank ascending.
    pub submissions: Vec<SubmissionView>,
}

impl From<(&str, &Session)> for SessionSummary {
    fn from((sid, session): (&str, &Session)) -> Self {
        Self {
            sid: sid.to_string(),
            active: session.is_active(),
            players: session.player_names(),
            submissions: submission_views(session),
        }
    }
}

/// Rank the session's submissions and attach their 1-based positions.
pub fn submission_views(session: &Session) -> Vec<SubmissionView> {
    session
        .ranked()
        .into_iter()
        .enumerate()
        .map(|(index, submission)| SubmissionView {
            position: index + 1,
            name: submission.name,
            timestamp: submission.epoch_ms,
        })
        .collect()
}

/// Render the session leaderboard as a CSV document.
///
/// Every field is double-quote-escaped; rows are ordered by rank.
pub fn submissions_csv(session: &Session) -> String {
    let mut csv = String::from("Position,Name,TimestampISO,EpochMS\r\n");
    for view in submission_views(session) {
        let row = [
            view.position.to_string(),
            view.name,
            format_epoch_ms(view.timestamp),
            view.timestamp.to_string(),
        ];
        let quoted: Vec<String> = row.iter().map(|field| csv_quote(field)).collect();
        csv.push_str(&quoted.join(","));
        csv.push_str("\r\n");
    }
    csv
}

fn csv_quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_reflects_ranked_round() {
        let mut session = Session::new();
        session.join("Alice").unwrap();
        session.join("Bob").unwrap();
        session.start();
        session.buzz("Bob", 100, || 1);
        session.buzz("Alice", 200, || 2);

        let summary = SessionSummary::from(("1234", &session));
        assert_eq!(summary.sid, "1234");
        assert!(summary.active);
        assert_eq!(summary.players, vec!["Alice", "Bob"]);
        assert_eq!(
            summary.submissions,
            vec![
                SubmissionView {
                    position: 1,
                    name: "Bob".into(),
                    timestamp: 100,
                },
                SubmissionView {
                    position: 2,
                    name: "Alice".into(),
                    timestamp: 200,
                },
            ]
        );
    }

    #[test]
    fn csv_has_header_and_one_quoted_row_per_submission() {
        let mut session = Session::new();
        session.join("Alice").unwrap();
        session.join("Bob").unwrap();
        session.start();
        session.buzz("Bob", 0, || 1);
        session.buzz("Alice", 1_700_000_000_123, || 2);

        let csv = submissions_csv(&session);
        let lines: Vec<&str> = csv.split("\r\n").filter(|line| !line.is_empty()).collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "Position,Name,TimestampISO,EpochMS");
        assert_eq!(lines[1], "\"1\",\"Bob\",\"1970-01-01T00:00:00Z\",\"0\"");
        assert_eq!(
            lines[2],
            "\"2\",\"Alice\",\"2023-11-14T22:13:20.123Z\",\"1700000000123\""
        );
    }

    #[test]
    fn csv_escapes_embedded_quotes() {
        assert_eq!(csv_quote("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
