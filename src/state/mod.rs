//! Shared application state: the session store, broadcast hub, and buzz
//! sequencing.

pub mod hub;
pub mod session;

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use dashmap::{DashMap, mapref::entry::Entry};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::config::AppConfig;

pub use self::hub::BroadcastHub;
pub use self::session::{BuzzOutcome, JoinError, PlayerStatus, Session, Submission};

/// Shared handle to [`AppState`], cloned into every gateway.
pub type SharedState = Arc<AppState>;

/// Error returned when a session cannot be created.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum CreateSessionError {
    /// A session with this id already exists.
    #[error("session `{0}` already exists")]
    AlreadyExists(String),
}

/// Central application state owning every live session.
///
/// The `sessions` map guards creation and lookup; each session carries its own
/// mutex so all four transitions on one session are serialized against each
/// other while distinct sessions stay fully independent. `buzz_seq` is the
/// process-wide tie-breaker drawn whenever a buzz is accepted.
pub struct AppState {
    sessions: DashMap<String, Arc<Mutex<Session>>>,
    hub: BroadcastHub,
    buzz_seq: AtomicU64,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned
    /// cheaply.
    pub fn new(config: &AppConfig) -> SharedState {
        Arc::new(Self {
            sessions: DashMap::new(),
            hub: BroadcastHub::new(config.hub_capacity),
            buzz_seq: AtomicU64::new(1),
        })
    }

    /// Create a fresh idle session under `sid`.
    ///
    /// The id is assumed syntactically valid; the service layer rejects bad
    /// input before it reaches the store. Sessions are never created
    /// implicitly by join or subscribe.
    pub fn create_session(&self, sid: &str) -> Result<(), CreateSessionError> {
        match self.sessions.entry(sid.to_string()) {
            Entry::Occupied(_) => Err(CreateSessionError::AlreadyExists(sid.to_string())),
            Entry::Vacant(vacant) => {
                vacant.insert(Arc::new(Mutex::new(Session::new())));
                Ok(())
            }
        }
    }

    /// Look up the session registered under `sid`.
    pub fn session(&self, sid: &str) -> Option<Arc<Mutex<Session>>> {
        self.sessions.get(sid).map(|entry| entry.value().clone())
    }

    /// Broadcast hub used to fan events out to session subscribers.
    pub fn hub(&self) -> &BroadcastHub {
        &self.hub
    }

    /// Draw the next buzz sequence number.
    pub fn next_seq(&self) -> u64 {
        self.buzz_seq.fetch_add(1, Ordering::Relaxed)
    }
}
