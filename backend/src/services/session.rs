//! Per-session reference time.
//!
//! Every dashboard session keeps the instant it treats as "now". Preset
//! windows are resolved against that anchor, so repeated reads within a
//! session see the same window until the session is explicitly refreshed.

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock for tests and replays.
#[derive(Debug, Clone)]
pub struct FixedClock {
    now: Arc<RwLock<DateTime<Utc>>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(RwLock::new(now)),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.write() = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.write();
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read()
    }
}

/// Cached reference time of one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionAnchor {
    pub session_id: String,
    /// The session's "now".
    pub anchor: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    /// Number of explicit refreshes since creation.
    pub refresh_count: u32,
}

impl SessionAnchor {
    fn new(session_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            session_id: session_id.into(),
            anchor: now,
            created_at: now,
            refresh_count: 0,
        }
    }
}

/// Sessions kept before the least recently seeded one is evicted.
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

/// In-memory session store.
///
/// Holds at most `capacity` sessions. Inserting past that evicts the session
/// whose anchor is oldest.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, SessionAnchor>>>,
    clock: Arc<dyn Clock>,
    capacity: usize,
}

impl SessionStore {
    /// Create a store backed by the wall clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            clock,
            capacity: DEFAULT_MAX_SESSIONS,
        }
    }

    /// Limit the number of sessions held (at least one).
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity.max(1);
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current time according to the store's clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Create a session with a random id.
    #[cfg(feature = "http-server")]
    pub fn create(&self) -> SessionAnchor {
        self.create_with_id(uuid::Uuid::new_v4().to_string())
    }

    /// Create (or reset) a session under a caller-chosen id.
    pub fn create_with_id(&self, session_id: impl Into<String>) -> SessionAnchor {
        let session = SessionAnchor::new(session_id, self.clock.now());
        let mut sessions = self.sessions.write();
        self.insert(&mut sessions, session.clone());
        session
    }

    /// Anchor of `session_id`, creating the session on first use.
    pub fn anchor_for(&self, session_id: &str) -> DateTime<Utc> {
        if let Some(session) = self.sessions.read().get(session_id) {
            return session.anchor;
        }

        let mut sessions = self.sessions.write();
        if let Some(session) = sessions.get(session_id) {
            return session.anchor;
        }
        let session = SessionAnchor::new(session_id, self.clock.now());
        let anchor = session.anchor;
        self.insert(&mut sessions, session);
        anchor
    }

    /// Re-seed the anchor with the current time.
    ///
    /// Unknown sessions are created.
    pub fn refresh(&self, session_id: &str) -> SessionAnchor {
        let now = self.clock.now();
        let mut sessions = self.sessions.write();
        match sessions.get_mut(session_id) {
            Some(session) => {
                session.anchor = now;
                session.refresh_count += 1;
                session.clone()
            }
            None => {
                let session = SessionAnchor::new(session_id, now);
                self.insert(&mut sessions, session.clone());
                session
            }
        }
    }

    pub fn get(&self, session_id: &str) -> Option<SessionAnchor> {
        self.sessions.read().get(session_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    fn insert(&self, sessions: &mut HashMap<String, SessionAnchor>, session: SessionAnchor) {
        if !sessions.contains_key(&session.session_id) {
            while sessions.len() >= self.capacity {
                let oldest = sessions
                    .values()
                    .min_by_key(|s| (s.anchor, s.created_at))
                    .map(|s| s.session_id.clone());
                match oldest {
                    Some(id) => {
                        sessions.remove(&id);
                        log::debug!("Evicted session {}", id);
                    }
                    None => break,
                }
            }
        }
        sessions.insert(session.session_id.clone(), session);
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
