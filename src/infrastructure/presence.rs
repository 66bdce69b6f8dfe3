//! Presence Tracker
//!
//! In-memory registry of live gateway sessions. Presence is ephemeral by
//! design: it is never persisted and an engine restart resets everyone to
//! offline.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use crate::infrastructure::metrics;

/// Handle to one live session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    pub session_id: Uuid,
    pub connected_at: DateTime<Utc>,
}

/// Thread-safe map of online users, one session per user.
///
/// A reconnect replaces the previous session: the old handle is dropped and
/// a new session ID issued, so a stale connection can never shadow a live
/// one.
#[derive(Default)]
pub struct PresenceTracker {
    sessions: DashMap<Uuid, SessionHandle>,
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user as online, returning the new session ID.
    pub fn connect(&self, user_id: Uuid) -> Uuid {
        let handle = SessionHandle {
            session_id: Uuid::new_v4(),
            connected_at: Utc::now(),
        };
        let session_id = handle.session_id;

        let replaced = self.sessions.insert(user_id, handle).is_some();
        if replaced {
            tracing::debug!(%user_id, "Replaced existing session on reconnect");
        } else {
            metrics::ACTIVE_SESSIONS.inc();
        }

        session_id
    }

    /// Remove a user's session, reporting whether one existed. Disconnecting
    /// an offline user is a no-op.
    pub fn disconnect(&self, user_id: Uuid) -> bool {
        let removed = self.sessions.remove(&user_id).is_some();
        if removed {
            metrics::ACTIVE_SESSIONS.dec();
        }
        removed
    }

    pub fn is_online(&self, user_id: Uuid) -> bool {
        self.sessions.contains_key(&user_id)
    }

    pub fn session(&self, user_id: Uuid) -> Option<SessionHandle> {
        self.sessions.get(&user_id).map(|entry| entry.clone())
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}
