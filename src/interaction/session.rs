//! Per-user browsing sessions.
//!
//! Each user gets one [`Session`] behind its own async mutex. The engine holds that
//! lock for the whole command, so commands of one user run one at a time while
//! different users never contend. Sessions are created on first use, dropped on
//! reset, and swept lazily once idle for longer than the TTL. A command queued
//! behind a reset runs on the session that replaces it.

use std::{collections::HashMap, sync::Arc, time::Duration};

use chrono::NaiveDate;
use tokio::{
    sync::{Mutex, OwnedMutexGuard},
    time::Instant,
};
use tracing::debug;

use crate::base::types::Event;

/// The last result set shown to a user, kept for paging and favoriting.
#[derive(Debug, Clone, Default)]
pub struct ResultPage {
    /// Header shown above every page.
    pub heading: String,
    /// All events of the result set.
    pub events: Vec<Event>,
    /// Zero-based index of the page currently shown.
    pub page: usize,
}

/// Browsing state of a single user.
#[derive(Debug, Clone)]
pub struct Session {
    /// The date currently being browsed.
    pub cursor: NaiveDate,
    /// The last result set, if any.
    pub results: Option<ResultPage>,
    /// Whether the next free-text message is a search term.
    pub awaiting_search: bool,
    last_seen: Instant,
}

impl Session {
    /// A fresh session browsing `today`.
    pub fn new(today: NaiveDate) -> Self {
        Self {
            cursor: today,
            results: None,
            awaiting_search: false,
            last_seen: Instant::now(),
        }
    }

    /// Find an event among the cached results.
    pub fn cached_event(&self, event_id: &str) -> Option<&Event> {
        self.results.as_ref().and_then(|r| r.events.iter().find(|e| e.id == event_id))
    }
}

/// Handle to a single user's session.
pub type SessionHandle = Arc<Mutex<Session>>;

/// Explicit session-state map keyed by user id.
///
/// This is trivially cloneable and can be passed around without the need for `Arc` or `Mutex`.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<Mutex<HashMap<String, SessionHandle>>>,
    ttl: Duration,
}

impl SessionStore {
    /// Create an empty store whose sessions expire after `ttl` of inactivity.
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Arc::default(),
            ttl,
        }
    }

    /// Get the user's session, creating one at `today` if none is live.
    ///
    /// Expired sessions (including the user's own) are dropped first.
    pub async fn get_or_create(&self, user_id: &str, today: NaiveDate) -> SessionHandle {
        let mut sessions = self.sessions.lock().await;
        let now = Instant::now();

        let before = sessions.len();
        sessions.retain(|_, session| match session.try_lock() {
            Ok(session) => now.duration_since(session.last_seen) < self.ttl,
            // Busy sessions are in use, so they are live.
            Err(_) => true,
        });

        if sessions.len() < before {
            debug!("Expired {} idle sessions", before - sessions.len());
        }

        sessions.entry(user_id.to_string()).or_insert_with(|| Arc::new(Mutex::new(Session::new(today)))).clone()
    }

    /// Lock the user's live session, creating one at `today` if needed.
    ///
    /// A waiter can wake up holding a session that was reset or expired in the
    /// meantime; it then retries on the session that replaced it.
    pub async fn lock(&self, user_id: &str, today: NaiveDate) -> OwnedMutexGuard<Session> {
        loop {
            let handle = self.get_or_create(user_id, today).await;
            let session = handle.clone().lock_owned().await;

            if self.is_current(user_id, &handle).await {
                return session;
            }

            debug!("Session of {} was replaced while waiting, retrying", user_id);
        }
    }

    async fn is_current(&self, user_id: &str, handle: &SessionHandle) -> bool {
        self.sessions.lock().await.get(user_id).is_some_and(|current| Arc::ptr_eq(current, handle))
    }

    /// Mark the session as used now.
    pub fn touch(session: &mut Session) {
        session.last_seen = Instant::now();
    }

    /// Drop the user's session; returns whether one existed.
    pub async fn remove(&self, user_id: &str) -> bool {
        self.sessions.lock().await.remove(user_id).is_some()
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Whether there are no live sessions.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
