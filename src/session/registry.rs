//! Live session registry
//!
//! Each browser tab gets its own `Session` behind its own mutex, so a slow
//! model call in one tab never blocks another. Sessions leave the registry
//! when the page closes them or after sitting idle past the timeout.

use super::Session;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;

pub type SessionHandle = Arc<Mutex<Session>>;

struct SessionEntry {
    handle: SessionHandle,
    last_active: Instant,
}

pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, SessionEntry>>,
    idle_timeout: Duration,
}

impl SessionRegistry {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            idle_timeout,
        }
    }

    /// Create an empty session and return its id and handle
    pub async fn create(&self) -> (String, SessionHandle) {
        let id = uuid::Uuid::new_v4().to_string();
        let handle = Arc::new(Mutex::new(Session::new(id.clone())));

        let mut sessions = self.sessions.write().await;
        sessions.insert(
            id.clone(),
            SessionEntry {
                handle: handle.clone(),
                last_active: Instant::now(),
            },
        );
        tracing::info!(session_id = %id, live_sessions = sessions.len(), "Session created");

        (id, handle)
    }

    /// Look up a session and mark it active
    pub async fn get(&self, id: &str) -> Option<SessionHandle> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions.get_mut(id)?;
        entry.last_active = Instant::now();
        Some(entry.handle.clone())
    }

    /// Mark a session active, e.g. when a chat turn ends.
    /// Returns false if the session is gone.
    pub async fn touch(&self, id: &str) -> bool {
        self.touch_at(id, Instant::now()).await
    }

    async fn touch_at(&self, id: &str, now: Instant) -> bool {
        match self.sessions.write().await.get_mut(id) {
            Some(entry) => {
                entry.last_active = now;
                true
            }
            None => false,
        }
    }

    /// Discard a session. Returns false if it was already gone.
    pub async fn close(&self, id: &str) -> bool {
        let removed = self.sessions.write().await.remove(id).is_some();
        if removed {
            tracing::info!(session_id = %id, "Session closed");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drop sessions idle for longer than the timeout as of `now`.
    ///
    /// A session with a request in flight holds its lock and is kept.
    pub async fn sweep_expired(&self, now: Instant) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();

        sessions.retain(|id, entry| {
            let idle = now.saturating_duration_since(entry.last_active);
            let busy = entry.handle.try_lock().is_err();
            let keep = busy || idle <= self.idle_timeout;
            if !keep {
                tracing::info!(session_id = %id, idle_secs = idle.as_secs(), "Session expired");
            }
            keep
        });

        before - sessions.len()
    }

    /// Start the background task that expires idle sessions.
    /// The task stops once the registry is dropped.
    pub fn start_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let registry: Weak<Self> = Arc::downgrade(self);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(registry) = registry.upgrade() else {
                    break;
                };
                let expired = registry.sweep_expired(Instant::now()).await;
                if expired > 0 {
                    let live_sessions = registry.len().await;
                    tracing::debug!(expired, live_sessions, "Swept idle sessions");
                }
            }
            tracing::info!("Session sweeper stopped");
        })
    }
}
