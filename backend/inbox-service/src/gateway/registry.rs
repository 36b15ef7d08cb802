//! Live session registry and event dispatch.
//!
//! The registry holds at most one live sender per user: the external
//! session-registry contract is "zero or one transport handle". A new
//! session replaces the previous one; the replaced pump loop sees its
//! channel close and exits. Registration hands back a session id so that a
//! replaced pump's cleanup cannot tear down its successor.
//!
//! Dispatch is fire-and-forget: if the target has no live session the event
//! is dropped on the floor (the durable write already happened upstream),
//! and a closed channel is pruned on the spot. Nothing here can stall or
//! fail a caller's write path.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use super::events::GatewayEvent;

pub type SessionSender = mpsc::UnboundedSender<String>;

struct Session {
    id: Uuid,
    sender: SessionSender,
}

#[derive(Default, Clone)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<Uuid, Session>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a live session for the user, replacing any existing one.
    /// Returns the session id (for cleanup) and the receiving half the
    /// transport pump drains.
    pub async fn register(&self, user_id: Uuid) -> (Uuid, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let session_id = Uuid::new_v4();
        let mut sessions = self.sessions.write().await;
        if sessions
            .insert(
                user_id,
                Session {
                    id: session_id,
                    sender: tx,
                },
            )
            .is_some()
        {
            tracing::debug!(%user_id, "replaced existing live session");
        }
        crate::metrics::set_live_sessions(sessions.len() as i64);
        (session_id, rx)
    }

    /// Drops the user's live session, but only if it is still the one the
    /// caller registered. A replaced pump must not evict its successor.
    pub async fn unregister(&self, user_id: Uuid, session_id: Uuid) {
        let mut sessions = self.sessions.write().await;
        if sessions.get(&user_id).map(|s| s.id) == Some(session_id) {
            sessions.remove(&user_id);
        }
        crate::metrics::set_live_sessions(sessions.len() as i64);
    }

    pub async fn is_online(&self, user_id: Uuid) -> bool {
        self.sessions.read().await.contains_key(&user_id)
    }

    pub async fn live_session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Pushes an event to the target's live session, if one exists.
    pub async fn dispatch(&self, target_user_id: Uuid, event: &GatewayEvent) {
        let payload = match event.to_payload(target_user_id) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(error = %e, event = event.event_type(), "failed to serialize gateway event");
                return;
            }
        };

        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get(&target_user_id) {
            if session.sender.send(payload).is_err() {
                // Receiver side is gone; forget the dead session.
                sessions.remove(&target_user_id);
                crate::metrics::set_live_sessions(sessions.len() as i64);
            }
        }
    }
}
