//! Tracks transport connections and the session each one has joined.
//!
//! Each connection owns an unbounded outbound channel drained by its writer
//! task, so events sent to one connection are delivered in send order.

use crate::protocol::OutboundEvent;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

pub type ConnectionId = Uuid;
pub type OutboundSender = mpsc::UnboundedSender<OutboundEvent>;

/// Delivers events to every connection of a session.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn deliver(&self, session_id: &str, event: OutboundEvent);
}

struct ConnectionEntry {
    session_id: Option<String>,
    sender: OutboundSender,
}

#[derive(Default)]
struct RegistryState {
    connections: HashMap<ConnectionId, ConnectionEntry>,
    sessions: HashMap<String, HashSet<ConnectionId>>,
}

impl RegistryState {
    /// Detaches `conn_id` from its session. Returns the session id when the
    /// connection was its last one.
    fn unbind(&mut self, conn_id: ConnectionId, session_id: &str) -> bool {
        let Some(members) = self.sessions.get_mut(session_id) else {
            return false;
        };
        members.remove(&conn_id);
        if members.is_empty() {
            self.sessions.remove(session_id);
            true
        } else {
            false
        }
    }
}

/// What happened to the previous session when a connection left it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Departure {
    pub session_id: String,
    /// No connection of the session remains.
    pub was_last: bool,
}

#[derive(Default)]
pub struct ConnectionRegistry {
    state: RwLock<RegistryState>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new transport connection.
    pub async fn connect(&self, sender: OutboundSender) -> ConnectionId {
        let conn_id = Uuid::new_v4();
        self.state.write().await.connections.insert(
            conn_id,
            ConnectionEntry {
                session_id: None,
                sender,
            },
        );
        tracing::debug!("[ConnectionRegistry] Connected {}", conn_id);
        conn_id
    }

    /// Binds a connection to `session_id`.
    ///
    /// A connection belongs to at most one session; if it was bound to a
    /// different one, the departure from that session is returned.
    pub async fn bind(&self, conn_id: ConnectionId, session_id: &str) -> Option<Departure> {
        let mut state = self.state.write().await;
        let entry = state.connections.get_mut(&conn_id)?;
        let previous = entry.session_id.replace(session_id.to_string());

        state
            .sessions
            .entry(session_id.to_string())
            .or_default()
            .insert(conn_id);

        match previous {
            Some(prev) if prev != session_id => {
                let was_last = state.unbind(conn_id, &prev);
                Some(Departure {
                    session_id: prev,
                    was_last,
                })
            }
            _ => None,
        }
    }

    /// The session a connection has joined, if any.
    pub async fn session_of(&self, conn_id: ConnectionId) -> Option<String> {
        self.state
            .read()
            .await
            .connections
            .get(&conn_id)
            .and_then(|entry| entry.session_id.clone())
    }

    /// Forgets a connection.
    pub async fn disconnect(&self, conn_id: ConnectionId) -> Option<Departure> {
        let mut state = self.state.write().await;
        let entry = state.connections.remove(&conn_id)?;
        tracing::debug!("[ConnectionRegistry] Disconnected {}", conn_id);
        let session_id = entry.session_id?;
        let was_last = state.unbind(conn_id, &session_id);
        Some(Departure {
            session_id,
            was_last,
        })
    }

    pub async fn connection_count(&self, session_id: &str) -> usize {
        self.state
            .read()
            .await
            .sessions
            .get(session_id)
            .map_or(0, HashSet::len)
    }

    /// Sends to one connection. Returns false if it is gone.
    pub async fn send_to(&self, conn_id: ConnectionId, event: OutboundEvent) -> bool {
        let state = self.state.read().await;
        match state.connections.get(&conn_id) {
            Some(entry) => entry.sender.send(event).is_ok(),
            None => false,
        }
    }

    /// Sends to every connection of a session. Returns the number reached.
    pub async fn broadcast(&self, session_id: &str, event: OutboundEvent) -> usize {
        let state = self.state.read().await;
        let Some(members) = state.sessions.get(session_id) else {
            return 0;
        };
        members
            .iter()
            .filter_map(|conn_id| state.connections.get(conn_id))
            .filter(|entry| entry.sender.send(event.clone()).is_ok())
            .count()
    }
}

#[async_trait]
impl EventSink for ConnectionRegistry {
    async fn deliver(&self, session_id: &str, event: OutboundEvent) {
        let reached = self.broadcast(session_id, event).await;
        if reached == 0 {
            tracing::debug!(
                "[ConnectionRegistry] No connection left for session {}",
                session_id
            );
        }
    }
}
