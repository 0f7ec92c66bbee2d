use std::collections::HashSet;

use axum::extract::ws::Message;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::state::{
    notifier::{Notification, Notifier},
    session::{ConnectionId, SessionId},
};

/// Registry of open WebSocket connections and of the session groups they belong to.
#[derive(Default)]
pub struct ConnectionHub {
    senders: DashMap<ConnectionId, mpsc::UnboundedSender<Message>>,
    groups: DashMap<SessionId, HashSet<ConnectionId>>,
}

impl ConnectionHub {
    /// Build an empty hub.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the outbound channel of a freshly opened connection.
    pub fn register(&self, connection_id: &str, tx: mpsc::UnboundedSender<Message>) {
        self.senders.insert(connection_id.to_string(), tx);
    }

    /// Forget a connection and drop it from every group.
    pub fn unregister(&self, connection_id: &str) {
        self.senders.remove(connection_id);
        self.groups.iter_mut().for_each(|mut members| {
            members.remove(connection_id);
        });
        self.groups.retain(|_, members| !members.is_empty());
    }

    /// Number of open connections.
    pub fn connection_count(&self) -> usize {
        self.senders.len()
    }

    fn send(&self, connection_id: &str, payload: &str) {
        let Some(tx) = self.senders.get(connection_id).map(|entry| entry.clone()) else {
            debug!(connection_id, "dropping notification for unknown connection");
            return;
        };

        if tx.send(Message::Text(payload.to_owned().into())).is_err() {
            warn!(connection_id, "writer closed; removing connection");
            self.senders.remove(connection_id);
        }
    }
}

impl Notifier for ConnectionHub {
    fn notify_one(&self, connection_id: &str, notification: Notification) {
        match serde_json::to_string(&notification) {
            Ok(payload) => self.send(connection_id, &payload),
            Err(err) => warn!(event = %notification.event, error = %err, "failed to serialize notification"),
        }
    }

    fn notify_group(&self, session_id: &str, notification: Notification) {
        let members: Vec<ConnectionId> = match self.groups.get(session_id) {
            Some(members) => members.iter().cloned().collect(),
            None => return,
        };

        match serde_json::to_string(&notification) {
            Ok(payload) => members.iter().for_each(|member| self.send(member, &payload)),
            Err(err) => warn!(event = %notification.event, error = %err, "failed to serialize notification"),
        }
    }

    fn add_to_group(&self, connection_id: &str, session_id: &str) {
        self.groups
            .entry(session_id.to_string())
            .or_default()
            .insert(connection_id.to_string());
    }

    fn remove_from_group(&self, connection_id: &str, session_id: &str) {
        if let Some(mut members) = self.groups.get_mut(session_id) {
            members.remove(connection_id);
        }
        self.groups.remove_if(session_id, |_, members| members.is_empty());
    }

    fn drop_group(&self, session_id: &str) {
        self.groups.remove(session_id);
    }
}
