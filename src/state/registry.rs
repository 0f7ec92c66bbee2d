use std::sync::Arc;

use dashmap::{DashMap, mapref::entry::Entry};
use rand::Rng;
use tokio::{
    sync::{Mutex, MutexGuard},
    task::JoinHandle,
};

use crate::state::{
    session::{ConnectionId, Session, SessionId},
    settings::Settings,
};

/// Characters used for session ids (no easily confused glyphs such as `0`/`O`).
const SESSION_ID_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Random draws tried at one id length before switching to longer ids.
pub const ID_ATTEMPTS_PER_LENGTH: usize = 64;

/// Shared handle on a live session.
pub type SharedSession = Arc<SessionHandle>;

/// A session together with the locks coordinating its concurrent users.
pub struct SessionHandle {
    id: SessionId,
    owner: ConnectionId,
    inner: Mutex<Session>,
    provisioning: Mutex<()>,
    round_loop: Mutex<Option<JoinHandle<()>>>,
}

impl SessionHandle {
    fn new(session: Session) -> Self {
        Self {
            id: session.id.clone(),
            owner: session.owner.clone(),
            inner: Mutex::new(session),
            provisioning: Mutex::new(()),
            round_loop: Mutex::new(None),
        }
    }

    /// Session identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Host connection identifier.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Acquire the session lock; every mutation of the session goes through it.
    pub async fn lock(&self) -> MutexGuard<'_, Session> {
        self.inner.lock().await
    }

    /// Gate serialising question provisioning runs for this session.
    pub fn provisioning_gate(&self) -> &Mutex<()> {
        &self.provisioning
    }

    /// Remember the task running the rounds of the current match.
    pub async fn track_round_loop(&self, handle: JoinHandle<()>) {
        let mut slot = self.round_loop.lock().await;
        *slot = Some(handle);
    }

    /// Take the round loop handle, e.g. to await its termination.
    pub async fn take_round_loop(&self) -> Option<JoinHandle<()>> {
        self.round_loop.lock().await.take()
    }
}

/// Concurrent store of every live session.
pub struct SessionRegistry {
    sessions: DashMap<SessionId, SharedSession>,
    connections: DashMap<ConnectionId, SessionId>,
    id_length: usize,
}

impl SessionRegistry {
    /// Build an empty registry producing ids of `id_length` characters.
    pub fn new(id_length: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            connections: DashMap::new(),
            id_length: id_length.max(1),
        }
    }

    /// Create and register a session hosted by `owner`, under an id unused by any live session.
    ///
    /// Returns `None` when `owner` already belongs to a session. Ids grow by one
    /// character whenever [`ID_ATTEMPTS_PER_LENGTH`] draws in a row collide.
    pub fn create(&self, owner: &str, host_name: &str, settings: Settings) -> Option<SharedSession> {
        let Entry::Vacant(binding) = self.connections.entry(owner.to_string()) else {
            return None;
        };

        let mut length = self.id_length;
        loop {
            for _ in 0..ID_ATTEMPTS_PER_LENGTH {
                let id = generate_session_id(length);
                if let Entry::Vacant(slot) = self.sessions.entry(id.clone()) {
                    let session =
                        Session::new(id.clone(), owner.to_string(), host_name.to_string(), settings);
                    let handle = Arc::new(SessionHandle::new(session));
                    slot.insert(handle.clone());
                    binding.insert(id);
                    return Some(handle);
                }
            }
            length += 1;
        }
    }

    /// Look a session up by id.
    pub fn get(&self, id: &str) -> Option<SharedSession> {
        self.sessions.get(id).map(|entry| entry.value().clone())
    }

    /// Remove a session and every connection bound to it; unknown ids are ignored.
    pub fn remove(&self, id: &str) -> Option<SharedSession> {
        let removed = self.sessions.remove(id).map(|(_, session)| session);
        if removed.is_some() {
            self.connections.retain(|_, session_id| session_id != id);
        }
        removed
    }

    /// Record that `connection_id` joined `session_id`; fails when it already belongs to a session.
    pub fn bind_connection(&self, connection_id: &str, session_id: &str) -> bool {
        match self.connections.entry(connection_id.to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(session_id.to_string());
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    /// Forget which session `connection_id` belongs to.
    pub fn unbind_connection(&self, connection_id: &str) {
        self.connections.remove(connection_id);
    }

    /// Find the session `connection_id` hosts or participates in.
    pub fn find_by_connection(&self, connection_id: &str) -> Option<SharedSession> {
        let session_id = self.connections.get(connection_id)?.value().clone();
        self.get(&session_id)
    }

    /// Snapshot of the live sessions.
    pub fn list_all(&self) -> Vec<SharedSession> {
        self.sessions
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no session is live.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

fn generate_session_id(length: usize) -> SessionId {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| {
            let index = rng.random_range(0..SESSION_ID_ALPHABET.len());
            char::from(SESSION_ID_ALPHABET[index])
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn settings() -> Settings {
        Settings {
            question_count: 3,
            timer_secs: 10,
            topic: "general".into(),
        }
    }

    #[tokio::test]
    async fn create_registers_host_as_participant() {
        let registry = SessionRegistry::new(6);
        let session = registry.create("conn-host", "Host", settings()).unwrap();

        assert_eq!(session.id().len(), 6);
        assert_eq!(session.owner(), "conn-host");
        let guard = session.lock().await;
        assert_eq!(guard.participants.len(), 1);
        assert!(guard.has_connection("conn-host"));
    }

    #[test]
    fn a_host_cannot_open_two_sessions() {
        let registry = SessionRegistry::new(6);
        assert!(registry.create("conn-host", "Host", settings()).is_some());
        assert!(registry.create("conn-host", "Host", settings()).is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn exhausted_id_space_switches_to_longer_ids() {
        let registry = SessionRegistry::new(1);
        let total = SESSION_ID_ALPHABET.len() + 1;
        let ids: HashSet<_> = (0..total)
            .map(|i| {
                registry
                    .create(&format!("host-{i}"), "Host", settings())
                    .unwrap()
                    .id()
                    .to_string()
            })
            .collect();

        assert_eq!(ids.len(), total);
        assert_eq!(registry.len(), total);
        assert!(ids.iter().any(|id| id.len() > 1));
    }

    #[test]
    fn remove_is_a_no_op_for_unknown_ids() {
        let registry = SessionRegistry::new(6);
        let session = registry.create("conn-host", "Host", settings()).unwrap();

        assert!(registry.remove("nope").is_none());
        assert!(registry.remove(session.id()).is_some());
        assert!(registry.remove(session.id()).is_none());
        assert!(registry.get(session.id()).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn removing_a_session_releases_its_connections() {
        let registry = SessionRegistry::new(6);
        let session = registry.create("conn-host", "Host", settings()).unwrap();
        assert!(registry.bind_connection("guest", session.id()));

        registry.remove(session.id());

        assert!(registry.find_by_connection("guest").is_none());
        assert!(registry.find_by_connection("conn-host").is_none());
        assert!(registry.create("conn-host", "Host", settings()).is_some());
    }

    #[tokio::test]
    async fn find_by_connection_uses_the_connection_index() {
        let registry = SessionRegistry::new(6);
        let first = registry.create("host-1", "Host", settings()).unwrap();
        let second = registry.create("host-2", "Host", settings()).unwrap();
        assert!(registry.bind_connection("guest", first.id()));
        assert!(!registry.bind_connection("guest", second.id()));

        // a busy unrelated session does not hold up the lookup
        let _busy = second.lock().await;
        let found = registry.find_by_connection("guest").unwrap();
        assert_eq!(found.id(), first.id());
        let found = registry.find_by_connection("host-2").unwrap();
        assert_eq!(found.id(), second.id());
        assert!(registry.find_by_connection("stranger").is_none());

        registry.unbind_connection("guest");
        assert!(registry.find_by_connection("guest").is_none());
    }
}
