use std::time::SystemTime;

use indexmap::IndexMap;

use crate::state::{
    match_state::Match,
    settings::Settings,
    state_machine::{SessionPhase, SessionStateMachine},
};

/// Identifier of a live transport connection.
pub type ConnectionId = String;
/// Short identifier of a session shared with participants.
pub type SessionId = String;

/// Points awarded to a participant for one round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreEntry {
    /// Round the answer belongs to.
    pub round: usize,
    /// Points awarded.
    pub points: u32,
    /// Whether the answer was fully correct.
    pub correct: bool,
}

/// Member of a session.
#[derive(Debug, Clone)]
pub struct Participant {
    /// Connection the participant plays from.
    pub connection_id: ConnectionId,
    /// Display name, unique (case-sensitive) within the session.
    pub name: String,
    /// One entry per answered round.
    pub scores: Vec<ScoreEntry>,
    /// Whether an answer was accepted for the current round.
    pub has_answered: bool,
}

impl Participant {
    fn new(connection_id: ConnectionId, name: String) -> Self {
        Self {
            connection_id,
            name,
            scores: Vec::new(),
            has_answered: false,
        }
    }

    /// Sum of every score entry.
    pub fn total_points(&self) -> u64 {
        self.scores.iter().map(|entry| u64::from(entry.points)).sum()
    }
}

/// One trivia session: its host, members, settings and match.
#[derive(Debug)]
pub struct Session {
    /// Session identifier.
    pub id: SessionId,
    /// Connection of the host; never changes for the session lifetime.
    pub owner: ConnectionId,
    /// Host configuration.
    pub settings: Settings,
    /// Participants keyed by connection, in join order.
    pub participants: IndexMap<ConnectionId, Participant>,
    /// Match state, created by the first provisioning.
    pub current_match: Option<Match>,
    /// Bumped whenever a match starts or the session closes; round loops carrying an
    /// older value stop.
    pub generation: u64,
    /// Whether final standings are on display and still await their closing event.
    pub showing_results: bool,
    /// Creation timestamp.
    pub created_at: SystemTime,
    lifecycle: SessionStateMachine,
}

impl Session {
    /// Create a session whose host is already registered as a participant.
    pub fn new(id: SessionId, owner: ConnectionId, host_name: String, settings: Settings) -> Self {
        let mut participants = IndexMap::new();
        participants.insert(owner.clone(), Participant::new(owner.clone(), host_name));

        Self {
            id,
            owner,
            settings,
            participants,
            current_match: None,
            generation: 0,
            showing_results: false,
            created_at: SystemTime::now(),
            lifecycle: SessionStateMachine::new(),
        }
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> SessionPhase {
        self.lifecycle.phase()
    }

    /// Lifecycle state machine, for applying transitions.
    pub fn lifecycle_mut(&mut self) -> &mut SessionStateMachine {
        &mut self.lifecycle
    }

    /// Whether `connection_id` belongs to the host.
    pub fn is_host(&self, connection_id: &str) -> bool {
        self.owner == connection_id
    }

    /// Whether `connection_id` is a member of this session.
    pub fn has_connection(&self, connection_id: &str) -> bool {
        self.participants.contains_key(connection_id)
    }

    /// Add a participant unless the connection or the name is already taken.
    pub fn add_participant(&mut self, connection_id: &str, name: &str) -> bool {
        if self.participants.contains_key(connection_id)
            || self.participants.values().any(|p| p.name == name)
        {
            return false;
        }

        self.participants.insert(
            connection_id.to_string(),
            Participant::new(connection_id.to_string(), name.to_string()),
        );
        true
    }

    /// Remove a non-host participant, returning it when it was present.
    pub fn remove_participant(&mut self, connection_id: &str) -> Option<Participant> {
        if self.is_host(connection_id) {
            return None;
        }
        self.participants.shift_remove(connection_id)
    }

    /// Replace the settings wholesale.
    pub fn update_settings(&mut self, settings: Settings) {
        self.settings = settings;
    }

    /// Participant playing from `connection_id`.
    pub fn participant(&self, connection_id: &str) -> Option<&Participant> {
        self.participants.get(connection_id)
    }

    /// Mutable participant playing from `connection_id`.
    pub fn participant_mut(&mut self, connection_id: &str) -> Option<&mut Participant> {
        self.participants.get_mut(connection_id)
    }

    /// Clear the per-round answered flags.
    pub fn clear_answer_flags(&mut self) {
        for participant in self.participants.values_mut() {
            participant.has_answered = false;
        }
    }

    /// Clear answered flags and score history before a new match.
    pub fn reset_scores(&mut self) {
        for participant in self.participants.values_mut() {
            participant.has_answered = false;
            participant.scores.clear();
        }
    }

    /// Whether a round loop tagged with `generation` may still act on this session.
    pub fn accepts_generation(&self, generation: u64) -> bool {
        self.generation == generation && self.phase() != SessionPhase::Ended
    }
}
