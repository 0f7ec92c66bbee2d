use thiserror::Error;

/// Lifecycle phases of a trivia session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Lobby is open; participants join and the host configures the match.
    Waiting,
    /// Questions are being provisioned before a match starts.
    Voting,
    /// Timed rounds are being played.
    Running,
    /// The session has been torn down; nothing may mutate it anymore.
    Ended,
}

impl SessionPhase {
    /// Wire name of the phase.
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionPhase::Waiting => "waiting",
            SessionPhase::Voting => "voting",
            SessionPhase::Running => "running",
            SessionPhase::Ended => "ended",
        }
    }
}

/// Events that can be applied to the session state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Host asked for a match; questions get provisioned.
    StartVoting,
    /// Provisioning produced no usable question.
    VotingFailed,
    /// Rounds begin.
    StartMatch,
    /// Every round has been played.
    MatchFinished,
    /// Host left or the session was removed.
    Close,
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the state machine was in when the invalid event was received.
    pub from: SessionPhase,
    /// The event that cannot be applied from this phase.
    pub event: SessionEvent,
}

/// State machine guarding the session lifecycle.
#[derive(Debug, Clone)]
pub struct SessionStateMachine {
    phase: SessionPhase,
}

impl Default for SessionStateMachine {
    fn default() -> Self {
        Self {
            phase: SessionPhase::Waiting,
        }
    }
}

impl SessionStateMachine {
    /// Create a new state machine initialised in the waiting phase.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inspect the current phase.
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Apply `event`, returning the new phase or leaving the machine untouched on error.
    pub fn apply(&mut self, event: SessionEvent) -> Result<SessionPhase, InvalidTransition> {
        let next = self.compute_transition(event)?;
        self.phase = next;
        Ok(next)
    }

    fn compute_transition(&self, event: SessionEvent) -> Result<SessionPhase, InvalidTransition> {
        let next = match (self.phase, event) {
            (SessionPhase::Waiting, SessionEvent::StartVoting) => SessionPhase::Voting,
            (SessionPhase::Voting, SessionEvent::VotingFailed) => SessionPhase::Waiting,
            (SessionPhase::Waiting | SessionPhase::Voting, SessionEvent::StartMatch) => {
                SessionPhase::Running
            }
            (SessionPhase::Running, SessionEvent::MatchFinished) => SessionPhase::Waiting,
            (from, SessionEvent::Close) if from != SessionPhase::Ended => SessionPhase::Ended,
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }
}
