use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    dto::{format_system_time, validation::validate_display_name},
    state::{
        session::{Participant, ScoreEntry, Session},
        settings::{RawSettings, Settings},
    },
};

/// Name used for hosts that do not pick one.
pub const DEFAULT_HOST_NAME: &str = "Host";

#[derive(Debug, Default, Deserialize, Serialize, Validate)]
/// Payload of a session creation request.
pub struct CreateSessionInput {
    /// Display name of the host; defaults to [`DEFAULT_HOST_NAME`].
    #[serde(default)]
    #[validate(length(min = 1, max = 32), custom(function = "validate_display_name"))]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Validate)]
/// Payload of a join request.
pub struct JoinSessionInput {
    /// Identifier of the session to join.
    #[validate(length(min = 1, max = 16))]
    pub session_id: String,
    /// Display name, unique within the session.
    #[validate(length(min = 1, max = 32), custom(function = "validate_display_name"))]
    pub name: String,
}

#[derive(Debug, Deserialize, Serialize, Validate)]
/// Settings requested by a host; lower bounds are clamped rather than rejected.
pub struct SettingsInput {
    /// Number of rounds.
    #[validate(range(max = 100))]
    pub question_count: i64,
    /// Seconds per round.
    #[validate(range(max = 300))]
    pub timer_secs: i64,
    /// Question topic.
    #[validate(length(max = 64))]
    pub topic: String,
}

impl From<SettingsInput> for RawSettings {
    fn from(value: SettingsInput) -> Self {
        Self {
            question_count: value.question_count,
            timer_secs: value.timer_secs,
            topic: value.topic,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
/// Public view of a participant.
pub struct ParticipantSummary {
    /// Display name.
    pub name: String,
    /// Whether this participant hosts the session.
    pub is_host: bool,
    /// Points accumulated in the current or last match.
    pub total_points: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
/// Public view of a session, sent on join and on membership changes.
pub struct SessionSnapshot {
    /// Session identifier.
    pub session_id: String,
    /// Current lifecycle phase.
    pub phase: String,
    /// Current settings.
    pub settings: Settings,
    /// Participants in join order.
    pub participants: Vec<ParticipantSummary>,
}

impl From<&Session> for SessionSnapshot {
    fn from(session: &Session) -> Self {
        Self {
            session_id: session.id.clone(),
            phase: session.phase().as_str().to_string(),
            settings: session.settings.clone(),
            participants: session
                .participants
                .values()
                .map(|participant| ParticipantSummary {
                    name: participant.name.clone(),
                    is_host: session.is_host(&participant.connection_id),
                    total_points: participant.total_points(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
/// Row of the session listing.
pub struct SessionListItem {
    /// Session identifier.
    pub session_id: String,
    /// Display name of the host.
    pub host: String,
    /// Current lifecycle phase.
    pub phase: String,
    /// Topic selected by the host.
    pub topic: String,
    /// Number of participants, host included.
    pub participant_count: usize,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
}

impl From<&Session> for SessionListItem {
    fn from(session: &Session) -> Self {
        Self {
            session_id: session.id.clone(),
            host: session
                .participant(&session.owner)
                .map(|host| host.name.clone())
                .unwrap_or_default(),
            phase: session.phase().as_str().to_string(),
            topic: session.settings.topic.clone(),
            participant_count: session.participants.len(),
            created_at: format_system_time(session.created_at),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
/// Score obtained for one round.
pub struct ScoreEntrySummary {
    /// Round index.
    pub round: usize,
    /// Points awarded.
    pub points: u32,
    /// Whether the answer was fully correct.
    pub correct: bool,
}

impl From<&ScoreEntry> for ScoreEntrySummary {
    fn from(entry: &ScoreEntry) -> Self {
        Self {
            round: entry.round,
            points: entry.points,
            correct: entry.correct,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
/// Final standing of a participant.
pub struct ParticipantResult {
    /// Display name.
    pub name: String,
    /// Sum of the round scores.
    pub total_points: u64,
    /// Per-round scores in answer order.
    pub entries: Vec<ScoreEntrySummary>,
}

impl From<&Participant> for ParticipantResult {
    fn from(participant: &Participant) -> Self {
        Self {
            name: participant.name.clone(),
            total_points: participant.total_points(),
            entries: participant.scores.iter().map(Into::into).collect(),
        }
    }
}
