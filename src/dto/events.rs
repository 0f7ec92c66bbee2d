use serde::Serialize;
use serde_json::Value;
use serde_with::skip_serializing_none;

use crate::{
    dto::session::ParticipantResult,
    state::{question::Question, settings::Settings},
};

#[derive(Debug, Serialize)]
/// Sent to the acting connection when one of its requests fails.
pub struct ErrorEvent {
    /// Stable error category (`not_found`, `conflict`, ...).
    pub kind: String,
    /// Human-readable description.
    pub message: String,
}

#[derive(Debug, Serialize)]
/// Broadcast after the host changed the settings.
pub struct SettingsUpdatedEvent {
    /// New settings.
    pub settings: Settings,
    /// Questions currently provisioned for the next match.
    pub available_questions: usize,
}

#[derive(Debug, Serialize)]
/// Broadcast when question provisioning starts.
pub struct VotingStartedEvent {
    /// Topic being provisioned.
    pub topic: String,
}

#[derive(Debug, Serialize)]
/// Broadcast when question provisioning completes.
pub struct VotingEndedEvent {
    /// Questions ready to be played.
    pub questions: usize,
}

#[derive(Debug, Serialize)]
/// Broadcast when no match could start.
pub struct MatchStartFailedEvent {
    /// Why the match could not start.
    pub reason: String,
}

#[derive(Debug, Serialize)]
/// Broadcast when the rounds begin.
pub struct MatchStartedEvent {
    /// Number of rounds planned.
    pub rounds: usize,
    /// Seconds per round.
    pub timer_secs: u32,
}

#[skip_serializing_none]
#[derive(Debug, Serialize)]
/// Question broadcast at the start of a round; never carries the answer.
pub struct QuestionEvent {
    /// Zero-based round index.
    pub round: usize,
    /// Number of rounds in the match.
    pub total_rounds: usize,
    /// Question kind (`single_choice`, `multi_choice`, `boolean`).
    pub kind: String,
    /// Question text.
    pub prompt: String,
    /// Options, absent for boolean questions.
    pub choices: Option<Vec<String>>,
    /// Seconds to answer.
    pub time_limit_secs: u32,
    /// Points for a fully correct answer.
    pub points: u32,
}

impl QuestionEvent {
    /// Build the round announcement for `question`.
    pub fn new(round: usize, total_rounds: usize, question: &Question) -> Self {
        let choices = question.choices();
        Self {
            round,
            total_rounds,
            kind: question.kind_name().to_string(),
            prompt: question.prompt.clone(),
            choices: (!choices.is_empty()).then(|| choices.to_vec()),
            time_limit_secs: question.time_limit_secs,
            points: question.points,
        }
    }
}

#[derive(Debug, Serialize)]
/// Broadcast when a round's timer expires.
pub struct RoundEndedEvent {
    /// Round that just ended.
    pub round: usize,
    /// Expected answer, in submission format.
    pub correct_answer: Value,
}

#[derive(Debug, Serialize)]
/// Sent to a participant whose answer was recorded.
pub struct AnswerAcceptedEvent {
    /// Round the answer counts for.
    pub round: usize,
    /// Points awarded.
    pub points: u32,
    /// Whether the answer was fully correct.
    pub correct: bool,
}

#[derive(Debug, Serialize)]
/// Broadcast once every round has been played.
pub struct MatchEndStartedEvent {
    /// Seconds the results stay displayed.
    pub display_secs: u64,
    /// Standings in join order.
    pub results: Vec<ParticipantResult>,
}

#[derive(Debug, Serialize)]
/// Broadcast when the results display is over.
pub struct MatchEndEndedEvent {}

#[derive(Debug, Serialize)]
/// Sent to a participant removed by the host.
pub struct KickedEvent {
    /// Session the participant was removed from.
    pub session_id: String,
}

#[derive(Debug, Serialize)]
/// Broadcast when the host leaves and the session is torn down.
pub struct SessionClosedEvent {
    /// Session that no longer exists.
    pub session_id: String,
    /// Why the session closed.
    pub reason: String,
}
