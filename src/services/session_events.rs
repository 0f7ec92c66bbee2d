//! Notification names and payload delivery for session and match events.

use serde::Serialize;
use tracing::warn;

use crate::{
    dto::{
        events::{
            AnswerAcceptedEvent, ErrorEvent, KickedEvent, MatchEndEndedEvent, MatchEndStartedEvent,
            MatchStartFailedEvent, MatchStartedEvent, QuestionEvent, RoundEndedEvent,
            SessionClosedEvent, SettingsUpdatedEvent, VotingEndedEvent, VotingStartedEvent,
        },
        session::{ParticipantResult, SessionSnapshot},
    },
    error::ServiceError,
    state::{
        Notification, SharedState,
        question::{Question, Scored},
    },
};

pub(crate) const EVENT_ERROR: &str = "error";
pub(crate) const EVENT_SESSION_JOINED: &str = "session.joined";
pub(crate) const EVENT_PARTICIPANTS_UPDATED: &str = "session.participants";
pub(crate) const EVENT_SETTINGS_UPDATED: &str = "session.settings";
pub(crate) const EVENT_KICKED: &str = "session.kicked";
pub(crate) const EVENT_SESSION_CLOSED: &str = "session.closed";
pub(crate) const EVENT_VOTING_STARTED: &str = "voting.started";
pub(crate) const EVENT_VOTING_ENDED: &str = "voting.ended";
pub(crate) const EVENT_MATCH_START_FAILED: &str = "match.start_failed";
pub(crate) const EVENT_MATCH_STARTED: &str = "match.started";
pub(crate) const EVENT_QUESTION: &str = "round.question";
pub(crate) const EVENT_ROUND_ENDED: &str = "round.ended";
pub(crate) const EVENT_ANSWER_ACCEPTED: &str = "answer.accepted";
pub(crate) const EVENT_MATCH_END_STARTED: &str = "match.end_started";
pub(crate) const EVENT_MATCH_END_ENDED: &str = "match.end_ended";

/// Report a failed request to the connection that issued it.
pub fn send_error(state: &SharedState, connection_id: &str, err: &ServiceError) {
    let payload = ErrorEvent {
        kind: err.kind().to_string(),
        message: err.to_string(),
    };
    send_one(state, connection_id, EVENT_ERROR, &payload);
}

/// Send the session view to a connection that just created or joined it.
pub fn send_session_joined(state: &SharedState, connection_id: &str, snapshot: &SessionSnapshot) {
    send_one(state, connection_id, EVENT_SESSION_JOINED, snapshot);
}

/// Broadcast the membership after a join, leave or kick.
pub fn broadcast_participants(state: &SharedState, snapshot: &SessionSnapshot) {
    send_group(state, &snapshot.session_id, EVENT_PARTICIPANTS_UPDATED, snapshot);
}

/// Broadcast new settings.
pub fn broadcast_settings_updated(
    state: &SharedState,
    session_id: &str,
    payload: &SettingsUpdatedEvent,
) {
    send_group(state, session_id, EVENT_SETTINGS_UPDATED, payload);
}

/// Tell a participant the host removed it.
pub fn send_kicked(state: &SharedState, connection_id: &str, session_id: &str) {
    let payload = KickedEvent {
        session_id: session_id.to_string(),
    };
    send_one(state, connection_id, EVENT_KICKED, &payload);
}

/// Broadcast that the session is gone.
pub fn broadcast_session_closed(state: &SharedState, session_id: &str, reason: &str) {
    let payload = SessionClosedEvent {
        session_id: session_id.to_string(),
        reason: reason.to_string(),
    };
    send_group(state, session_id, EVENT_SESSION_CLOSED, &payload);
}

/// Broadcast the start of question provisioning.
pub fn broadcast_voting_started(state: &SharedState, session_id: &str, topic: &str) {
    let payload = VotingStartedEvent {
        topic: topic.to_string(),
    };
    send_group(state, session_id, EVENT_VOTING_STARTED, &payload);
}

/// Broadcast the end of question provisioning.
pub fn broadcast_voting_ended(state: &SharedState, session_id: &str, questions: usize) {
    send_group(
        state,
        session_id,
        EVENT_VOTING_ENDED,
        &VotingEndedEvent { questions },
    );
}

/// Broadcast that no match could be started.
pub fn broadcast_match_start_failed(state: &SharedState, session_id: &str, reason: &str) {
    let payload = MatchStartFailedEvent {
        reason: reason.to_string(),
    };
    send_group(state, session_id, EVENT_MATCH_START_FAILED, &payload);
}

/// Broadcast the start of the rounds.
pub fn broadcast_match_started(state: &SharedState, session_id: &str, rounds: usize, timer_secs: u32) {
    send_group(
        state,
        session_id,
        EVENT_MATCH_STARTED,
        &MatchStartedEvent { rounds, timer_secs },
    );
}

/// Broadcast the question of a new round.
pub fn broadcast_question(
    state: &SharedState,
    session_id: &str,
    round: usize,
    total_rounds: usize,
    question: &Question,
) {
    let payload = QuestionEvent::new(round, total_rounds, question);
    send_group(state, session_id, EVENT_QUESTION, &payload);
}

/// Broadcast the end of a round together with its answer.
pub fn broadcast_round_ended(state: &SharedState, session_id: &str, round: usize, question: &Question) {
    let payload = RoundEndedEvent {
        round,
        correct_answer: question.correct_answer(),
    };
    send_group(state, session_id, EVENT_ROUND_ENDED, &payload);
}

/// Confirm a recorded answer to its submitter.
pub fn send_answer_accepted(state: &SharedState, connection_id: &str, round: usize, score: Scored) {
    let payload = AnswerAcceptedEvent {
        round,
        points: score.points,
        correct: score.correct,
    };
    send_one(state, connection_id, EVENT_ANSWER_ACCEPTED, &payload);
}

/// Broadcast final standings.
pub fn broadcast_match_end_started(
    state: &SharedState,
    session_id: &str,
    display_secs: u64,
    results: Vec<ParticipantResult>,
) {
    let payload = MatchEndStartedEvent {
        display_secs,
        results,
    };
    send_group(state, session_id, EVENT_MATCH_END_STARTED, &payload);
}

/// Broadcast the end of the results display.
pub fn broadcast_match_end_ended(state: &SharedState, session_id: &str) {
    send_group(state, session_id, EVENT_MATCH_END_ENDED, &MatchEndEndedEvent {});
}

fn send_one(state: &SharedState, connection_id: &str, event: &str, payload: &impl Serialize) {
    match Notification::json(event, payload) {
        Ok(notification) => state.notifier().notify_one(connection_id, notification),
        Err(err) => warn!(event, error = %err, "failed to serialize notification payload"),
    }
}

fn send_group(state: &SharedState, session_id: &str, event: &str, payload: &impl Serialize) {
    match Notification::json(event, payload) {
        Ok(notification) => state.notifier().notify_group(session_id, notification),
        Err(err) => warn!(event, error = %err, "failed to serialize notification payload"),
    }
}
