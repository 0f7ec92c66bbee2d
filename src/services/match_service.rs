//! Drives a match: voting (question provisioning), timed rounds, answers and results.
//!
//! The rounds run on a spawned task tagged with the session generation. The task
//! never sleeps while holding the session lock and re-checks its generation after
//! every wake-up, so a newer match or a closed session silently stops it.

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::{
    dto::session::ParticipantResult,
    error::ServiceError,
    services::{lobby_service, provisioner, session_events},
    state::{
        SharedSession, SharedState,
        match_state::Match,
        session::{ScoreEntry, Session},
        state_machine::{SessionEvent, SessionPhase},
    },
};

/// Host request to start playing: provision questions, then start the match.
///
/// When provisioning yields no question the session goes back to waiting and
/// `match.start_failed` is broadcast instead.
pub async fn start_voting(state: &SharedState, connection_id: &str) -> Result<(), ServiceError> {
    let session = lobby_service::require_hosted_session(state, connection_id)?;

    {
        let mut guard = session.lock().await;
        guard.lifecycle_mut().apply(SessionEvent::StartVoting)?;
        close_results_display(state, &mut guard);
        session_events::broadcast_voting_started(state, session.id(), &guard.settings.topic);
    }
    info!(session_id = %session.id(), "voting started");

    let outcome = match provisioner::provision(state, &session).await {
        Ok(outcome) => outcome,
        Err(err) => {
            abort_voting(state, &session, "question provisioning failed").await;
            return Err(err);
        }
    };

    {
        let guard = session.lock().await;
        if guard.phase() != SessionPhase::Voting {
            debug!(session_id = %session.id(), phase = guard.phase().as_str(), "voting interrupted");
            return Ok(());
        }
        session_events::broadcast_voting_ended(state, session.id(), outcome.available);
    }

    if !outcome.is_playable() {
        abort_voting(state, &session, "no questions available for this topic").await;
        return Ok(());
    }

    start_match(state, &session).await
}

/// Reset scores, rewind to the first round and spawn the round loop.
///
/// Does nothing when a match is already running.
pub async fn start_match(state: &SharedState, session: &SharedSession) -> Result<(), ServiceError> {
    let generation = {
        let mut guard = session.lock().await;
        if guard.phase() == SessionPhase::Running {
            debug!(session_id = %session.id(), "match already running");
            return Ok(());
        }
        guard.lifecycle_mut().apply(SessionEvent::StartMatch)?;

        let topic = guard.settings.topic_key();
        let questions = guard
            .current_match
            .take()
            .map(|game| game.questions)
            .unwrap_or_default();
        let rounds = questions.len();
        guard.current_match = Some(Match::new(topic, questions));
        guard.reset_scores();
        guard.generation += 1;
        close_results_display(state, &mut guard);

        session_events::broadcast_match_started(
            state,
            session.id(),
            rounds,
            guard.settings.timer_secs,
        );
        info!(session_id = %session.id(), rounds, generation = guard.generation, "match started");
        guard.generation
    };

    let handle = tokio::spawn(run_round_loop(state.clone(), session.clone(), generation));
    session.track_round_loop(handle).await;
    Ok(())
}

/// Record the answer of `connection_id` for the current round and confirm it.
///
/// Only the first well-formed answer per round counts; a malformed one may be retried.
pub async fn submit_answer(
    state: &SharedState,
    connection_id: &str,
    raw: Value,
) -> Result<(), ServiceError> {
    let session = state
        .sessions()
        .find_by_connection(connection_id)
        .ok_or_else(|| ServiceError::NotFound("connection is not part of any session".into()))?;

    let (round, scored) = {
        let mut guard = session.lock().await;
        if guard.phase() != SessionPhase::Running {
            return Err(ServiceError::InvalidState("no match is running".into()));
        }

        let (round, scored) = {
            let game = guard
                .current_match
                .as_ref()
                .filter(|game| game.accepting_answers)
                .ok_or_else(|| ServiceError::InvalidState("no round is open".into()))?;
            let question = game
                .current_question()
                .ok_or_else(|| ServiceError::InvalidState("no round is open".into()))?;
            let participant = guard.participant(connection_id).ok_or_else(|| {
                ServiceError::NotFound("participant left the session".into())
            })?;
            if participant.has_answered {
                return Err(ServiceError::Conflict(format!(
                    "answer already recorded for round {}",
                    game.round_index
                )));
            }
            (game.round_index, question.evaluate(&raw)?)
        };

        let participant = guard
            .participant_mut(connection_id)
            .ok_or_else(|| ServiceError::NotFound("participant left the session".into()))?;
        participant.has_answered = true;
        participant.scores.push(ScoreEntry {
            round,
            points: scored.points,
            correct: scored.correct,
        });
        (round, scored)
    };

    debug!(session_id = %session.id(), connection_id, round, points = scored.points, "answer recorded");
    session_events::send_answer_accepted(state, connection_id, round, scored);
    Ok(())
}

/// Send the closing event of results still on display, so it always precedes what comes next.
fn close_results_display(state: &SharedState, session: &mut Session) {
    if std::mem::take(&mut session.showing_results) {
        session_events::broadcast_match_end_ended(state, &session.id);
    }
}

async fn abort_voting(state: &SharedState, session: &SharedSession, reason: &str) {
    let mut guard = session.lock().await;
    if guard.phase() != SessionPhase::Voting {
        return;
    }
    if let Err(err) = guard.lifecycle_mut().apply(SessionEvent::VotingFailed) {
        warn!(session_id = %session.id(), error = %err, "failed to leave voting");
        return;
    }
    session_events::broadcast_match_start_failed(state, session.id(), reason);
    info!(session_id = %session.id(), reason, "match start failed");
}

async fn run_round_loop(state: SharedState, session: SharedSession, generation: u64) {
    loop {
        let round_duration = {
            let mut guard = session.lock().await;
            if !guard.accepts_generation(generation) {
                debug!(session_id = %session.id(), generation, "stale round loop stopped");
                return;
            }
            guard.clear_answer_flags();
            let timer_secs = guard.settings.timer_secs;
            let round_duration = guard.settings.round_duration();

            let Some(game) = guard.current_match.as_mut() else {
                break;
            };
            let round = game.round_index;
            let total = game.question_count();
            let Some(question) = game.current_question_mut() else {
                break;
            };
            question.time_limit_secs = timer_secs;
            let question = question.clone();
            game.accepting_answers = true;

            session_events::broadcast_question(&state, session.id(), round, total, &question);
            debug!(session_id = %session.id(), round, total, "round started");
            round_duration
        };

        tokio::time::sleep(round_duration).await;

        let mut guard = session.lock().await;
        if !guard.accepts_generation(generation) {
            debug!(session_id = %session.id(), generation, "stale round loop stopped");
            return;
        }
        let Some(game) = guard.current_match.as_mut() else {
            break;
        };
        let round = game.round_index;
        if let Some(question) = game.current_question() {
            session_events::broadcast_round_ended(&state, session.id(), round, question);
        }
        game.advance();
    }

    finish_match(&state, &session, generation).await;
}

async fn finish_match(state: &SharedState, session: &SharedSession, generation: u64) {
    let display = state.config().results_display();
    {
        let mut guard = session.lock().await;
        if !guard.accepts_generation(generation) {
            return;
        }
        if let Err(err) = guard.lifecycle_mut().apply(SessionEvent::MatchFinished) {
            warn!(session_id = %session.id(), error = %err, "failed to finish match");
            return;
        }
        let results: Vec<ParticipantResult> = guard.participants.values().map(Into::into).collect();
        guard.showing_results = true;
        session_events::broadcast_match_end_started(state, session.id(), display.as_secs(), results);
        info!(session_id = %session.id(), "match finished");
    }

    tokio::time::sleep(display).await;

    let mut guard = session.lock().await;
    if guard.accepts_generation(generation) {
        close_results_display(state, &mut guard);
    }
}
