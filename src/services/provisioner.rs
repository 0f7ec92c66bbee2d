//! Reconciles a session's question set with its settings.
//!
//! Runs are serialised per session through the provisioning gate, and the
//! session lock is released while the content source is queried so that joins,
//! kicks and answers stay serviceable during a slow fetch.

use tracing::{debug, info, warn};

use crate::{
    error::ServiceError,
    state::{
        SharedSession, SharedState, match_state::Match, settings::topic_key,
        state_machine::SessionPhase,
    },
};

/// What a provisioning run achieved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProvisionOutcome {
    /// Questions requested by the settings.
    pub requested: usize,
    /// Questions available after provisioning.
    pub available: usize,
}

impl ProvisionOutcome {
    /// Whether at least one round can be played.
    pub fn is_playable(&self) -> bool {
        self.available > 0
    }
}

/// Make the session's match hold exactly `question_count` questions timed with `timer_secs`.
///
/// Surplus questions are truncated, the shortfall is fetched from the content
/// source (a failed fetch leaves the set short), every question is re-timed and
/// the final set is saved back to the cache. A session without a match first
/// reuses the cached set of its topic, as does a session whose topic changed.
pub async fn provision(
    state: &SharedState,
    session: &SharedSession,
) -> Result<ProvisionOutcome, ServiceError> {
    let _gate = session.provisioning_gate().lock().await;

    let (settings, existing) = {
        let guard = session.lock().await;
        ensure_provisionable(guard.phase(), session.id())?;
        let topic = topic_key(&guard.settings.topic);
        let existing = guard
            .current_match
            .as_ref()
            .filter(|game| game.topic == topic)
            .map(Match::question_count);
        (guard.settings.clone(), existing)
    };

    let topic = settings.topic_key();
    let desired = settings.question_count as usize;

    let seed = match existing {
        Some(_) => None,
        None => {
            let cached = state.content().get_cached(&settings.topic).await;
            debug!(session_id = %session.id(), topic = %topic, cached = cached.len(), "seeding match from cache");
            Some(cached)
        }
    };

    let have = existing
        .or_else(|| seed.as_ref().map(Vec::len))
        .unwrap_or(0);
    let mut fetched = Vec::new();
    if have < desired {
        let missing = desired - have;
        match state
            .content()
            .fetch_questions(&settings.topic, missing)
            .await
        {
            Ok(questions) => {
                info!(
                    session_id = %session.id(),
                    topic = %topic,
                    requested = missing,
                    received = questions.len(),
                    "fetched additional questions"
                );
                fetched = questions;
            }
            Err(err) => warn!(
                session_id = %session.id(),
                topic = %topic,
                requested = missing,
                error = %err,
                "question fetch failed; continuing with a short set"
            ),
        }
    }

    let finalized = {
        let mut guard = session.lock().await;
        ensure_provisionable(guard.phase(), session.id())?;

        let game = match (&mut guard.current_match, seed) {
            (Some(game), None) => game,
            (slot, seed) => slot.insert(Match::new(topic.clone(), seed.unwrap_or_default())),
        };
        game.truncate(desired);
        let room = desired.saturating_sub(game.question_count());
        game.questions.extend(fetched.into_iter().take(room));
        game.retime(settings.timer_secs);
        game.questions.clone()
    };

    let outcome = ProvisionOutcome {
        requested: desired,
        available: finalized.len(),
    };

    if let Err(err) = state.content().save_cached(&settings.topic, finalized).await {
        warn!(session_id = %session.id(), topic = %topic, error = %err, "failed to cache question set");
    }

    debug!(session_id = %session.id(), ?outcome, "provisioning finished");
    Ok(outcome)
}

/// Questions may only change before a match starts; a run queued behind a match start stops here.
fn ensure_provisionable(phase: SessionPhase, session_id: &str) -> Result<(), ServiceError> {
    match phase {
        SessionPhase::Waiting | SessionPhase::Voting => Ok(()),
        SessionPhase::Running => Err(ServiceError::InvalidState(
            "questions are locked while a match is running".into(),
        )),
        SessionPhase::Ended => Err(ServiceError::NotFound(format!(
            "session `{session_id}` is closed"
        ))),
    }
}
