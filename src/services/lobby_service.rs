//! Session membership and configuration operations invoked by the transport.
//!
//! Results are delivered through the notification gateway; failures are
//! returned to the caller, which reports them to the acting connection.

use tracing::{debug, info, warn};

use crate::{
    dto::{
        events::SettingsUpdatedEvent,
        session::{
            CreateSessionInput, DEFAULT_HOST_NAME, JoinSessionInput, SessionListItem,
            SessionSnapshot, SettingsInput,
        },
    },
    error::ServiceError,
    services::{provisioner, session_events},
    state::{
        SharedSession, SharedState,
        settings::Settings,
        state_machine::{SessionEvent, SessionPhase},
    },
};

/// Open a session hosted by `connection_id`; the host joins it right away.
pub async fn create_session(
    state: &SharedState,
    connection_id: &str,
    input: CreateSessionInput,
) -> Result<SharedSession, ServiceError> {
    let host_name = input
        .name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_HOST_NAME);
    let session = state
        .sessions()
        .create(
            connection_id,
            host_name,
            state.config().default_settings.clone(),
        )
        .ok_or_else(|| already_attached(state, connection_id))?;
    state.notifier().add_to_group(connection_id, session.id());

    let snapshot = SessionSnapshot::from(&*session.lock().await);
    info!(session_id = %session.id(), connection_id, "session created");
    session_events::send_session_joined(state, connection_id, &snapshot);
    Ok(session)
}

/// Add `connection_id` to an existing session under a unique display name.
pub async fn join_session(
    state: &SharedState,
    connection_id: &str,
    input: JoinSessionInput,
) -> Result<(), ServiceError> {
    let session = require_session(state, input.session_id.trim())?;
    let name = input.name.trim();

    if !state.sessions().bind_connection(connection_id, session.id()) {
        return Err(already_attached(state, connection_id));
    }
    let joined = {
        let mut guard = session.lock().await;
        if guard.phase() == SessionPhase::Ended {
            Err(ServiceError::NotFound(format!(
                "session `{}` not found",
                session.id()
            )))
        } else if !guard.add_participant(connection_id, name) {
            Err(ServiceError::Conflict(format!(
                "name `{name}` already taken in session `{}`",
                session.id()
            )))
        } else {
            state.notifier().add_to_group(connection_id, session.id());
            Ok(SessionSnapshot::from(&*guard))
        }
    };
    let snapshot = match joined {
        Ok(snapshot) => snapshot,
        Err(err) => {
            state.sessions().unbind_connection(connection_id);
            return Err(err);
        }
    };

    info!(session_id = %session.id(), connection_id, name, "participant joined");
    session_events::send_session_joined(state, connection_id, &snapshot);
    session_events::broadcast_participants(state, &snapshot);
    Ok(())
}

/// Replace the settings of the session hosted by `connection_id` and re-provision questions.
///
/// While a match is running the new timer applies to rounds that have not started
/// yet, and re-provisioning is deferred to the next match start. The same holds
/// when the match starts while this update waits for the provisioning gate.
pub async fn update_settings(
    state: &SharedState,
    connection_id: &str,
    input: SettingsInput,
) -> Result<(), ServiceError> {
    let session = require_hosted_session(state, connection_id)?;
    let settings = Settings::sanitize(input.into(), &state.config().default_settings.topic);

    {
        let mut guard = session.lock().await;
        match guard.phase() {
            SessionPhase::Waiting | SessionPhase::Running => {}
            SessionPhase::Voting => {
                return Err(ServiceError::InvalidState(
                    "settings cannot change while questions are being prepared".into(),
                ));
            }
            SessionPhase::Ended => {
                return Err(ServiceError::NotFound(format!(
                    "session `{}` is closed",
                    session.id()
                )));
            }
        }
        guard.update_settings(settings.clone());
    }
    debug!(session_id = %session.id(), ?settings, "settings updated");

    let available_questions = match provisioner::provision(state, &session).await {
        Ok(outcome) => outcome.available,
        Err(ServiceError::InvalidState(reason)) => {
            debug!(session_id = %session.id(), %reason, "provisioning deferred to the next match");
            session
                .lock()
                .await
                .current_match
                .as_ref()
                .map_or(0, |game| game.question_count())
        }
        Err(err) => return Err(err),
    };

    session_events::broadcast_settings_updated(
        state,
        session.id(),
        &SettingsUpdatedEvent {
            settings,
            available_questions,
        },
    );
    Ok(())
}

/// Remove the participant named `target_name` from the session hosted by `connection_id`.
pub async fn kick_participant(
    state: &SharedState,
    connection_id: &str,
    target_name: &str,
) -> Result<(), ServiceError> {
    let session = require_hosted_session(state, connection_id)?;

    let (target, snapshot) = {
        let mut guard = session.lock().await;
        let target = guard
            .participants
            .values()
            .find(|participant| participant.name == target_name)
            .map(|participant| participant.connection_id.clone())
            .ok_or_else(|| {
                ServiceError::NotFound(format!("participant `{target_name}` not found"))
            })?;
        if guard.is_host(&target) {
            return Err(ServiceError::InvalidInput(
                "the host cannot kick itself; leave the session instead".into(),
            ));
        }
        guard.remove_participant(&target);
        state.sessions().unbind_connection(&target);
        state.notifier().remove_from_group(&target, session.id());
        (target, SessionSnapshot::from(&*guard))
    };

    info!(session_id = %session.id(), kicked = %target, "participant kicked");
    session_events::send_kicked(state, &target, session.id());
    session_events::broadcast_participants(state, &snapshot);
    Ok(())
}

/// Explicit leave request; identical to a disconnect.
pub async fn leave_session(state: &SharedState, connection_id: &str) -> Result<(), ServiceError> {
    if handle_disconnect(state, connection_id).await {
        Ok(())
    } else {
        Err(ServiceError::NotFound(
            "connection is not part of any session".into(),
        ))
    }
}

/// Detach `connection_id` from its session, tearing the session down when it is the host.
///
/// Returns whether the connection belonged to a session.
pub async fn handle_disconnect(state: &SharedState, connection_id: &str) -> bool {
    let Some(session) = state.sessions().find_by_connection(connection_id) else {
        return false;
    };

    if session.owner() == connection_id {
        close_session(state, &session, "host left the session").await;
        return true;
    }

    let snapshot = {
        let mut guard = session.lock().await;
        if guard.remove_participant(connection_id).is_none() {
            return false;
        }
        state.sessions().unbind_connection(connection_id);
        state.notifier().remove_from_group(connection_id, session.id());
        SessionSnapshot::from(&*guard)
    };

    info!(session_id = %session.id(), connection_id, "participant left");
    session_events::broadcast_participants(state, &snapshot);
    true
}

/// Tear a session down: mark it ended, notify every member, stop its round loop and unregister it.
pub async fn close_session(state: &SharedState, session: &SharedSession, reason: &str) {
    {
        let mut guard = session.lock().await;
        if let Err(err) = guard.lifecycle_mut().apply(SessionEvent::Close) {
            debug!(session_id = %session.id(), error = %err, "session already closed");
            return;
        }
        guard.generation += 1;
        session_events::broadcast_session_closed(state, session.id(), reason);
    }

    if let Some(round_loop) = session.take_round_loop().await {
        round_loop.abort();
        let _ = round_loop.await;
    }
    state.notifier().drop_group(session.id());
    state.sessions().remove(session.id());
    info!(session_id = %session.id(), reason, "session closed");
}

/// Snapshot of every live session.
pub async fn list_sessions(state: &SharedState) -> Vec<SessionListItem> {
    let mut items = Vec::new();
    for session in state.sessions().list_all() {
        items.push(SessionListItem::from(&*session.lock().await));
    }
    items.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    items
}

/// Public view of one session.
pub async fn get_session(
    state: &SharedState,
    session_id: &str,
) -> Result<SessionSnapshot, ServiceError> {
    let session = require_session(state, session_id)?;
    let guard = session.lock().await;
    Ok(SessionSnapshot::from(&*guard))
}

/// Topics for which questions are cached.
pub async fn list_topics(state: &SharedState) -> Vec<String> {
    state.content().list_topics().await
}

pub(crate) fn require_session(
    state: &SharedState,
    session_id: &str,
) -> Result<SharedSession, ServiceError> {
    state
        .sessions()
        .get(session_id)
        .ok_or_else(|| ServiceError::NotFound(format!("session `{session_id}` not found")))
}

/// Session hosted by `connection_id`, or the matching error for non-hosts.
pub(crate) fn require_hosted_session(
    state: &SharedState,
    connection_id: &str,
) -> Result<SharedSession, ServiceError> {
    let session = state
        .sessions()
        .find_by_connection(connection_id)
        .ok_or_else(|| ServiceError::NotFound("connection is not part of any session".into()))?;

    if session.owner() != connection_id {
        warn!(session_id = %session.id(), connection_id, "host-only action attempted by participant");
        return Err(ServiceError::Unauthorized(
            "only the host can perform this action".into(),
        ));
    }
    Ok(session)
}

fn already_attached(state: &SharedState, connection_id: &str) -> ServiceError {
    let session_id = state
        .sessions()
        .find_by_connection(connection_id)
        .map(|session| session.id().to_string())
        .unwrap_or_default();
    ServiceError::Conflict(format!(
        "connection already belongs to session `{session_id}`"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{
        session_events::{
            EVENT_ERROR, EVENT_KICKED, EVENT_PARTICIPANTS_UPDATED, EVENT_SESSION_CLOSED,
            EVENT_SESSION_JOINED, EVENT_SETTINGS_UPDATED,
        },
        test_support::{StubSource, test_state},
    };

    fn join(session_id: &str, name: &str) -> JoinSessionInput {
        JoinSessionInput {
            session_id: session_id.into(),
            name: name.into(),
        }
    }

    fn settings(question_count: i64, timer_secs: i64, topic: &str) -> SettingsInput {
        SettingsInput {
            question_count,
            timer_secs,
            topic: topic.into(),
        }
    }

    #[tokio::test]
    async fn host_joins_automatically_and_duplicate_name_is_rejected() {
        let (state, notifier) = test_state(StubSource::working());
        let session = create_session(&state, "H", CreateSessionInput::default())
            .await
            .unwrap();
        assert_eq!(session.lock().await.participants.len(), 1);
        assert_eq!(notifier.received("H"), vec![EVENT_SESSION_JOINED]);

        let err = join_session(&state, "other", join(session.id(), "Host"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
        assert_eq!(session.lock().await.participants.len(), 1);
        assert!(!notifier.is_member("other", session.id()));
    }

    #[tokio::test]
    async fn rejected_join_leaves_the_connection_free() {
        let (state, _) = test_state(StubSource::working());
        let session = create_session(&state, "H", CreateSessionInput::default())
            .await
            .unwrap();

        assert!(join_session(&state, "A", join(session.id(), "Host")).await.is_err());
        join_session(&state, "A", join(session.id(), "Alice"))
            .await
            .unwrap();

        let found = state.sessions().find_by_connection("A").unwrap();
        assert_eq!(found.id(), session.id());
    }

    #[tokio::test]
    async fn joining_broadcasts_the_membership() {
        let (state, notifier) = test_state(StubSource::working());
        let session = create_session(&state, "H", CreateSessionInput::default())
            .await
            .unwrap();

        join_session(&state, "A", join(session.id(), "Alice"))
            .await
            .unwrap();

        let payloads = notifier.received_payloads("H", EVENT_PARTICIPANTS_UPDATED);
        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads[0]["participants"][1]["name"], "Alice");
        assert_eq!(notifier.received("A"), vec![EVENT_SESSION_JOINED, EVENT_PARTICIPANTS_UPDATED]);
    }

    #[tokio::test]
    async fn joining_an_unknown_session_is_not_found() {
        let (state, _) = test_state(StubSource::working());
        let err = join_session(&state, "A", join("NOPE42", "Alice"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn a_connection_cannot_be_in_two_sessions() {
        let (state, _) = test_state(StubSource::working());
        let first = create_session(&state, "H1", CreateSessionInput::default())
            .await
            .unwrap();
        let second = create_session(&state, "H2", CreateSessionInput::default())
            .await
            .unwrap();
        join_session(&state, "A", join(first.id(), "Alice"))
            .await
            .unwrap();

        let err = join_session(&state, "A", join(second.id(), "Alice"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
        assert!(create_session(&state, "A", CreateSessionInput::default()).await.is_err());
    }

    #[tokio::test]
    async fn only_the_host_may_update_settings() {
        let (state, _) = test_state(StubSource::working());
        let session = create_session(&state, "H", CreateSessionInput::default())
            .await
            .unwrap();
        join_session(&state, "A", join(session.id(), "Alice"))
            .await
            .unwrap();

        let err = update_settings(&state, "A", settings(3, 10, "math"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn settings_are_sanitised_and_reprovisioned() {
        let source = StubSource::working();
        let (state, notifier) = test_state(source.clone());
        let session = create_session(&state, "H", CreateSessionInput::default())
            .await
            .unwrap();

        update_settings(&state, "H", settings(0, -3, "  math "))
            .await
            .unwrap();

        {
            let guard = session.lock().await;
            assert_eq!(
                guard.settings,
                Settings {
                    question_count: 1,
                    timer_secs: 1,
                    topic: "math".into()
                }
            );
            assert_eq!(guard.current_match.as_ref().unwrap().question_count(), 1);
        }
        assert_eq!(source.fetch_calls(), vec![("math".to_string(), 1)]);
        let payloads = notifier.group_payloads(session.id(), EVENT_SETTINGS_UPDATED);
        assert_eq!(payloads[0]["available_questions"], 1);
    }

    #[tokio::test]
    async fn settings_update_queued_behind_a_match_start_keeps_the_questions() {
        let source = StubSource::working();
        let (state, notifier) = test_state(source.clone());
        let session = create_session(&state, "H", CreateSessionInput::default())
            .await
            .unwrap();
        update_settings(&state, "H", settings(2, 10, "math"))
            .await
            .unwrap();

        let gate = session.provisioning_gate().lock().await;
        let pending = tokio::spawn({
            let state = state.clone();
            async move { update_settings(&state, "H", settings(5, 20, "math")).await }
        });
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        {
            let mut guard = session.lock().await;
            guard.lifecycle_mut().apply(SessionEvent::StartVoting).unwrap();
            guard.lifecycle_mut().apply(SessionEvent::StartMatch).unwrap();
        }
        drop(gate);
        pending.await.unwrap().unwrap();

        assert_eq!(source.fetch_calls().len(), 1);
        let guard = session.lock().await;
        assert_eq!(guard.settings.question_count, 5);
        assert_eq!(guard.current_match.as_ref().unwrap().question_count(), 2);
        let payloads = notifier.group_payloads(session.id(), EVENT_SETTINGS_UPDATED);
        assert_eq!(payloads.last().unwrap()["available_questions"], 2);
    }

    #[tokio::test]
    async fn kick_removes_participant_and_notifies_it() {
        let (state, notifier) = test_state(StubSource::working());
        let session = create_session(&state, "H", CreateSessionInput::default())
            .await
            .unwrap();
        join_session(&state, "A", join(session.id(), "Alice"))
            .await
            .unwrap();

        kick_participant(&state, "H", "Alice").await.unwrap();

        assert!(!session.lock().await.has_connection("A"));
        assert!(notifier.received("A").contains(&EVENT_KICKED.to_string()));
        assert!(!notifier.is_member("A", session.id()));

        let err = kick_participant(&state, "H", "Alice").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
        let err = kick_participant(&state, "H", "Host").await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn participant_disconnect_keeps_the_session() {
        let (state, _) = test_state(StubSource::working());
        let session = create_session(&state, "H", CreateSessionInput::default())
            .await
            .unwrap();
        join_session(&state, "A", join(session.id(), "Alice"))
            .await
            .unwrap();

        assert!(handle_disconnect(&state, "A").await);
        assert!(!handle_disconnect(&state, "A").await);
        assert!(state.sessions().get(session.id()).is_some());
        assert_eq!(session.lock().await.participants.len(), 1);
    }

    #[tokio::test]
    async fn host_disconnect_closes_the_session_for_everyone() {
        let (state, notifier) = test_state(StubSource::working());
        let session = create_session(&state, "H", CreateSessionInput::default())
            .await
            .unwrap();
        join_session(&state, "A", join(session.id(), "Alice"))
            .await
            .unwrap();

        assert!(handle_disconnect(&state, "H").await);

        assert!(state.sessions().get(session.id()).is_none());
        assert_eq!(session.lock().await.phase(), SessionPhase::Ended);
        assert!(notifier.received("A").contains(&EVENT_SESSION_CLOSED.to_string()));
        assert!(notifier.received("H").contains(&EVENT_SESSION_CLOSED.to_string()));
        assert!(matches!(
            leave_session(&state, "A").await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(!notifier.received("A").contains(&EVENT_ERROR.to_string()));
    }

    #[tokio::test]
    async fn closed_session_releases_every_connection() {
        let (state, _) = test_state(StubSource::working());
        let session = create_session(&state, "H", CreateSessionInput::default())
            .await
            .unwrap();
        join_session(&state, "A", join(session.id(), "Alice"))
            .await
            .unwrap();
        kick_participant(&state, "H", "Alice").await.unwrap();
        assert!(state.sessions().find_by_connection("A").is_none());
        join_session(&state, "A", join(session.id(), "Alice"))
            .await
            .unwrap();

        close_session(&state, &session, "test over").await;

        assert!(state.sessions().find_by_connection("H").is_none());
        assert!(state.sessions().find_by_connection("A").is_none());
        create_session(&state, "A", CreateSessionInput::default())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn listing_reports_every_live_session() {
        let (state, _) = test_state(StubSource::working());
        create_session(&state, "H1", CreateSessionInput::default())
            .await
            .unwrap();
        create_session(
            &state,
            "H2",
            CreateSessionInput {
                name: Some("Quizmaster".into()),
            },
        )
        .await
        .unwrap();

        let sessions = list_sessions(&state).await;
        assert_eq!(sessions.len(), 2);
        assert!(sessions.iter().any(|item| item.host == "Quizmaster"));
        assert!(sessions.iter().all(|item| item.participant_count == 1));
    }
}
