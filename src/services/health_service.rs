use crate::{dto::health::HealthResponse, state::SharedState};

/// Report liveness together with the number of sessions and open connections.
pub fn health_status(state: &SharedState) -> HealthResponse {
    HealthResponse::ok(state.sessions().len(), state.connections().connection_count())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{StubSource, test_state};

    #[test]
    fn counts_live_sessions() {
        let (state, _) = test_state(StubSource::working());
        let session = state
            .sessions()
            .create("host", "Host", state.config().default_settings.clone());
        assert!(session.is_some());

        let status = health_status(&state);
        assert_eq!(status.status, "ok");
        assert_eq!(status.sessions, 1);
        assert_eq!(status.connections, 0);
    }
}
