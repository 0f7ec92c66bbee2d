use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use crate::state::{question::AnswerError, state_machine::InvalidTransition};

/// Errors that can occur in service layer operations.
///
/// Every variant is scoped to the request that triggered it and reported to the
/// acting connection only.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Non-host connection attempted a host-only action.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Answer payload does not match the question kind.
    #[error("malformed answer: {0}")]
    Malformed(#[from] AnswerError),
    /// Request clashes with existing state (duplicate member, double answer).
    #[error("conflict: {0}")]
    Conflict(String),
    /// Operation cannot be performed in the current session phase.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// Requested session or participant was not found.
    #[error("not found: {0}")]
    NotFound(String),
}

impl ServiceError {
    /// Stable machine-readable category sent to clients.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::Unauthorized(_) => "unauthorized",
            ServiceError::InvalidInput(_) => "invalid_input",
            ServiceError::Malformed(_) => "malformed_answer",
            ServiceError::Conflict(_) => "conflict",
            ServiceError::InvalidState(_) => "invalid_state",
            ServiceError::NotFound(_) => "not_found",
        }
    }
}

impl From<InvalidTransition> for ServiceError {
    fn from(err: InvalidTransition) -> Self {
        ServiceError::InvalidState(format!(
            "cannot {} while the session is {}",
            describe_event(&err),
            err.from.as_str()
        ))
    }
}

fn describe_event(err: &InvalidTransition) -> &'static str {
    use crate::state::state_machine::SessionEvent;

    match err.event {
        SessionEvent::StartVoting => "start voting",
        SessionEvent::VotingFailed => "abort voting",
        SessionEvent::StartMatch => "start a match",
        SessionEvent::MatchFinished => "finish the match",
        SessionEvent::Close => "close the session",
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Unauthorized access attempt.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Conflict with current state.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Unauthorized(message) => AppError::Unauthorized(message),
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::Malformed(source) => AppError::BadRequest(source.to_string()),
            ServiceError::Conflict(message) | ServiceError::InvalidState(message) => {
                AppError::Conflict(message)
            }
            ServiceError::NotFound(message) => AppError::NotFound(message),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::state_machine::{SessionEvent, SessionPhase};

    #[test]
    fn invalid_transition_reads_as_a_phase_error() {
        let err = ServiceError::from(InvalidTransition {
            from: SessionPhase::Running,
            event: SessionEvent::StartVoting,
        });
        assert_eq!(err.kind(), "invalid_state");
        assert_eq!(
            err.to_string(),
            "invalid state: cannot start voting while the session is running"
        );
    }

    #[test]
    fn service_errors_map_to_http_statuses() {
        let cases = [
            (ServiceError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (ServiceError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (ServiceError::Conflict("x".into()), StatusCode::CONFLICT),
            (ServiceError::InvalidState("x".into()), StatusCode::CONFLICT),
            (ServiceError::InvalidInput("x".into()), StatusCode::BAD_REQUEST),
            (
                ServiceError::Malformed(AnswerError::OutOfRange {
                    index: 4,
                    available: 2,
                }),
                StatusCode::BAD_REQUEST,
            ),
        ];
        for (err, status) in cases {
            let response = AppError::from(err).into_response();
            assert_eq!(response.status(), status);
        }
    }
}
