use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};

use crate::{
    dto::session::{SessionListItem, SessionSnapshot},
    error::AppError,
    services::lobby_service,
    state::SharedState,
};

/// Read-only endpoints describing live sessions and known topics.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/sessions", get(list_sessions))
        .route("/sessions/{id}", get(get_session))
        .route("/topics", get(list_topics))
}

/// Return every live session, oldest first.
pub async fn list_sessions(State(state): State<SharedState>) -> Json<Vec<SessionListItem>> {
    Json(lobby_service::list_sessions(&state).await)
}

/// Return the public view of one session.
pub async fn get_session(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let snapshot = lobby_service::get_session(&state, &id).await?;
    Ok(Json(snapshot))
}

/// Return the topics questions are cached for.
pub async fn list_topics(State(state): State<SharedState>) -> Json<Vec<String>> {
    Json(lobby_service::list_topics(&state).await)
}
