use axum::Router;

use crate::state::SharedState;

pub mod health;
pub mod sessions;
pub mod websocket;

/// Compose all route trees and wire in shared state.
pub fn router(state: SharedState) -> Router<()> {
    health::router()
        .merge(sessions::router())
        .merge(websocket::router())
        .with_state(state)
}
