/// Health check service.
pub mod health_service;
/// Session creation, membership and settings.
pub mod lobby_service;
/// Voting, timed rounds and answer scoring.
pub mod match_service;
/// Question set reconciliation against the content source.
pub mod provisioner;
/// Notification payloads and their delivery helpers.
pub mod session_events;
/// WebSocket connection and message handling service.
pub mod websocket_service;

#[cfg(test)]
mod test_support;
