use serde::Serialize;
use serde_json::Value;

/// Event pushed to one connection or to every connection of a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    /// Event name (e.g. `question`).
    pub event: String,
    /// JSON payload.
    pub data: Value,
}

impl Notification {
    /// Convenience wrapper that serialises `payload` into the data field.
    pub fn json<T>(event: impl Into<String>, payload: &T) -> serde_json::Result<Self>
    where
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_value(payload)?,
        })
    }
}

/// Delivery gateway used by the orchestration services.
///
/// Delivery is fire-and-forget: failures are the transport's concern and never
/// flow back into session state.
pub trait Notifier: Send + Sync {
    /// Send `notification` to a single connection.
    fn notify_one(&self, connection_id: &str, notification: Notification);
    /// Send `notification` to every connection grouped under `session_id`.
    fn notify_group(&self, session_id: &str, notification: Notification);
    /// Make `connection_id` receive the group notifications of `session_id`.
    fn add_to_group(&self, connection_id: &str, session_id: &str);
    /// Stop delivering the group notifications of `session_id` to `connection_id`.
    fn remove_from_group(&self, connection_id: &str, session_id: &str);
    /// Forget the whole group of `session_id`.
    fn drop_group(&self, session_id: &str);
}
