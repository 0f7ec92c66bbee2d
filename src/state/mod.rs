pub mod connections;
pub mod match_state;
pub mod notifier;
pub mod question;
pub mod registry;
pub mod session;
pub mod settings;
pub mod state_machine;

use std::sync::Arc;

use crate::{config::AppConfig, dao::content_source::ContentSource};

pub use self::connections::ConnectionHub;
pub use self::notifier::{Notification, Notifier};
pub use self::registry::{SessionRegistry, SharedSession};

/// Cheaply clonable handle on the process state.
pub type SharedState = Arc<AppState>;

/// Process-wide state: configuration, live sessions, connections and collaborators.
pub struct AppState {
    config: AppConfig,
    sessions: SessionRegistry,
    connections: Arc<ConnectionHub>,
    notifier: Arc<dyn Notifier>,
    content: Arc<dyn ContentSource>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// Notifications are delivered through the WebSocket [`ConnectionHub`].
    pub fn new(config: AppConfig, content: Arc<dyn ContentSource>) -> SharedState {
        let connections = Arc::new(ConnectionHub::new());
        let notifier: Arc<dyn Notifier> = connections.clone();
        Self::build(config, content, connections, notifier)
    }

    /// Construct the state with a custom notification gateway.
    pub fn with_notifier(
        config: AppConfig,
        content: Arc<dyn ContentSource>,
        notifier: Arc<dyn Notifier>,
    ) -> SharedState {
        Self::build(config, content, Arc::new(ConnectionHub::new()), notifier)
    }

    fn build(
        config: AppConfig,
        content: Arc<dyn ContentSource>,
        connections: Arc<ConnectionHub>,
        notifier: Arc<dyn Notifier>,
    ) -> SharedState {
        Arc::new(Self {
            sessions: SessionRegistry::new(config.session_id_length),
            config,
            connections,
            notifier,
            content,
        })
    }

    /// Immutable runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Registry of live sessions.
    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// Open WebSocket connections.
    pub fn connections(&self) -> &ConnectionHub {
        &self.connections
    }

    /// Gateway used to push events to connections and sessions.
    pub fn notifier(&self) -> &dyn Notifier {
        self.notifier.as_ref()
    }

    /// Question source and cache.
    pub fn content(&self) -> &dyn ContentSource {
        self.content.as_ref()
    }
}
