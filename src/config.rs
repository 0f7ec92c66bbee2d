//! Application-level configuration loading.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

use crate::state::settings::Settings;

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "TRIVIA_ARENA_CONFIG_PATH";
/// How long final results stay on screen before the match-end phase closes.
pub const DEFAULT_RESULTS_DISPLAY_SECS: u64 = 10;
const DEFAULT_SESSION_ID_LENGTH: usize = 6;
const DEFAULT_CONTENT_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Seconds the results stay displayed after the last round.
    pub results_display_secs: u64,
    /// Length of generated session identifiers.
    pub session_id_length: usize,
    /// Settings applied to freshly created sessions.
    pub default_settings: Settings,
    /// Question generator endpoint; questions are only served from cache when unset.
    pub content_endpoint: Option<String>,
    /// Per-request timeout for the question generator.
    pub content_timeout_secs: u64,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        upstream = app_config.content_endpoint.is_some(),
                        "loaded configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Duration of the results display phase.
    pub fn results_display(&self) -> Duration {
        Duration::from_secs(self.results_display_secs)
    }

    /// Timeout applied to question generator requests.
    pub fn content_timeout(&self) -> Duration {
        Duration::from_secs(self.content_timeout_secs)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            results_display_secs: DEFAULT_RESULTS_DISPLAY_SECS,
            session_id_length: DEFAULT_SESSION_ID_LENGTH,
            default_settings: default_settings(),
            content_endpoint: None,
            content_timeout_secs: DEFAULT_CONTENT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file; absent keys keep their default.
struct RawConfig {
    results_display_secs: Option<u64>,
    session_id_length: Option<usize>,
    default_settings: Option<RawSettings>,
    content_endpoint: Option<String>,
    content_timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawSettings {
    question_count: u32,
    timer_secs: u32,
    topic: String,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = AppConfig::default();
        Self {
            results_display_secs: value
                .results_display_secs
                .unwrap_or(defaults.results_display_secs),
            session_id_length: value
                .session_id_length
                .filter(|length| *length > 0)
                .unwrap_or(defaults.session_id_length),
            default_settings: value
                .default_settings
                .map(|raw| Settings {
                    question_count: raw.question_count.max(1),
                    timer_secs: raw.timer_secs.max(1),
                    topic: raw.topic.trim().to_string(),
                })
                .filter(|settings| !settings.topic.is_empty())
                .unwrap_or(defaults.default_settings),
            content_endpoint: value
                .content_endpoint
                .filter(|endpoint| !endpoint.trim().is_empty()),
            content_timeout_secs: value
                .content_timeout_secs
                .unwrap_or(defaults.content_timeout_secs),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

fn default_settings() -> Settings {
    Settings {
        question_count: 10,
        timer_secs: 20,
        topic: "general".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_keeps_defaults() {
        let raw: RawConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(AppConfig::from(raw), AppConfig::default());
        assert_eq!(
            AppConfig::default().results_display(),
            Duration::from_secs(10)
        );
    }

    #[test]
    fn overrides_are_applied_and_sanitised() {
        let raw: RawConfig = serde_json::from_str(
            r#"{
                "results_display_secs": 3,
                "session_id_length": 0,
                "default_settings": { "question_count": 0, "timer_secs": 15, "topic": " Science " },
                "content_endpoint": "http://localhost:9000/questions"
            }"#,
        )
        .unwrap();
        let config = AppConfig::from(raw);

        assert_eq!(config.results_display_secs, 3);
        assert_eq!(config.session_id_length, DEFAULT_SESSION_ID_LENGTH);
        assert_eq!(config.default_settings.question_count, 1);
        assert_eq!(config.default_settings.topic, "Science");
        assert_eq!(
            config.content_endpoint.as_deref(),
            Some("http://localhost:9000/questions")
        );
    }
}
