use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Host-controlled match configuration of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Number of rounds to play (at least 1).
    pub question_count: u32,
    /// Seconds granted per round (at least 1).
    pub timer_secs: u32,
    /// Topic used to source questions.
    pub topic: String,
}

/// Unchecked settings as submitted by a host.
#[derive(Debug, Clone)]
pub struct RawSettings {
    /// Requested question count, possibly out of bounds.
    pub question_count: i64,
    /// Requested timer, possibly out of bounds.
    pub timer_secs: i64,
    /// Requested topic, possibly padded with whitespace.
    pub topic: String,
}

impl Settings {
    /// Clamp counts to at least 1 and trim the topic, falling back to `default_topic`
    /// when nothing remains.
    pub fn sanitize(raw: RawSettings, default_topic: &str) -> Self {
        let topic = match raw.topic.trim() {
            "" => default_topic.trim().to_string(),
            trimmed => trimmed.to_string(),
        };

        Self {
            question_count: clamp_positive(raw.question_count),
            timer_secs: clamp_positive(raw.timer_secs),
            topic,
        }
    }

    /// Case-insensitive key identifying the topic in the question cache.
    pub fn topic_key(&self) -> String {
        topic_key(&self.topic)
    }

    /// Time budget of a round.
    pub fn round_duration(&self) -> Duration {
        Duration::from_secs(u64::from(self.timer_secs))
    }
}

/// Normalise a topic for cache lookups: topics compare case-insensitively.
pub fn topic_key(topic: &str) -> String {
    topic.trim().to_lowercase()
}

fn clamp_positive(value: i64) -> u32 {
    u32::try_from(value.max(1)).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(question_count: i64, timer_secs: i64, topic: &str) -> RawSettings {
        RawSettings {
            question_count,
            timer_secs,
            topic: topic.into(),
        }
    }

    #[test]
    fn sanitize_clamps_to_minimum_of_one() {
        let settings = Settings::sanitize(raw(0, -5, "math"), "general");
        assert_eq!(settings.question_count, 1);
        assert_eq!(settings.timer_secs, 1);
    }

    #[test]
    fn sanitize_keeps_valid_values_and_trims_topic() {
        let settings = Settings::sanitize(raw(12, 30, "  World History \n"), "general");
        assert_eq!(
            settings,
            Settings {
                question_count: 12,
                timer_secs: 30,
                topic: "World History".into(),
            }
        );
        assert_eq!(settings.topic_key(), "world history");
    }

    #[test]
    fn blank_topic_falls_back_to_default() {
        let settings = Settings::sanitize(raw(3, 3, "   "), "general");
        assert_eq!(settings.topic, "general");
    }

    #[test]
    fn oversized_values_saturate() {
        let settings = Settings::sanitize(raw(i64::MAX, 10, "x"), "general");
        assert_eq!(settings.question_count, u32::MAX);
    }
}
