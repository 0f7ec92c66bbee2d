//! In-memory question cache backed by an optional upstream fetcher.

use std::sync::Arc;

use dashmap::DashMap;
use futures::{FutureExt, future::BoxFuture};
use tracing::debug;

use crate::{
    dao::{
        content_source::{ContentSource, QuestionFetcher},
        storage::{StorageError, StorageResult},
    },
    state::{question::Question, settings::topic_key},
};

/// Process-wide question cache keyed by normalised topic.
#[derive(Clone, Default)]
pub struct QuestionBank {
    cache: Arc<DashMap<String, Vec<Question>>>,
    upstream: Option<Arc<dyn QuestionFetcher>>,
}

impl QuestionBank {
    /// Cache without upstream: every fetch fails and only cached sets are served.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache delegating fetches to `upstream`.
    pub fn with_upstream(upstream: Arc<dyn QuestionFetcher>) -> Self {
        Self {
            cache: Arc::default(),
            upstream: Some(upstream),
        }
    }
}

impl ContentSource for QuestionBank {
    fn fetch_questions(
        &self,
        topic: &str,
        count: usize,
    ) -> BoxFuture<'static, StorageResult<Vec<Question>>> {
        match &self.upstream {
            Some(upstream) => upstream.fetch(topic, count),
            None => {
                let topic = topic.to_string();
                async move {
                    Err(StorageError::not_configured(format!(
                        "no upstream configured to fetch questions about `{topic}`"
                    )))
                }
                .boxed()
            }
        }
    }

    fn get_cached(&self, topic: &str) -> BoxFuture<'static, Vec<Question>> {
        let cached = self
            .cache
            .get(&topic_key(topic))
            .map(|entry| entry.value().clone())
            .unwrap_or_default();
        async move { cached }.boxed()
    }

    fn save_cached(
        &self,
        topic: &str,
        questions: Vec<Question>,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let key = topic_key(topic);
        debug!(topic = %key, count = questions.len(), "caching question set");
        self.cache.insert(key, questions);
        async { Ok(()) }.boxed()
    }

    fn list_topics(&self) -> BoxFuture<'static, Vec<String>> {
        let mut topics: Vec<String> = self
            .cache
            .iter()
            .filter(|entry| !entry.value().is_empty())
            .map(|entry| entry.key().clone())
            .collect();
        topics.sort();
        async move { topics }.boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::question::QuestionKind;

    fn question(prompt: &str) -> Question {
        Question {
            prompt: prompt.into(),
            time_limit_secs: 10,
            points: 10,
            kind: QuestionKind::Boolean { correct: false },
        }
    }

    #[tokio::test]
    async fn topics_are_case_insensitive() {
        let bank = QuestionBank::new();
        bank.save_cached("Math", vec![question("1 + 1 = 3")])
            .await
            .unwrap();

        assert_eq!(bank.get_cached("  MATH ").await.len(), 1);
        assert_eq!(bank.list_topics().await, vec!["math".to_string()]);
    }

    #[tokio::test]
    async fn fetch_without_upstream_fails() {
        let bank = QuestionBank::new();
        assert!(bank.fetch_questions("math", 3).await.is_err());
        assert!(bank.get_cached("math").await.is_empty());
    }
}
