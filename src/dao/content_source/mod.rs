pub mod bank;
pub mod http;

use futures::future::BoxFuture;

use crate::{dao::storage::StorageResult, state::question::Question};

pub use self::{bank::QuestionBank, http::HttpQuestionSource};

/// Source of trivia questions and cache of the sets already played per topic.
pub trait ContentSource: Send + Sync {
    /// Obtain `count` new questions about `topic` from upstream.
    fn fetch_questions(
        &self,
        topic: &str,
        count: usize,
    ) -> BoxFuture<'static, StorageResult<Vec<Question>>>;
    /// Questions previously saved for `topic` (empty when unknown).
    fn get_cached(&self, topic: &str) -> BoxFuture<'static, Vec<Question>>;
    /// Remember the question set finalised for `topic`.
    fn save_cached(
        &self,
        topic: &str,
        questions: Vec<Question>,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Topics with a cached question set.
    fn list_topics(&self) -> BoxFuture<'static, Vec<String>>;
}

/// Upstream able to produce fresh questions for a topic.
pub trait QuestionFetcher: Send + Sync {
    /// Produce `count` questions about `topic`.
    fn fetch(&self, topic: &str, count: usize) -> BoxFuture<'static, StorageResult<Vec<Question>>>;
}
