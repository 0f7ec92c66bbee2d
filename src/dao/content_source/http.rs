//! HTTP question generator client.
//!
//! The upstream receives `{"topic": ..., "count": ...}` and answers with
//! `{"questions": [QuestionEntity, ...]}`.

use std::{sync::Arc, time::Duration};

use futures::{FutureExt, future::BoxFuture};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    dao::{
        content_source::QuestionFetcher,
        models::QuestionEntity,
        storage::{StorageError, StorageResult},
    },
    state::question::Question,
};

/// Failures that can occur while talking to the question generator.
#[derive(Debug, Error)]
pub enum HttpSourceError {
    /// Building the HTTP client failed (invalid TLS setup, etc).
    #[error("failed to build question source client")]
    ClientBuilder {
        #[source]
        source: reqwest::Error,
    },
    /// The request could not be sent.
    #[error("failed to send question request to `{url}`")]
    RequestSend {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    /// The upstream answered with a non-success status.
    #[error("unexpected question source response status {status} for `{url}`")]
    RequestStatus { url: String, status: StatusCode },
    /// The response body is not the expected JSON document.
    #[error("failed to decode question source response from `{url}`")]
    DecodeResponse {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl From<HttpSourceError> for StorageError {
    fn from(err: HttpSourceError) -> Self {
        StorageError::unavailable(err.to_string(), err)
    }
}

#[derive(Debug, Serialize)]
struct QuestionRequest<'a> {
    topic: &'a str,
    count: usize,
}

#[derive(Debug, Deserialize)]
struct QuestionResponse {
    questions: Vec<QuestionEntity>,
}

/// Fetches questions from a remote generator endpoint.
#[derive(Clone)]
pub struct HttpQuestionSource {
    client: Client,
    endpoint: Arc<str>,
}

impl HttpQuestionSource {
    /// Build a client targeting `endpoint` with a per-request `timeout`.
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, HttpSourceError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| HttpSourceError::ClientBuilder { source })?;

        Ok(Self {
            client,
            endpoint: Arc::from(endpoint.trim_end_matches('/')),
        })
    }

    async fn request(
        client: Client,
        url: Arc<str>,
        topic: String,
        count: usize,
    ) -> Result<Vec<Question>, HttpSourceError> {
        let response = client
            .post(url.as_ref())
            .json(&QuestionRequest {
                topic: &topic,
                count,
            })
            .send()
            .await
            .map_err(|source| HttpSourceError::RequestSend {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(HttpSourceError::RequestStatus {
                url: url.to_string(),
                status,
            });
        }

        let body: QuestionResponse =
            response
                .json()
                .await
                .map_err(|source| HttpSourceError::DecodeResponse {
                    url: url.to_string(),
                    source,
                })?;

        let questions: Vec<Question> = body
            .questions
            .into_iter()
            .filter_map(|entity| match Question::try_from(entity) {
                Ok(question) => Some(question),
                Err(err) => {
                    warn!(topic = %topic, error = %err, "discarding invalid fetched question");
                    None
                }
            })
            .take(count)
            .collect();

        debug!(topic = %topic, requested = count, received = questions.len(), "fetched questions");
        Ok(questions)
    }
}

impl QuestionFetcher for HttpQuestionSource {
    fn fetch(&self, topic: &str, count: usize) -> BoxFuture<'static, StorageResult<Vec<Question>>> {
        let client = self.client.clone();
        let url = self.endpoint.clone();
        let topic = topic.to_string();
        async move {
            Self::request(client, url, topic, count)
                .await
                .map_err(StorageError::from)
        }
        .boxed()
    }
}
