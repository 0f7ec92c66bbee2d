//! Doubles for the notification gateway and the content source used by service tests.

use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use futures::{FutureExt, future::BoxFuture};

use crate::{
    config::AppConfig,
    dao::{
        content_source::ContentSource,
        storage::{StorageError, StorageResult},
    },
    state::{
        AppState, Notification, Notifier, SharedState,
        question::{Question, QuestionKind},
        settings::topic_key,
    },
};

/// Notifier recording what every connection would have received.
#[derive(Default)]
pub struct RecordingNotifier {
    groups: Mutex<HashMap<String, HashSet<String>>>,
    inbox: Mutex<Vec<(String, Notification)>>,
    group_log: Mutex<Vec<(String, Notification)>>,
}

impl RecordingNotifier {
    /// Event names delivered to `connection_id`, in order.
    pub fn received(&self, connection_id: &str) -> Vec<String> {
        self.inbox
            .lock()
            .unwrap()
            .iter()
            .filter(|(target, _)| target == connection_id)
            .map(|(_, notification)| notification.event.clone())
            .collect()
    }

    /// Notifications delivered to `connection_id` for `event`.
    pub fn received_payloads(&self, connection_id: &str, event: &str) -> Vec<serde_json::Value> {
        self.inbox
            .lock()
            .unwrap()
            .iter()
            .filter(|(target, n)| target == connection_id && n.event == event)
            .map(|(_, notification)| notification.data.clone())
            .collect()
    }

    /// Event names broadcast to `session_id`, in order.
    pub fn group_events(&self, session_id: &str) -> Vec<String> {
        self.group_log
            .lock()
            .unwrap()
            .iter()
            .filter(|(target, _)| target == session_id)
            .map(|(_, notification)| notification.event.clone())
            .collect()
    }

    /// Payloads broadcast to `session_id` for `event`.
    pub fn group_payloads(&self, session_id: &str, event: &str) -> Vec<serde_json::Value> {
        self.group_log
            .lock()
            .unwrap()
            .iter()
            .filter(|(target, n)| target == session_id && n.event == event)
            .map(|(_, notification)| notification.data.clone())
            .collect()
    }

    /// Whether `connection_id` currently belongs to the group of `session_id`.
    pub fn is_member(&self, connection_id: &str, session_id: &str) -> bool {
        self.groups
            .lock()
            .unwrap()
            .get(session_id)
            .is_some_and(|members| members.contains(connection_id))
    }
}

impl Notifier for RecordingNotifier {
    fn notify_one(&self, connection_id: &str, notification: Notification) {
        self.inbox
            .lock()
            .unwrap()
            .push((connection_id.to_string(), notification));
    }

    fn notify_group(&self, session_id: &str, notification: Notification) {
        let members: Vec<String> = self
            .groups
            .lock()
            .unwrap()
            .get(session_id)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default();
        {
            let mut inbox = self.inbox.lock().unwrap();
            for member in members {
                inbox.push((member, notification.clone()));
            }
        }
        self.group_log
            .lock()
            .unwrap()
            .push((session_id.to_string(), notification));
    }

    fn add_to_group(&self, connection_id: &str, session_id: &str) {
        self.groups
            .lock()
            .unwrap()
            .entry(session_id.to_string())
            .or_default()
            .insert(connection_id.to_string());
    }

    fn remove_from_group(&self, connection_id: &str, session_id: &str) {
        if let Some(members) = self.groups.lock().unwrap().get_mut(session_id) {
            members.remove(connection_id);
        }
    }

    fn drop_group(&self, session_id: &str) {
        self.groups.lock().unwrap().remove(session_id);
    }
}

/// Content source generating boolean questions whose correct answer is `true`.
#[derive(Default)]
pub struct StubSource {
    cache: Mutex<HashMap<String, Vec<Question>>>,
    failing: bool,
    fetched: AtomicUsize,
    fetch_calls: Mutex<Vec<(String, usize)>>,
}

impl StubSource {
    /// Source whose fetches always succeed.
    pub fn working() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Source whose fetches always fail.
    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            failing: true,
            ..Self::default()
        })
    }

    /// Pre-populate the cache for `topic`.
    pub fn with_cached(self: Arc<Self>, topic: &str, questions: Vec<Question>) -> Arc<Self> {
        self.cache.lock().unwrap().insert(topic_key(topic), questions);
        self
    }

    /// `(topic, count)` of every fetch attempt.
    pub fn fetch_calls(&self) -> Vec<(String, usize)> {
        self.fetch_calls.lock().unwrap().clone()
    }

    /// Questions cached for `topic`.
    pub fn cached(&self, topic: &str) -> Vec<Question> {
        self.cache
            .lock()
            .unwrap()
            .get(&topic_key(topic))
            .cloned()
            .unwrap_or_default()
    }
}

/// Boolean question worth 100 points answered by `true`.
pub fn true_question(prompt: &str) -> Question {
    Question {
        prompt: prompt.to_string(),
        time_limit_secs: 30,
        points: 100,
        kind: QuestionKind::Boolean { correct: true },
    }
}

impl ContentSource for StubSource {
    fn fetch_questions(
        &self,
        topic: &str,
        count: usize,
    ) -> BoxFuture<'static, StorageResult<Vec<Question>>> {
        self.fetch_calls
            .lock()
            .unwrap()
            .push((topic.to_string(), count));
        let result = if self.failing {
            Err(StorageError::not_configured("stub upstream down"))
        } else {
            let start = self.fetched.fetch_add(count, Ordering::SeqCst);
            Ok((start..start + count)
                .map(|n| true_question(&format!("{topic} #{n}")))
                .collect())
        };
        async move { result }.boxed()
    }

    fn get_cached(&self, topic: &str) -> BoxFuture<'static, Vec<Question>> {
        let cached = self.cached(topic);
        async move { cached }.boxed()
    }

    fn save_cached(
        &self,
        topic: &str,
        questions: Vec<Question>,
    ) -> BoxFuture<'static, StorageResult<()>> {
        self.cache.lock().unwrap().insert(topic_key(topic), questions);
        async { Ok(()) }.boxed()
    }

    fn list_topics(&self) -> BoxFuture<'static, Vec<String>> {
        let topics = self.cache.lock().unwrap().keys().cloned().collect();
        async move { topics }.boxed()
    }
}

/// Build a shared state wired to recording doubles.
pub fn test_state(source: Arc<StubSource>) -> (SharedState, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::default());
    let state = AppState::with_notifier(AppConfig::default(), source, notifier.clone());
    (state, notifier)
}
