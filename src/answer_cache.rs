//! Last question and answer per user

use crate::debounce::UserId;
use crate::reply::ReplyClassifier;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedAnswer {
    pub question: String,
    pub answer: String,
}

/// Short-circuits a user asking the same question twice in a row
pub struct AnswerCache {
    entries: RwLock<HashMap<UserId, CachedAnswer>>,
    classifier: ReplyClassifier,
}

impl AnswerCache {
    pub fn new(classifier: ReplyClassifier) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            classifier,
        }
    }

    pub async fn get(&self, user: &UserId) -> Option<CachedAnswer> {
        self.entries.read().await.get(user).cloned()
    }

    /// Cached answer when `question` repeats the user's previous one and that
    /// answer still passes the classifier.
    pub async fn lookup(&self, user: &UserId, question: &str) -> Option<String> {
        let entry = self.get(user).await?;
        if entry.question != question || entry.answer.is_empty() {
            return None;
        }
        if self.classifier.looks_like_error(&entry.answer) {
            tracing::info!(user = %user, "Cached answer looks like an error, asking again");
            return None;
        }
        Some(entry.answer)
    }

    /// Remember an answer; replaces the user's previous entry.
    pub async fn put(&self, user: &UserId, question: impl Into<String>, answer: impl Into<String>) {
        let entry = CachedAnswer {
            question: question.into(),
            answer: answer.into(),
        };
        self.entries.write().await.insert(user.clone(), entry);
    }

    pub fn classifier(&self) -> &ReplyClassifier {
        &self.classifier
    }
}
