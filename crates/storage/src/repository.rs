use async_trait::async_trait;
use exam_core::model::{AnswerSet, ExamId, OptionId, QuestionId};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

//
// ─── KEYS ──────────────────────────────────────────────────────────────────────
//

/// Key into the local state store.
///
/// Every key is scoped to one exam, so two exams open side by side never
/// share an entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorageKey(String);

impl StorageKey {
    /// Serialized answer set for an exam.
    #[must_use]
    pub fn answers(exam_id: ExamId) -> Self {
        Self(format!("exam_answers_{exam_id}"))
    }

    /// Marker that an attempt was started for an exam.
    #[must_use]
    pub fn started(exam_id: ExamId) -> Self {
        Self(format!("exam_started_{exam_id}"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

//
// ─── RECORDS ───────────────────────────────────────────────────────────────────
//

/// Persisted shape of an answer set: `{"<question_id>": "<option>"}`.
///
/// Kept separate from the domain `AnswerSet` so the stored JSON stays a plain
/// string map regardless of how the domain type evolves.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct AnswersRecord(BTreeMap<String, String>);

impl AnswersRecord {
    #[must_use]
    pub fn from_answers(answers: &AnswerSet) -> Self {
        Self(
            answers
                .iter()
                .map(|(question, option)| (question.to_string(), option.to_string()))
                .collect(),
        )
    }

    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the text is not a string map.
    pub fn from_json(raw: &str) -> Result<Self, StorageError> {
        serde_json::from_str(raw).map_err(|err| StorageError::Serialization(err.to_string()))
    }

    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if encoding fails.
    pub fn to_json(&self) -> Result<String, StorageError> {
        serde_json::to_string(self).map_err(|err| StorageError::Serialization(err.to_string()))
    }

    /// Convert back into the domain `AnswerSet`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if any key or value is not a valid id.
    pub fn into_answers(self) -> Result<AnswerSet, StorageError> {
        self.0
            .into_iter()
            .map(|(question, option)| {
                let question: QuestionId = question
                    .parse()
                    .map_err(|err: exam_core::model::ParseIdError| {
                        StorageError::Serialization(err.to_string())
                    })?;
                let option = OptionId::new(&option)
                    .map_err(|err| StorageError::Serialization(err.to_string()))?;
                Ok((question, option))
            })
            .collect()
    }
}

//
// ─── REPOSITORY ────────────────────────────────────────────────────────────────
//

/// Durable string store for client-side exam state.
#[async_trait]
pub trait LocalStateRepository: Send + Sync {
    /// Read a value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn get_item(&self, key: &StorageKey) -> Result<Option<String>, StorageError>;

    /// Write or replace a value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the value cannot be stored.
    async fn set_item(&self, key: &StorageKey, value: &str) -> Result<(), StorageError>;

    /// Delete a value. Missing keys are not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    async fn remove_item(&self, key: &StorageKey) -> Result<(), StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
///
/// Clones share the same map, which lets tests simulate a page reload by
/// building a fresh session over a clone.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    items: Arc<Mutex<HashMap<StorageKey, String>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LocalStateRepository for InMemoryRepository {
    async fn get_item(&self, key: &StorageKey) -> Result<Option<String>, StorageError> {
        let guard = self
            .items
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(key).cloned())
    }

    async fn set_item(&self, key: &StorageKey, value: &str) -> Result<(), StorageError> {
        let mut guard = self
            .items
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(key.clone(), value.to_owned());
        Ok(())
    }

    async fn remove_item(&self, key: &StorageKey) -> Result<(), StorageError> {
        let mut guard = self
            .items
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.remove(key);
        Ok(())
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub local_state: Arc<dyn LocalStateRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let local_state: Arc<dyn LocalStateRepository> = Arc::new(InMemoryRepository::new());
        Self { local_state }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opt(raw: &str) -> OptionId {
        OptionId::new(raw).unwrap()
    }

    #[test]
    fn keys_are_scoped_per_exam() {
        assert_eq!(StorageKey::answers(ExamId::new(3)).as_str(), "exam_answers_3");
        assert_eq!(StorageKey::started(ExamId::new(3)).as_str(), "exam_started_3");
        assert_ne!(
            StorageKey::answers(ExamId::new(3)),
            StorageKey::answers(ExamId::new(4))
        );
    }

    #[test]
    fn answers_record_uses_plain_string_map() {
        let answers: AnswerSet = [
            (QuestionId::new(1), opt("B")),
            (QuestionId::new(3), opt("A")),
        ]
        .into_iter()
        .collect();
        let json = AnswersRecord::from_answers(&answers).to_json().unwrap();
        assert_eq!(json, r#"{"1":"B","3":"A"}"#);

        let restored = AnswersRecord::from_json(&json)
            .unwrap()
            .into_answers()
            .unwrap();
        assert_eq!(restored, answers);
    }

    #[test]
    fn answers_record_rejects_garbage() {
        assert!(AnswersRecord::from_json("{not json").is_err());
        assert!(AnswersRecord::from_json("[1,2]").is_err());
        let bad_key = AnswersRecord::from_json(r#"{"q1":"A"}"#).unwrap();
        assert!(bad_key.into_answers().is_err());
    }

    #[tokio::test]
    async fn in_memory_clones_share_items() {
        let repo = InMemoryRepository::new();
        let other = repo.clone();
        let key = StorageKey::started(ExamId::new(1));

        repo.set_item(&key, "true").await.unwrap();
        assert_eq!(other.get_item(&key).await.unwrap().as_deref(), Some("true"));

        other.remove_item(&key).await.unwrap();
        assert_eq!(repo.get_item(&key).await.unwrap(), None);
        repo.remove_item(&key).await.unwrap();
    }
}
