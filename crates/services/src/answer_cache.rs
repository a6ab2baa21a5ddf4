use std::sync::Arc;

use exam_core::model::{AnswerSet, ExamId, ExamPaper, OptionId, QuestionId};
use storage::repository::{AnswersRecord, LocalStateRepository, StorageError, StorageKey};

use crate::error::SessionError;

const STARTED_MARKER: &str = "true";

/// In-memory answers for one exam, mirrored to local state on every change.
#[derive(Clone)]
pub struct AnswerCache {
    exam_id: ExamId,
    answers: AnswerSet,
    store: Arc<dyn LocalStateRepository>,
    /// The last read of stored answers failed; they may still be there.
    store_unread: bool,
}

impl AnswerCache {
    #[must_use]
    pub fn new(exam_id: ExamId, store: Arc<dyn LocalStateRepository>) -> Self {
        Self {
            exam_id,
            answers: AnswerSet::new(),
            store,
            store_unread: false,
        }
    }

    #[must_use]
    pub fn answers(&self) -> &AnswerSet {
        &self.answers
    }

    /// Record a choice and persist the whole set.
    ///
    /// The in-memory set keeps the choice even when the write fails. If the
    /// stored answers could not be read earlier, they are merged in first so
    /// the write never drops them; nothing is written while they stay
    /// unreadable.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Answer` if the choice is not on the paper, or
    /// `SessionError::Storage` if persisting fails.
    pub async fn record_answer(
        &mut self,
        paper: &ExamPaper,
        question: QuestionId,
        option: OptionId,
    ) -> Result<(), SessionError> {
        self.answers.record(paper, question, option)?;
        self.merge_unread_store(paper).await?;
        self.persist().await?;
        Ok(())
    }

    /// Restore answers saved for this exam.
    ///
    /// Missing or unreadable data yields an empty set; entries that are not
    /// on `paper` are dropped. Returns the number of restored answers.
    pub async fn load_cached(&mut self, paper: &ExamPaper) -> usize {
        let key = StorageKey::answers(self.exam_id);
        let raw = match self.store.get_item(&key).await {
            Ok(raw) => {
                self.store_unread = false;
                raw
            }
            Err(err) => {
                tracing::warn!(exam_id = %self.exam_id, error = %err, "could not read cached answers");
                self.store_unread = true;
                None
            }
        };

        self.answers = self.decode(raw);
        let dropped = self.answers.retain_known(paper);
        if dropped > 0 {
            tracing::warn!(exam_id = %self.exam_id, dropped, "ignored cached answers for unknown questions");
        }
        self.answers.len()
    }

    /// Remove persisted answers and the started marker for this exam.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the store cannot be written.
    pub async fn clear(&mut self) -> Result<(), StorageError> {
        self.answers.clear();
        self.store_unread = false;
        self.store
            .remove_item(&StorageKey::answers(self.exam_id))
            .await?;
        self.store
            .remove_item(&StorageKey::started(self.exam_id))
            .await
    }

    /// # Errors
    ///
    /// Returns `StorageError` if the marker cannot be written.
    pub async fn mark_started(&self) -> Result<(), StorageError> {
        self.store
            .set_item(&StorageKey::started(self.exam_id), STARTED_MARKER)
            .await
    }

    /// Whether an attempt was started for this exam in an earlier page load.
    ///
    /// Read failures count as "not started".
    pub async fn is_started(&self) -> bool {
        match self.store.get_item(&StorageKey::started(self.exam_id)).await {
            Ok(value) => value.as_deref() == Some(STARTED_MARKER),
            Err(err) => {
                tracing::warn!(exam_id = %self.exam_id, error = %err, "could not read started marker");
                false
            }
        }
    }

    /// Corrupt data decodes to an empty set.
    fn decode(&self, raw: Option<String>) -> AnswerSet {
        raw.map(|raw| AnswersRecord::from_json(&raw).and_then(AnswersRecord::into_answers))
            .transpose()
            .unwrap_or_else(|err| {
                tracing::warn!(exam_id = %self.exam_id, error = %err, "discarding corrupt cached answers");
                None
            })
            .unwrap_or_default()
    }

    /// Fill gaps in the in-memory set from stored answers that an earlier
    /// read missed. Choices made in memory win.
    async fn merge_unread_store(&mut self, paper: &ExamPaper) -> Result<(), StorageError> {
        if !self.store_unread {
            return Ok(());
        }
        let raw = self
            .store
            .get_item(&StorageKey::answers(self.exam_id))
            .await?;
        let stored = self.decode(raw);
        let mut merged = 0;
        for (question, option) in stored.iter() {
            if self.answers.get(question).is_none()
                && self.answers.record(paper, question, option.clone()).is_ok()
            {
                merged += 1;
            }
        }
        self.store_unread = false;
        tracing::info!(exam_id = %self.exam_id, merged, "merged stored answers after an earlier read failure");
        Ok(())
    }

    async fn persist(&self) -> Result<(), StorageError> {
        let json = AnswersRecord::from_answers(&self.answers).to_json()?;
        self.store
            .set_item(&StorageKey::answers(self.exam_id), &json)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use exam_core::model::{ExamInfo, Question};
    use storage::repository::InMemoryRepository;

    /// In-memory store whose reads can be made to fail.
    #[derive(Default)]
    struct FlakyStore {
        inner: InMemoryRepository,
        fail_reads: AtomicBool,
    }

    #[async_trait]
    impl LocalStateRepository for FlakyStore {
        async fn get_item(&self, key: &StorageKey) -> Result<Option<String>, StorageError> {
            if self.fail_reads.load(Ordering::SeqCst) {
                return Err(StorageError::Connection("disk unavailable".into()));
            }
            self.inner.get_item(key).await
        }

        async fn set_item(&self, key: &StorageKey, value: &str) -> Result<(), StorageError> {
            self.inner.set_item(key, value).await
        }

        async fn remove_item(&self, key: &StorageKey) -> Result<(), StorageError> {
            self.inner.remove_item(key).await
        }
    }

    fn paper() -> ExamPaper {
        let questions = (1..=3)
            .map(|id| {
                Question::new(
                    QuestionId::new(id),
                    format!("Q{id}"),
                    vec!["a".into(), "b".into(), "c".into()],
                )
                .unwrap()
            })
            .collect();
        ExamPaper::new(ExamInfo::default(), questions).unwrap()
    }

    fn opt(raw: &str) -> OptionId {
        OptionId::new(raw).unwrap()
    }

    #[tokio::test]
    async fn recorded_answers_survive_reload() {
        let repo = InMemoryRepository::new();
        let paper = paper();
        let mut cache = AnswerCache::new(ExamId::new(1), Arc::new(repo.clone()));

        let sequence = [(1, "A"), (2, "C"), (1, "B"), (3, "A"), (2, "B")];
        for (q, o) in sequence {
            cache
                .record_answer(&paper, QuestionId::new(q), opt(o))
                .await
                .unwrap();
        }

        let mut reloaded = AnswerCache::new(ExamId::new(1), Arc::new(repo));
        assert_eq!(reloaded.load_cached(&paper).await, 3);
        assert_eq!(reloaded.answers(), cache.answers());
    }

    #[tokio::test]
    async fn corrupt_cache_loads_as_empty() {
        let repo = InMemoryRepository::new();
        repo.set_item(&StorageKey::answers(ExamId::new(1)), "{oops")
            .await
            .unwrap();

        let mut cache = AnswerCache::new(ExamId::new(1), Arc::new(repo));
        assert_eq!(cache.load_cached(&paper()).await, 0);
        assert!(cache.answers().is_empty());
    }

    #[tokio::test]
    async fn caches_do_not_leak_between_exams() {
        let repo = InMemoryRepository::new();
        let paper = paper();
        let mut first = AnswerCache::new(ExamId::new(1), Arc::new(repo.clone()));
        first
            .record_answer(&paper, QuestionId::new(1), opt("A"))
            .await
            .unwrap();

        let mut second = AnswerCache::new(ExamId::new(2), Arc::new(repo));
        assert_eq!(second.load_cached(&paper).await, 0);
    }

    #[tokio::test]
    async fn clear_removes_answers_and_started_marker() {
        let repo = InMemoryRepository::new();
        let paper = paper();
        let mut cache = AnswerCache::new(ExamId::new(4), Arc::new(repo.clone()));
        cache.mark_started().await.unwrap();
        cache
            .record_answer(&paper, QuestionId::new(2), opt("B"))
            .await
            .unwrap();
        assert!(cache.is_started().await);

        cache.clear().await.unwrap();
        assert!(!cache.is_started().await);
        assert!(cache.answers().is_empty());
        assert_eq!(
            repo.get_item(&StorageKey::answers(ExamId::new(4)))
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn invalid_choice_is_not_persisted() {
        let repo = InMemoryRepository::new();
        let mut cache = AnswerCache::new(ExamId::new(1), Arc::new(repo.clone()));
        let err = cache
            .record_answer(&paper(), QuestionId::new(1), opt("D"))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Answer(_)));
        assert_eq!(
            repo.get_item(&StorageKey::answers(ExamId::new(1)))
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn failed_read_does_not_overwrite_stored_answers() {
        let paper = paper();
        let store = Arc::new(FlakyStore::default());
        let key = StorageKey::answers(ExamId::new(1));
        store.inner.set_item(&key, r#"{"1":"A","2":"B"}"#).await.unwrap();

        store.fail_reads.store(true, Ordering::SeqCst);
        let mut cache = AnswerCache::new(ExamId::new(1), store.clone());
        assert_eq!(cache.load_cached(&paper).await, 0);

        // Still unreadable: the choice stays in memory, the store is untouched.
        let err = cache
            .record_answer(&paper, QuestionId::new(3), opt("C"))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Storage(_)));
        assert_eq!(
            store.inner.get_item(&key).await.unwrap().as_deref(),
            Some(r#"{"1":"A","2":"B"}"#)
        );

        // Readable again: stored answers are merged, newer choices win.
        store.fail_reads.store(false, Ordering::SeqCst);
        cache
            .record_answer(&paper, QuestionId::new(2), opt("C"))
            .await
            .unwrap();
        assert_eq!(cache.answers().len(), 3);
        assert_eq!(cache.answers().get(QuestionId::new(1)), Some(&opt("A")));
        assert_eq!(cache.answers().get(QuestionId::new(2)), Some(&opt("C")));

        let mut reloaded = AnswerCache::new(ExamId::new(1), store);
        assert_eq!(reloaded.load_cached(&paper).await, 3);
        assert_eq!(reloaded.answers(), cache.answers());
    }
}
