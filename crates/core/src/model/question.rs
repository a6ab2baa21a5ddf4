use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{OptionId, QuestionId};

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PaperError {
    #[error("question {0} has no options")]
    NoOptions(QuestionId),

    #[error("question {id} has {count} options, more than can be labelled")]
    TooManyOptions { id: QuestionId, count: usize },

    #[error("question {0} appears more than once")]
    DuplicateQuestion(QuestionId),
}

//
// ─── QUESTION ─────────────────────────────────────────────────────────────────
//

/// A read-only exam question as served by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    id: QuestionId,
    text: String,
    options: Vec<String>,
}

impl Question {
    /// # Errors
    ///
    /// Returns `PaperError::NoOptions` if `options` is empty, or
    /// `PaperError::TooManyOptions` if the options cannot all be lettered.
    pub fn new(
        id: QuestionId,
        text: impl Into<String>,
        options: Vec<String>,
    ) -> Result<Self, PaperError> {
        if options.is_empty() {
            return Err(PaperError::NoOptions(id));
        }
        if options.len() > OptionId::MAX_OPTIONS {
            return Err(PaperError::TooManyOptions {
                id,
                count: options.len(),
            });
        }
        Ok(Self {
            id,
            text: text.into(),
            options,
        })
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    /// Options paired with their letter, in display order.
    pub fn labelled_options(&self) -> impl Iterator<Item = (OptionId, &str)> {
        self.options
            .iter()
            .enumerate()
            .filter_map(|(idx, text)| OptionId::from_index(idx).map(|id| (id, text.as_str())))
    }

    #[must_use]
    pub fn has_option(&self, option: &OptionId) -> bool {
        option.index() < self.options.len()
    }
}

//
// ─── PAPER ────────────────────────────────────────────────────────────────────
//

/// Exam metadata returned alongside the questions.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExamInfo {
    pub title: String,
    /// Allotted time in minutes.
    pub duration: u32,
    pub subject: String,
    pub total_questions: u32,
}

/// The question list for one exam, in presentation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamPaper {
    info: ExamInfo,
    questions: Vec<Question>,
}

impl ExamPaper {
    /// # Errors
    ///
    /// Returns `PaperError::DuplicateQuestion` if two questions share an id.
    pub fn new(info: ExamInfo, questions: Vec<Question>) -> Result<Self, PaperError> {
        let mut seen = HashSet::with_capacity(questions.len());
        for question in &questions {
            if !seen.insert(question.id()) {
                return Err(PaperError::DuplicateQuestion(question.id()));
            }
        }
        Ok(Self { info, questions })
    }

    #[must_use]
    pub fn info(&self) -> &ExamInfo {
        &self.info
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn question(&self, id: QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| q.id() == id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}
