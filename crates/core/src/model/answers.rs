use std::collections::BTreeMap;

use thiserror::Error;

use crate::model::ids::{OptionId, QuestionId};
use crate::model::question::ExamPaper;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AnswerError {
    #[error("question {0} is not part of this exam")]
    UnknownQuestion(QuestionId),

    #[error("question {question} has no option {option}")]
    UnknownOption {
        question: QuestionId,
        option: OptionId,
    },
}

/// The learner's in-progress choices, one per question.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerSet {
    choices: BTreeMap<QuestionId, OptionId>,
}

impl AnswerSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a choice after checking it against the paper.
    ///
    /// Overwrites any earlier choice for the same question.
    ///
    /// # Errors
    ///
    /// Returns `AnswerError` if the question or option is not on the paper.
    pub fn record(
        &mut self,
        paper: &ExamPaper,
        question: QuestionId,
        option: OptionId,
    ) -> Result<(), AnswerError> {
        let Some(q) = paper.question(question) else {
            return Err(AnswerError::UnknownQuestion(question));
        };
        if !q.has_option(&option) {
            return Err(AnswerError::UnknownOption { question, option });
        }
        self.choices.insert(question, option);
        Ok(())
    }

    /// Drop choices that do not belong to the paper.
    ///
    /// Returns how many entries were removed.
    pub fn retain_known(&mut self, paper: &ExamPaper) -> usize {
        let before = self.choices.len();
        self.choices.retain(|question, option| {
            paper
                .question(*question)
                .is_some_and(|q| q.has_option(option))
        });
        before - self.choices.len()
    }

    #[must_use]
    pub fn get(&self, question: QuestionId) -> Option<&OptionId> {
        self.choices.get(&question)
    }

    pub fn iter(&self) -> impl Iterator<Item = (QuestionId, &OptionId)> {
        self.choices.iter().map(|(q, o)| (*q, o))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.choices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.choices.is_empty()
    }

    /// Questions on the paper without a recorded choice, in paper order.
    #[must_use]
    pub fn unanswered(&self, paper: &ExamPaper) -> Vec<QuestionId> {
        paper
            .questions()
            .iter()
            .map(|q| q.id())
            .filter(|id| !self.choices.contains_key(id))
            .collect()
    }

    pub fn clear(&mut self) {
        self.choices.clear();
    }
}

impl FromIterator<(QuestionId, OptionId)> for AnswerSet {
    fn from_iter<T: IntoIterator<Item = (QuestionId, OptionId)>>(iter: T) -> Self {
        Self {
            choices: iter.into_iter().collect(),
        }
    }
}
