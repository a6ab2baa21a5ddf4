use serde::Serialize;

use crate::model::answers::AnswerSet;
use crate::model::ids::{ExamId, OptionId, QuestionId};
use crate::model::question::ExamPaper;

/// What caused a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitTrigger {
    /// The learner pressed submit.
    User,
    /// The countdown reached zero.
    TimerExpiry,
}

impl SubmitTrigger {
    /// Only learner-initiated submissions ask before sending with gaps.
    #[must_use]
    pub fn may_confirm(self) -> bool {
        matches!(self, SubmitTrigger::User)
    }
}

/// One row of the submission payload. `None` marks an unanswered question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionEntry {
    pub question_id: QuestionId,
    pub selected_option: Option<OptionId>,
}

/// Wire payload for the submit endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Submission {
    pub exam_id: ExamId,
    pub answers: Vec<SubmissionEntry>,
}

impl Submission {
    /// Join the answer set against the paper: one entry per question.
    #[must_use]
    pub fn build(exam_id: ExamId, paper: &ExamPaper, answers: &AnswerSet) -> Self {
        let answers = paper
            .questions()
            .iter()
            .map(|q| SubmissionEntry {
                question_id: q.id(),
                selected_option: answers.get(q.id()).cloned(),
            })
            .collect();
        Self { exam_id, answers }
    }

    #[must_use]
    pub fn unanswered_count(&self) -> usize {
        self.answers
            .iter()
            .filter(|entry| entry.selected_option.is_none())
            .count()
    }
}
