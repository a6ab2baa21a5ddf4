mod answers;
mod attempt;
mod ids;
mod question;
mod submission;

pub use ids::{ExamId, OptionId, ParseIdError, QuestionId};

pub use answers::{AnswerError, AnswerSet};
pub use attempt::{Attempt, AttemptPhase, PhaseError};
pub use question::{ExamInfo, ExamPaper, PaperError, Question};
pub use submission::{Submission, SubmissionEntry, SubmitTrigger};
