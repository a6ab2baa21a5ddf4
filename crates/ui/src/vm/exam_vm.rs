use exam_core::model::AttemptPhase;
use services::{ExamSession, InFlight};

use super::time_fmt::{format_clock, format_duration_minutes, format_started_at};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScreenPhase {
    Instructions,
    Active,
    Completed,
}

impl From<AttemptPhase> for ScreenPhase {
    fn from(phase: AttemptPhase) -> Self {
        match phase {
            AttemptPhase::Instructions => Self::Instructions,
            AttemptPhase::Active => Self::Active,
            AttemptPhase::Completed => Self::Completed,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OptionVm {
    /// Letter sent to the backend (`A`, `B`, ...).
    pub value: String,
    pub label: String,
    pub selected: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuestionVm {
    pub id: u64,
    pub number: usize,
    pub text: String,
    pub options: Vec<OptionVm>,
}

impl QuestionVm {
    #[must_use]
    pub fn is_answered(&self) -> bool {
        self.options.iter().any(|option| option.selected)
    }

    /// Radio group name; one group per question.
    #[must_use]
    pub fn input_name(&self) -> String {
        format!("question-{}", self.id)
    }
}

/// Everything the exam screen renders, flattened from an `ExamSession`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExamScreenVm {
    pub exam_id: u64,
    pub phase: ScreenPhase,
    pub title: String,
    pub subject: String,
    pub duration_label: Option<String>,
    pub started_label: Option<String>,
    pub timer_label: String,
    pub timer_warning: bool,
    pub questions: Vec<QuestionVm>,
    pub answered: usize,
    pub total: usize,
    pub starting: bool,
    pub submitting: bool,
    pub resuming: bool,
    pub error: Option<String>,
    pub needs_retry: bool,
    /// Answers can no longer change: submitting, or time is up.
    pub answers_locked: bool,
    pub leave_warning: bool,
    pub completion_message: Option<String>,
}

impl ExamScreenVm {
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.starting || self.submitting
    }

    #[must_use]
    pub fn progress_label(&self) -> String {
        format!("{} of {} answered", self.answered, self.total)
    }

    /// The timer switches style once the warning threshold is reached.
    #[must_use]
    pub fn timer_class(&self) -> &'static str {
        if self.timer_warning { "timer warning" } else { "timer" }
    }

    #[must_use]
    pub fn start_label(&self) -> &'static str {
        if self.starting {
            "Starting..."
        } else {
            "Start Exam"
        }
    }

    #[must_use]
    pub fn submit_label(&self) -> &'static str {
        if self.submitting {
            "Submitting..."
        } else if self.needs_retry {
            "Retry Submission"
        } else {
            "Submit Exam"
        }
    }
}

#[must_use]
pub fn map_exam_screen(session: &ExamSession) -> ExamScreenVm {
    let info = session.paper().map(|paper| paper.info().clone());
    let answers = session.answers();
    let questions = session
        .paper()
        .map(|paper| {
            paper
                .questions()
                .iter()
                .enumerate()
                .map(|(index, question)| {
                    let selected = answers.get(question.id());
                    QuestionVm {
                        id: question.id().value(),
                        number: index + 1,
                        text: question.text().to_string(),
                        options: question
                            .labelled_options()
                            .map(|(option, label)| OptionVm {
                                selected: selected == Some(&option),
                                value: option.as_str().to_string(),
                                label: label.to_string(),
                            })
                            .collect(),
                    }
                })
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();
    let progress = session.progress();
    let in_flight = session.in_flight();

    ExamScreenVm {
        exam_id: session.exam_id().value(),
        phase: session.phase().into(),
        title: info
            .as_ref()
            .map(|info| info.title.clone())
            .filter(|title| !title.trim().is_empty())
            .unwrap_or_else(|| format!("Exam {}", session.exam_id())),
        subject: info.as_ref().map(|info| info.subject.clone()).unwrap_or_default(),
        duration_label: info
            .as_ref()
            .filter(|info| info.duration > 0)
            .map(|info| format_duration_minutes(info.duration)),
        started_label: session
            .attempt()
            .map(|attempt| format_started_at(attempt.started_at())),
        timer_label: format_clock(progress.remaining_secs),
        timer_warning: session.phase().is_active() && progress.near_expiry,
        questions,
        answered: progress.answered,
        total: progress.total,
        starting: in_flight == Some(InFlight::Starting),
        submitting: matches!(in_flight, Some(InFlight::Submitting(_))),
        resuming: session.resume_pending() && session.phase() == AttemptPhase::Instructions,
        error: session.last_error().map(str::to_string),
        needs_retry: session.needs_submit_retry(),
        answers_locked: session.phase().is_active()
            && (session.is_time_up() || matches!(in_flight, Some(InFlight::Submitting(_)))),
        leave_warning: session.has_unsaved_changes(),
        completion_message: session.completion_message().map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use exam_core::model::{
        ExamId, ExamInfo, ExamPaper, OptionId, Question, QuestionId, Submission, SubmitTrigger,
    };
    use exam_core::time::fixed_now;
    use services::{ApiError, AttemptStart, Clock, ExamApi, ExamSessionService, SubmitReceipt};
    use storage::repository::InMemoryRepository;

    struct FixedApi;

    #[async_trait]
    impl ExamApi for FixedApi {
        async fn start_attempt(&self, _exam_id: ExamId) -> Result<AttemptStart, ApiError> {
            Ok(AttemptStart {
                remaining_secs: 301,
            })
        }

        async fn fetch_paper(&self, _exam_id: ExamId) -> Result<ExamPaper, ApiError> {
            let info = ExamInfo {
                title: "Chemistry".into(),
                duration: 20,
                subject: "Science".into(),
                total_questions: 2,
            };
            let questions = vec![
                Question::new(QuestionId::new(10), "H2O is?", vec!["Water".into(), "Salt".into()])?,
                Question::new(QuestionId::new(11), "NaCl is?", vec!["Water".into(), "Salt".into()])?,
            ];
            Ok(ExamPaper::new(info, questions)?)
        }

        async fn submit(&self, _submission: &Submission) -> Result<SubmitReceipt, ApiError> {
            Err(ApiError::Rejected {
                message: "duplicate submission".into(),
            })
        }
    }

    /// Same paper, one second left.
    struct OneSecondApi;

    #[async_trait]
    impl ExamApi for OneSecondApi {
        async fn start_attempt(&self, _exam_id: ExamId) -> Result<AttemptStart, ApiError> {
            Ok(AttemptStart { remaining_secs: 1 })
        }

        async fn fetch_paper(&self, exam_id: ExamId) -> Result<ExamPaper, ApiError> {
            FixedApi.fetch_paper(exam_id).await
        }

        async fn submit(&self, submission: &Submission) -> Result<SubmitReceipt, ApiError> {
            FixedApi.submit(submission).await
        }
    }

    fn service() -> ExamSessionService {
        ExamSessionService::new(
            Clock::fixed(fixed_now()),
            Arc::new(FixedApi),
            Arc::new(InMemoryRepository::new()),
        )
    }

    #[tokio::test]
    async fn instructions_screen_before_start() {
        let svc = service();
        let session = svc.open(ExamId::new(3)).await;
        let vm = map_exam_screen(&session);
        assert_eq!(vm.phase, ScreenPhase::Instructions);
        assert_eq!(vm.title, "Exam 3");
        assert!(vm.questions.is_empty());
        assert!(!vm.timer_warning);
        assert_eq!(vm.start_label(), "Start Exam");
    }

    #[tokio::test]
    async fn active_screen_marks_selection_and_warning() {
        let svc = service();
        let mut session = svc.open(ExamId::new(3)).await;
        svc.start_or_resume(&mut session).await.unwrap();
        svc.record_answer(&mut session, QuestionId::new(11), OptionId::new("B").unwrap())
            .await
            .unwrap();

        let vm = map_exam_screen(&session);
        assert_eq!(vm.phase, ScreenPhase::Active);
        assert_eq!(vm.title, "Chemistry");
        assert_eq!(vm.duration_label.as_deref(), Some("20 minutes"));
        assert_eq!(vm.started_label.as_deref(), Some("2023-11-14 22:13 UTC"));
        assert_eq!(vm.timer_label, "05:01");
        assert!(!vm.timer_warning);
        assert_eq!(vm.progress_label(), "1 of 2 answered");
        assert!(!vm.questions[0].is_answered());
        assert!(vm.questions[1].options[1].selected);
        assert_eq!(vm.questions[1].options[1].value, "B");
        assert!(vm.leave_warning);
        assert!(!vm.answers_locked);

        svc.tick(&mut session).await.unwrap();
        let vm = map_exam_screen(&session);
        assert_eq!(vm.timer_label, "05:00");
        assert!(vm.timer_warning);
    }

    #[tokio::test]
    async fn failed_submission_shows_error_and_keeps_answers() {
        let svc = service();
        let mut session = svc.open(ExamId::new(3)).await;
        svc.start_or_resume(&mut session).await.unwrap();
        svc.record_answer(&mut session, QuestionId::new(10), OptionId::new("A").unwrap())
            .await
            .unwrap();
        let _ = svc
            .submit(&mut session, SubmitTrigger::User, &|_: &services::UnansweredNotice| true)
            .await;

        let vm = map_exam_screen(&session);
        assert_eq!(vm.phase, ScreenPhase::Active);
        assert_eq!(vm.error.as_deref(), Some("duplicate submission"));
        assert_eq!(vm.answered, 1);
        assert!(!vm.submitting);
        assert!(!vm.answers_locked);
        assert_eq!(vm.submit_label(), "Submit Exam");
    }

    #[tokio::test]
    async fn failed_expiry_submission_locks_answers_and_offers_retry() {
        let svc = ExamSessionService::new(
            Clock::fixed(fixed_now()),
            Arc::new(OneSecondApi),
            Arc::new(InMemoryRepository::new()),
        );
        let mut session = svc.open(ExamId::new(3)).await;
        svc.start_or_resume(&mut session).await.unwrap();
        assert!(svc.tick(&mut session).await.is_err());

        let vm = map_exam_screen(&session);
        assert_eq!(vm.phase, ScreenPhase::Active);
        assert_eq!(vm.timer_label, "00:00");
        assert!(vm.needs_retry);
        assert!(vm.answers_locked);
        assert_eq!(vm.submit_label(), "Retry Submission");
    }
}
