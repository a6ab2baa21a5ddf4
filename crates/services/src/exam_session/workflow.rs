use std::sync::Arc;

use exam_core::model::{
    Attempt, ExamId, ExamPaper, OptionId, QuestionId, Submission, SubmitTrigger,
};
use storage::repository::LocalStateRepository;
use tokio::sync::Mutex;

use crate::Clock;
use crate::answer_cache::AnswerCache;
use crate::api::{AttemptStart, ExamApi, SubmitReceipt};
use crate::config::SessionConfig;
use crate::error::{ApiError, SessionError};

use super::service::{ExamSession, SessionTick, StartTicket, SubmitPreflight, UnansweredNotice};

/// Blocking yes/no decision shown before an incomplete user submission.
pub trait ConfirmSubmit {
    fn confirm(&self, notice: &UnansweredNotice) -> bool;
}

impl<F> ConfirmSubmit for F
where
    F: Fn(&UnansweredNotice) -> bool,
{
    fn confirm(&self, notice: &UnansweredNotice) -> bool {
        self(notice)
    }
}

/// Backend replies gathered for a start request.
#[derive(Debug)]
pub struct StartResponse {
    pub paper: Option<ExamPaper>,
    pub attempt: Result<AttemptStart, ApiError>,
}

/// Result of a successful start or resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartOutcome {
    pub remaining_secs: u32,
    pub restored_answers: usize,
    /// An earlier page load had already started this exam.
    pub resumed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Submitted { message: Option<String> },
    /// The learner backed out of the confirmation prompt.
    Declined,
}

/// What a timer pulse led to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickReport {
    Running { remaining: u32, near_expiry: bool },
    AutoSubmitted(SubmitOutcome),
    /// Time ran out while a submission was outstanding; nothing new was sent.
    ExpiredWhileBusy,
    Idle,
}

/// Orchestrates attempt start, answering, ticking and submission.
#[derive(Clone)]
pub struct ExamSessionService {
    clock: Clock,
    api: Arc<dyn ExamApi>,
    local_state: Arc<dyn LocalStateRepository>,
    config: SessionConfig,
}

impl ExamSessionService {
    #[must_use]
    pub fn new(
        clock: Clock,
        api: Arc<dyn ExamApi>,
        local_state: Arc<dyn LocalStateRepository>,
    ) -> Self {
        Self {
            clock,
            api,
            local_state,
            config: SessionConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Prepare a session on the instructions view.
    ///
    /// Checks the started marker so the caller can resume without showing
    /// instructions again.
    pub async fn open(&self, exam_id: ExamId) -> ExamSession {
        let cache = AnswerCache::new(exam_id, Arc::clone(&self.local_state));
        let started = cache.is_started().await;
        let mut session = ExamSession::new(exam_id, cache, self.config.warning_secs);
        session.set_resume_pending(started);
        if started {
            tracing::info!(exam_id = %exam_id, "found a started attempt, resuming");
        }
        session
    }

    //
    // ─── START ─────────────────────────────────────────────────────────────────
    //

    /// Fetch the paper (if needed) and the attempt's remaining time.
    ///
    /// Both calls are safe to repeat and are retried while the server is
    /// unavailable.
    pub async fn fetch_start(&self, ticket: StartTicket) -> StartResponse {
        let api = self.api.as_ref();
        let paper = if ticket.needs_paper {
            match self
                .config
                .retry
                .run("fetch_paper", || api.fetch_paper(ticket.exam_id))
                .await
            {
                Ok(paper) => Some(paper),
                Err(err) => {
                    return StartResponse {
                        paper: None,
                        attempt: Err(err),
                    };
                }
            }
        } else {
            None
        };
        let attempt = self
            .config
            .retry
            .run("start_attempt", || api.start_attempt(ticket.exam_id))
            .await;
        StartResponse { paper, attempt }
    }

    /// Apply the start replies: activate, start the countdown, restore
    /// cached answers and set the started marker.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Api` if the backend refused or could not be
    /// reached; the session stays on the instructions view.
    pub async fn finish_start(
        &self,
        session: &mut ExamSession,
        response: StartResponse,
    ) -> Result<StartOutcome, SessionError> {
        if let Some(paper) = response.paper {
            session.store_paper(paper);
        }
        let start = match response.attempt {
            Ok(start) => start,
            Err(err) => {
                tracing::warn!(exam_id = %session.exam_id(), error = %err, "could not start exam");
                session.abort_start(&err);
                return Err(err.into());
            }
        };
        if session.paper().is_none() {
            let err = ApiError::Decode("exam paper missing".into());
            session.abort_start(&err);
            return Err(err.into());
        }

        let resumed = session.resume_pending();
        let exam_id = session.exam_id();
        session.activate(Attempt::new(exam_id, start.remaining_secs, self.clock.now()))?;

        let (paper, cache) = session.parts_mut();
        let restored_answers = match paper {
            Some(paper) => cache.load_cached(paper).await,
            None => 0,
        };
        if let Err(err) = cache.mark_started().await {
            tracing::warn!(exam_id = %exam_id, error = %err, "could not store started marker");
        }

        tracing::info!(
            exam_id = %exam_id,
            remaining_secs = start.remaining_secs,
            restored_answers,
            resumed,
            "exam attempt active"
        );
        Ok(StartOutcome {
            remaining_secs: start.remaining_secs,
            restored_answers,
            resumed,
        })
    }

    /// Create or resume the attempt and enter the active phase.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Busy` or `SessionError::AlreadyStarted` when a
    /// start is not possible, or `SessionError::Api` when the backend fails.
    pub async fn start_or_resume(
        &self,
        session: &mut ExamSession,
    ) -> Result<StartOutcome, SessionError> {
        let ticket = session.begin_start()?;
        let response = self.fetch_start(ticket).await;
        self.finish_start(session, response).await
    }

    //
    // ─── ANSWERS ───────────────────────────────────────────────────────────────
    //

    /// Record a choice and mirror the answer set to local state.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` outside the active phase, while submitting,
    /// after time is up, for choices not on the paper, or if local state cannot be written (the
    /// choice is kept in memory in that case).
    pub async fn record_answer(
        &self,
        session: &mut ExamSession,
        question: QuestionId,
        option: OptionId,
    ) -> Result<(), SessionError> {
        session.ensure_answerable()?;
        let (paper, cache) = session.parts_mut();
        let paper = paper.ok_or(SessionError::NotActive)?;
        cache.record_answer(paper, question, option).await
    }

    //
    // ─── SUBMIT ────────────────────────────────────────────────────────────────
    //

    /// Send one submission. Never retried automatically.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` for transport failures or backend rejections.
    pub async fn send_submission(&self, submission: &Submission) -> Result<SubmitReceipt, ApiError> {
        tracing::info!(
            exam_id = %submission.exam_id,
            unanswered = submission.unanswered_count(),
            "submitting exam"
        );
        self.api.submit(submission).await
    }

    /// Apply the submission reply.
    ///
    /// On success the cache is cleared, the countdown stopped and the session
    /// completed. On failure answers and phase are kept so the learner can
    /// retry.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Api` when the submission failed.
    pub async fn finish_submit(
        &self,
        session: &mut ExamSession,
        result: Result<SubmitReceipt, ApiError>,
    ) -> Result<SubmitOutcome, SessionError> {
        match result {
            Ok(receipt) => {
                session.complete(receipt.message.clone())?;
                if let Err(err) = session.cache_mut().clear().await {
                    tracing::warn!(exam_id = %session.exam_id(), error = %err, "could not clear cached answers");
                }
                tracing::info!(exam_id = %session.exam_id(), "exam submitted");
                Ok(SubmitOutcome::Submitted {
                    message: receipt.message,
                })
            }
            Err(err) => {
                tracing::error!(exam_id = %session.exam_id(), error = %err, "exam submission failed");
                session.fail_submit(&err);
                Err(err.into())
            }
        }
    }

    /// Submit on the learner's request, asking `confirm` first when
    /// questions are unanswered. Once time is up nothing is asked.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` when no submission is possible or the backend
    /// rejects it.
    pub async fn submit<C: ConfirmSubmit>(
        &self,
        session: &mut ExamSession,
        trigger: SubmitTrigger,
        confirm: &C,
    ) -> Result<SubmitOutcome, SessionError> {
        if session.is_busy() {
            return Err(SessionError::Busy);
        }
        let confirmed = match session.preflight(trigger)? {
            SubmitPreflight::Ready => false,
            SubmitPreflight::NeedsConfirmation(notice) => {
                if !confirm.confirm(&notice) {
                    tracing::info!(exam_id = %session.exam_id(), unanswered = notice.count(), "submission declined");
                    return Ok(SubmitOutcome::Declined);
                }
                true
            }
        };
        let submission = session.begin_submit(trigger, confirmed)?;
        let result = self.send_submission(&submission).await;
        self.finish_submit(session, result).await
    }

    //
    // ─── TIMER ─────────────────────────────────────────────────────────────────
    //

    /// Advance the countdown by one second; on expiry submit without asking.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Api` when the automatic submission fails. The
    /// session then reports `needs_submit_retry`.
    pub async fn tick(&self, session: &mut ExamSession) -> Result<TickReport, SessionError> {
        let submission = match self.expire_or_report(session)? {
            Ok(report) => return Ok(report),
            Err(submission) => submission,
        };
        let result = self.send_submission(&submission).await;
        self.finish_submit(session, result)
            .await
            .map(TickReport::AutoSubmitted)
    }

    /// `Ok(report)` when nothing needs sending, `Err(payload)` when time ran out.
    fn expire_or_report(
        &self,
        session: &mut ExamSession,
    ) -> Result<Result<TickReport, Submission>, SessionError> {
        Ok(match session.tick() {
            SessionTick::Running {
                remaining,
                near_expiry,
            } => Ok(TickReport::Running {
                remaining,
                near_expiry,
            }),
            SessionTick::Idle => Ok(TickReport::Idle),
            SessionTick::ExpiredWhileSubmitting => Ok(TickReport::ExpiredWhileBusy),
            SessionTick::Expired => {
                tracing::info!(exam_id = %session.exam_id(), "time is up, submitting");
                if session.is_busy() {
                    return Ok(Ok(TickReport::ExpiredWhileBusy));
                }
                Err(session.begin_submit(SubmitTrigger::TimerExpiry, false)?)
            }
        })
    }

    //
    // ─── SHARED SESSIONS ───────────────────────────────────────────────────────
    //
    // The UI keeps its session behind a mutex. These variants release the
    // lock while waiting on the backend so timer pulses keep flowing.

    /// # Errors
    ///
    /// See [`ExamSessionService::start_or_resume`].
    pub async fn start_shared(
        &self,
        session: &Mutex<ExamSession>,
    ) -> Result<StartOutcome, SessionError> {
        let ticket = session.lock().await.begin_start()?;
        let response = self.fetch_start(ticket).await;
        let mut guard = session.lock().await;
        self.finish_start(&mut guard, response).await
    }

    /// # Errors
    ///
    /// See [`ExamSessionService::record_answer`].
    pub async fn record_answer_shared(
        &self,
        session: &Mutex<ExamSession>,
        question: QuestionId,
        option: OptionId,
    ) -> Result<(), SessionError> {
        let mut guard = session.lock().await;
        self.record_answer(&mut guard, question, option).await
    }

    /// Submit after the caller has already settled confirmation.
    ///
    /// # Errors
    ///
    /// See [`ExamSession::begin_submit`] and [`ExamSessionService::finish_submit`].
    pub async fn submit_shared(
        &self,
        session: &Mutex<ExamSession>,
        trigger: SubmitTrigger,
        confirmed: bool,
    ) -> Result<SubmitOutcome, SessionError> {
        let submission = session.lock().await.begin_submit(trigger, confirmed)?;
        let result = self.send_submission(&submission).await;
        let mut guard = session.lock().await;
        self.finish_submit(&mut guard, result).await
    }

    /// # Errors
    ///
    /// See [`ExamSessionService::tick`].
    pub async fn tick_shared(&self, session: &Mutex<ExamSession>) -> Result<TickReport, SessionError> {
        self.tick_shared_with(session, || {}).await
    }

    /// Like [`ExamSessionService::tick_shared`], calling `on_time_up` once
    /// the countdown expired and before the automatic submission is sent.
    ///
    /// # Errors
    ///
    /// See [`ExamSessionService::tick`].
    pub async fn tick_shared_with<F: FnOnce()>(
        &self,
        session: &Mutex<ExamSession>,
        on_time_up: F,
    ) -> Result<TickReport, SessionError> {
        let submission = {
            let mut guard = session.lock().await;
            match self.expire_or_report(&mut guard)? {
                Ok(report) => return Ok(report),
                Err(submission) => submission,
            }
        };
        on_time_up();
        let result = self.send_submission(&submission).await;
        let mut guard = session.lock().await;
        self.finish_submit(&mut guard, result)
            .await
            .map(TickReport::AutoSubmitted)
    }
}
