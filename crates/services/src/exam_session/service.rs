use exam_core::model::{
    AnswerSet, Attempt, AttemptPhase, ExamId, ExamPaper, QuestionId, Submission, SubmitTrigger,
};
use exam_core::{Countdown, Tick};

use crate::answer_cache::AnswerCache;
use crate::error::{ApiError, SessionError};

use super::progress::SessionProgress;

//
// ─── SUPPORT TYPES ─────────────────────────────────────────────────────────────
//

/// Network request currently outstanding for this session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InFlight {
    Starting,
    Submitting(SubmitTrigger),
}

/// Handed out by `begin_start`; tells the workflow what to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StartTicket {
    pub exam_id: ExamId,
    pub needs_paper: bool,
}

/// Unanswered questions the learner must acknowledge before submitting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnansweredNotice {
    pub unanswered: Vec<QuestionId>,
}

impl UnansweredNotice {
    #[must_use]
    pub fn count(&self) -> usize {
        self.unanswered.len()
    }

    /// Prompt shown in the confirmation dialog.
    #[must_use]
    pub fn message(&self) -> String {
        let n = self.count();
        let noun = if n == 1 { "question" } else { "questions" };
        format!("You have {n} unanswered {noun}. Are you sure you want to submit?")
    }
}

/// Outcome of checking a submission before sending it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitPreflight {
    Ready,
    NeedsConfirmation(UnansweredNotice),
}

/// What a tick did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionTick {
    Running { remaining: u32, near_expiry: bool },
    /// Time ran out; a mandatory submission must follow.
    Expired,
    /// Time ran out while a submission was already in flight.
    ExpiredWhileSubmitting,
    Idle,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// Client-side state of one exam attempt.
///
/// Owns the countdown, the answer cache and the question paper. Network
/// calls happen outside the session: `begin_*` methods set the busy flag and
/// hand out what to send, the workflow awaits the backend, then feeds the
/// result back in.
pub struct ExamSession {
    exam_id: ExamId,
    phase: AttemptPhase,
    paper: Option<ExamPaper>,
    attempt: Option<Attempt>,
    countdown: Countdown,
    cache: AnswerCache,
    in_flight: Option<InFlight>,
    resume_pending: bool,
    last_error: Option<String>,
    completion_message: Option<String>,
}

impl ExamSession {
    pub(crate) fn new(exam_id: ExamId, cache: AnswerCache, warning_secs: u32) -> Self {
        Self {
            exam_id,
            phase: AttemptPhase::Instructions,
            paper: None,
            attempt: None,
            countdown: Countdown::new(warning_secs),
            cache,
            in_flight: None,
            resume_pending: false,
            last_error: None,
            completion_message: None,
        }
    }

    #[must_use]
    pub fn exam_id(&self) -> ExamId {
        self.exam_id
    }

    #[must_use]
    pub fn phase(&self) -> AttemptPhase {
        self.phase
    }

    #[must_use]
    pub fn paper(&self) -> Option<&ExamPaper> {
        self.paper.as_ref()
    }

    #[must_use]
    pub fn attempt(&self) -> Option<&Attempt> {
        self.attempt.as_ref()
    }

    #[must_use]
    pub fn answers(&self) -> &AnswerSet {
        self.cache.answers()
    }

    #[must_use]
    pub fn countdown(&self) -> &Countdown {
        &self.countdown
    }

    #[must_use]
    pub fn remaining_secs(&self) -> u32 {
        self.countdown.remaining()
    }

    #[must_use]
    pub fn in_flight(&self) -> Option<InFlight> {
        self.in_flight
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    /// An earlier page load started this exam; the UI should resume without
    /// showing instructions.
    #[must_use]
    pub fn resume_pending(&self) -> bool {
        self.resume_pending
    }

    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn dismiss_error(&mut self) {
        self.last_error = None;
    }

    #[must_use]
    pub fn completion_message(&self) -> Option<&str> {
        self.completion_message.as_deref()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.phase == AttemptPhase::Completed
    }

    /// Leaving now would lose answers that were never submitted.
    #[must_use]
    pub fn has_unsaved_changes(&self) -> bool {
        !self.is_complete() && !self.cache.answers().is_empty()
    }

    /// Time is up but the submission has not gone through; the learner must
    /// retry manually.
    #[must_use]
    pub fn needs_submit_retry(&self) -> bool {
        self.phase.is_active() && self.countdown.is_expired() && !self.is_busy()
    }

    /// The countdown reached zero; answers are frozen and any submission is
    /// the mandatory one.
    #[must_use]
    pub fn is_time_up(&self) -> bool {
        self.countdown.is_expired()
    }

    /// Returns a summary of the current progress.
    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let total = self.paper.as_ref().map_or(0, ExamPaper::len);
        let answered = self.cache.answers().len();
        SessionProgress {
            total,
            answered,
            unanswered: total.saturating_sub(answered),
            remaining_secs: self.countdown.remaining(),
            near_expiry: self.countdown.is_near_expiry(),
        }
    }

    //
    // ─── START ─────────────────────────────────────────────────────────────────
    //

    pub(crate) fn set_resume_pending(&mut self, pending: bool) {
        self.resume_pending = pending;
    }

    /// Claim the start request.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Busy` while another request is in flight, or
    /// `SessionError::AlreadyStarted` once the exam left the instructions.
    pub fn begin_start(&mut self) -> Result<StartTicket, SessionError> {
        if self.is_busy() {
            return Err(SessionError::Busy);
        }
        if self.phase != AttemptPhase::Instructions {
            return Err(SessionError::AlreadyStarted);
        }
        self.in_flight = Some(InFlight::Starting);
        self.last_error = None;
        Ok(StartTicket {
            exam_id: self.exam_id,
            needs_paper: self.paper.is_none(),
        })
    }

    /// Record a failed start. The session stays on the instructions.
    pub(crate) fn abort_start(&mut self, err: &ApiError) {
        if self.in_flight == Some(InFlight::Starting) {
            self.in_flight = None;
        }
        self.last_error = Some(err.to_string());
    }

    /// Keep a fetched paper even if the attempt request then fails, so a
    /// retry only repeats the attempt call.
    pub(crate) fn store_paper(&mut self, paper: ExamPaper) {
        self.paper = Some(paper);
    }

    /// Enter the active phase with the backend's remaining time.
    pub(crate) fn activate(&mut self, attempt: Attempt) -> Result<(), SessionError> {
        self.phase.advance(AttemptPhase::Active)?;
        self.in_flight = None;
        self.resume_pending = false;
        self.countdown.start(attempt.remaining_secs());
        self.attempt = Some(attempt);
        Ok(())
    }

    /// Check that a choice may be recorded right now.
    ///
    /// # Errors
    ///
    /// Returns a phase error outside the active phase, `SessionError::Busy`
    /// while submitting, or `SessionError::TimeUp` once the countdown expired.
    pub fn ensure_answerable(&self) -> Result<(), SessionError> {
        match self.phase {
            AttemptPhase::Instructions => return Err(SessionError::NotActive),
            AttemptPhase::Completed => return Err(SessionError::Completed),
            AttemptPhase::Active => {}
        }
        if matches!(self.in_flight, Some(InFlight::Submitting(_))) {
            return Err(SessionError::Busy);
        }
        if self.is_time_up() {
            return Err(SessionError::TimeUp);
        }
        Ok(())
    }

    pub(crate) fn parts_mut(&mut self) -> (Option<&ExamPaper>, &mut AnswerCache) {
        (self.paper.as_ref(), &mut self.cache)
    }

    //
    // ─── TICK ──────────────────────────────────────────────────────────────────
    //

    /// Advance the countdown by one second.
    pub fn tick(&mut self) -> SessionTick {
        if !self.phase.is_active() {
            return SessionTick::Idle;
        }
        match self.countdown.tick() {
            Tick::Running(remaining) => SessionTick::Running {
                remaining,
                near_expiry: self.countdown.is_near_expiry(),
            },
            Tick::Expired if matches!(self.in_flight, Some(InFlight::Submitting(_))) => {
                SessionTick::ExpiredWhileSubmitting
            }
            Tick::Expired => SessionTick::Expired,
            Tick::Idle => SessionTick::Idle,
        }
    }

    //
    // ─── SUBMIT ────────────────────────────────────────────────────────────────
    //

    fn active_paper(&self) -> Result<&ExamPaper, SessionError> {
        match self.phase {
            AttemptPhase::Instructions => Err(SessionError::NotActive),
            AttemptPhase::Completed => Err(SessionError::Completed),
            AttemptPhase::Active => self.paper.as_ref().ok_or(SessionError::NotActive),
        }
    }

    /// After expiry every submission is the mandatory timer submission,
    /// whoever pressed the button.
    fn effective_trigger(&self, trigger: SubmitTrigger) -> SubmitTrigger {
        if self.is_time_up() {
            SubmitTrigger::TimerExpiry
        } else {
            trigger
        }
    }

    /// Check whether submitting now needs the learner's confirmation.
    ///
    /// Never asks once time is up.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotActive` or `SessionError::Completed` outside
    /// the active phase.
    pub fn preflight(&self, trigger: SubmitTrigger) -> Result<SubmitPreflight, SessionError> {
        let paper = self.active_paper()?;
        let unanswered = self.cache.answers().unanswered(paper);
        if self.effective_trigger(trigger).may_confirm() && !unanswered.is_empty() {
            return Ok(SubmitPreflight::NeedsConfirmation(UnansweredNotice {
                unanswered,
            }));
        }
        Ok(SubmitPreflight::Ready)
    }

    /// Claim the submission and build its payload.
    ///
    /// `confirmed` records that the learner accepted submitting with gaps;
    /// it is ignored for timer expiry.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Busy` while another request is in flight,
    /// `SessionError::ConfirmationRequired` for an unconfirmed incomplete user
    /// submission, or a phase error outside the active phase.
    pub fn begin_submit(
        &mut self,
        trigger: SubmitTrigger,
        confirmed: bool,
    ) -> Result<Submission, SessionError> {
        if self.is_busy() {
            return Err(SessionError::Busy);
        }
        let trigger = self.effective_trigger(trigger);
        if let SubmitPreflight::NeedsConfirmation(notice) = self.preflight(trigger)? {
            if !confirmed {
                return Err(SessionError::ConfirmationRequired {
                    unanswered: notice.count(),
                });
            }
        }
        let paper = self.active_paper()?;
        let submission = Submission::build(self.exam_id, paper, self.cache.answers());
        self.in_flight = Some(InFlight::Submitting(trigger));
        self.last_error = None;
        Ok(submission)
    }

    /// Record a rejected submission. Answers and phase stay as they were.
    pub(crate) fn fail_submit(&mut self, err: &ApiError) {
        if matches!(self.in_flight, Some(InFlight::Submitting(_))) {
            self.in_flight = None;
        }
        self.last_error = Some(err.to_string());
    }

    /// Mark the attempt finished after the backend accepted it.
    pub(crate) fn complete(&mut self, message: Option<String>) -> Result<(), SessionError> {
        self.phase.advance(AttemptPhase::Completed)?;
        self.countdown.stop();
        self.in_flight = None;
        self.completion_message = message;
        Ok(())
    }

    pub(crate) fn cache_mut(&mut self) -> &mut AnswerCache {
        &mut self.cache
    }
}
