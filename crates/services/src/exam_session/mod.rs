mod progress;
mod service;
mod workflow;

// Public API of the exam session subsystem.
pub use crate::error::SessionError;
pub use progress::SessionProgress;
pub use service::{
    ExamSession, InFlight, SessionTick, StartTicket, SubmitPreflight, UnansweredNotice,
};
pub use workflow::{
    ConfirmSubmit, ExamSessionService, StartOutcome, StartResponse, SubmitOutcome, TickReport,
};
