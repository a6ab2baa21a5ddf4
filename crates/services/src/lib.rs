#![forbid(unsafe_code)]

pub mod answer_cache;
pub mod api;
pub mod config;
pub mod error;
pub mod exam_session;
pub mod retry;
pub mod timer;

pub use exam_core::Clock;
pub use exam_session as session;

pub use answer_cache::AnswerCache;
pub use api::{AttemptStart, ExamApi, HttpExamApi, SubmitReceipt};
pub use config::{BackendConfig, Endpoints, SessionConfig};
pub use error::{ApiError, ConfigError, SessionError};
pub use retry::RetryPolicy;
pub use timer::TimerHandle;

pub use exam_session::{
    ConfirmSubmit, ExamSession, ExamSessionService, InFlight, SessionProgress, SessionTick,
    StartOutcome, StartResponse, StartTicket, SubmitOutcome, SubmitPreflight, TickReport,
    UnansweredNotice,
};
