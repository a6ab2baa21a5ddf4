mod exam_vm;
mod time_fmt;

pub use exam_vm::{ExamScreenVm, OptionVm, QuestionVm, ScreenPhase, map_exam_screen};
pub use time_fmt::{format_clock, format_duration_minutes, format_started_at};
