mod completed;
mod home;
mod leave;
mod state;
mod take_exam;

#[cfg(test)]
mod test_harness;
#[cfg(test)]
mod view_smoke;

pub use completed::CompletedView;
pub use home::HomeView;
pub use leave::{GuardedLink, LeaveGuard, LeaveGuardDialog};
pub use state::{Toast, ToastKind, ViewError, ViewState, view_state_from_resource};
pub use take_exam::TakeExamView;
