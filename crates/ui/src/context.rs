use std::sync::Arc;

use exam_core::model::ExamId;
use services::ExamSessionService;

pub trait UiApp: Send + Sync {
    /// Exam opened when the app starts, if one was configured.
    fn launch_exam_id(&self) -> Option<ExamId>;

    fn exam_sessions(&self) -> Arc<ExamSessionService>;
}

#[derive(Clone)]
pub struct AppContext {
    launch_exam_id: Option<ExamId>,
    exam_sessions: Arc<ExamSessionService>,
}

impl AppContext {
    #[must_use]
    pub fn new(app: &Arc<dyn UiApp>) -> Self {
        Self {
            launch_exam_id: app.launch_exam_id(),
            exam_sessions: app.exam_sessions(),
        }
    }

    #[must_use]
    pub fn launch_exam_id(&self) -> Option<ExamId> {
        self.launch_exam_id
    }

    #[must_use]
    pub fn exam_sessions(&self) -> Arc<ExamSessionService> {
        Arc::clone(&self.exam_sessions)
    }
}

// This context is provided by the application composition root (e.g. `crates/app`).

/// Build an `AppContext` from a UI-facing app implementation.
#[must_use]
pub fn build_app_context(app: &Arc<dyn UiApp>) -> AppContext {
    AppContext::new(app)
}
