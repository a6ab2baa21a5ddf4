use std::sync::Arc;

use async_trait::async_trait;
use dioxus::core::NoOpMutations;
use dioxus::prelude::*;
use dioxus_router::{Routable, Router};
use exam_core::model::{
    ExamId, ExamInfo, ExamPaper, Question, QuestionId, Submission,
};
use exam_core::time::fixed_now;
use services::{
    ApiError, AttemptStart, Clock, ExamApi, ExamSessionService, SubmitReceipt,
};
use storage::repository::Storage;

use crate::context::{UiApp, build_app_context};
use crate::views::{CompletedView, HomeView, LeaveGuard, TakeExamView};

/// Backend with one two-question exam.
pub struct StubApi;

#[async_trait]
impl ExamApi for StubApi {
    async fn start_attempt(&self, _exam_id: ExamId) -> Result<AttemptStart, ApiError> {
        Ok(AttemptStart {
            remaining_secs: 900,
        })
    }

    async fn fetch_paper(&self, _exam_id: ExamId) -> Result<ExamPaper, ApiError> {
        let info = ExamInfo {
            title: "Geography".into(),
            duration: 15,
            subject: "Humanities".into(),
            total_questions: 2,
        };
        let questions = vec![
            Question::new(
                QuestionId::new(1),
                "Capital of France?",
                vec!["Paris".into(), "Lyon".into()],
            )?,
            Question::new(
                QuestionId::new(2),
                "Longest river?",
                vec!["Nile".into(), "Amazon".into()],
            )?,
        ];
        Ok(ExamPaper::new(info, questions)?)
    }

    async fn submit(&self, _submission: &Submission) -> Result<SubmitReceipt, ApiError> {
        Ok(SubmitReceipt::default())
    }
}

#[derive(Clone)]
struct TestApp {
    launch_exam_id: Option<ExamId>,
    exam_sessions: Arc<ExamSessionService>,
}

impl UiApp for TestApp {
    fn launch_exam_id(&self) -> Option<ExamId> {
        self.launch_exam_id
    }

    fn exam_sessions(&self) -> Arc<ExamSessionService> {
        Arc::clone(&self.exam_sessions)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    Home,
    TakeExam(u64),
    Completed(u64),
}

#[derive(Props, Clone)]
struct ViewHarnessProps {
    app: Arc<TestApp>,
    view: ViewKind,
}

impl PartialEq for ViewHarnessProps {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

#[component]
fn ViewRouterHarness(props: ViewHarnessProps) -> Element {
    let app: Arc<dyn UiApp> = props.app.clone();
    use_context_provider(|| build_app_context(&app));
    use_context_provider(|| props.view);
    let guard = use_context_provider(|| Signal::new(LeaveGuard::default()));
    rsx! {
        Router::<TestRoute> {}
        if guard.read().is_armed() {
            span { class: "leave-guard-armed" }
        }
    }
}

#[derive(Clone, Routable, PartialEq)]
#[rustfmt::skip]
enum TestRoute {
    #[route("/")]
    Root {},
}

#[component]
fn Root() -> Element {
    let view = use_context::<ViewKind>();
    match view {
        ViewKind::Home => rsx! { HomeView {} },
        ViewKind::TakeExam(exam_id) => rsx! { TakeExamView { exam_id } },
        ViewKind::Completed(exam_id) => rsx! { CompletedView { exam_id } },
    }
}

pub struct ViewHarness {
    pub dom: VirtualDom,
    pub storage: Storage,
}

impl ViewHarness {
    pub fn rebuild(&mut self) {
        self.dom.rebuild_in_place();
        drive_dom(&mut self.dom);
    }

    pub async fn drive_async(&mut self) {
        let _ = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            self.dom.wait_for_work(),
        )
        .await;
        self.dom.render_immediate(&mut NoOpMutations);
        self.dom.process_events();
    }

    pub fn render(&self) -> String {
        dioxus_ssr::render(&self.dom)
    }
}

pub fn drive_dom(dom: &mut VirtualDom) {
    dom.process_events();
    dom.render_immediate(&mut NoOpMutations);
    dom.process_events();
}

pub fn setup_view_harness(view: ViewKind, launch_exam_id: Option<ExamId>) -> ViewHarness {
    let storage = Storage::in_memory();
    let exam_sessions = Arc::new(ExamSessionService::new(
        Clock::fixed(fixed_now()),
        Arc::new(StubApi),
        Arc::clone(&storage.local_state),
    ));
    let app = Arc::new(TestApp {
        launch_exam_id,
        exam_sessions,
    });
    let dom = VirtualDom::new_with_props(ViewRouterHarness, ViewHarnessProps { app, view });
    ViewHarness { dom, storage }
}
