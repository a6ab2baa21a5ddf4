use std::sync::Arc;
use std::time::Duration;

use dioxus::prelude::*;
use dioxus_router::{Navigator, use_navigator};
use exam_core::model::{ExamId, OptionId, QuestionId, SubmitTrigger};
use services::{
    ExamSession, ExamSessionService, SessionError, SubmitOutcome, SubmitPreflight, TickReport,
    TimerHandle, UnansweredNotice,
};
use tokio::sync::Mutex;

use crate::context::AppContext;
use crate::routes::Route;
use crate::views::{LeaveGuard, Toast, ToastKind, ViewError, ViewState, view_state_from_resource};
use crate::vm::{ExamScreenVm, ScreenPhase, format_duration_minutes, map_exam_screen};

const TOAST_SECS: u64 = 3;
const TIME_UP_MESSAGE: &str = "Time's up! Your exam will be submitted.";

/// Everything a handler needs to drive the session from a spawned task.
#[derive(Clone)]
struct ExamHandles {
    exam_id: u64,
    service: Arc<ExamSessionService>,
    session: Arc<Mutex<ExamSession>>,
    vm: Signal<Option<ExamScreenVm>>,
    toast: Signal<Option<Toast>>,
    confirm: Signal<Option<UnansweredNotice>>,
    leave_guard: Signal<LeaveGuard>,
    navigator: Navigator,
}

impl ExamHandles {
    async fn refresh(&self) {
        let screen = map_exam_screen(&*self.session.lock().await);
        let mut vm = self.vm;
        vm.set(Some(screen));
    }

    fn mark_busy(&self, starting: bool) {
        let mut vm = self.vm;
        if let Some(screen) = vm.write().as_mut() {
            if starting {
                screen.starting = true;
            } else {
                screen.submitting = true;
            }
        }
    }

    fn show_toast(&self, toast: Toast) {
        let mut slot = self.toast;
        slot.set(Some(toast.clone()));
        spawn(async move {
            tokio::time::sleep(Duration::from_secs(TOAST_SECS)).await;
            if slot.peek().as_ref() == Some(&toast) {
                slot.set(None);
            }
        });
    }

    fn finish(&self) {
        let mut leave_guard = self.leave_guard;
        leave_guard.write().arm(false);
        self.navigator.replace(Route::Completed {
            exam_id: self.exam_id,
        });
    }

    async fn start(self) {
        self.mark_busy(true);
        let result = self.service.start_shared(&self.session).await;
        self.refresh().await;
        match result {
            Ok(outcome) => {
                if outcome.restored_answers > 0 {
                    self.show_toast(Toast {
                        kind: ToastKind::Success,
                        message: format!("Restored {} saved answers", outcome.restored_answers),
                    });
                }
                spawn(self.run_timer());
            }
            Err(SessionError::Busy | SessionError::AlreadyStarted) => {}
            Err(err) => self.show_toast(Toast::error(err.to_string())),
        }
    }

    async fn answer(self, question: u64, option: String) {
        let Ok(option) = OptionId::new(&option) else {
            tracing::warn!(question, option = %option, "ignoring unknown option value");
            return;
        };
        let result = self
            .service
            .record_answer_shared(&self.session, QuestionId::new(question), option)
            .await;
        self.refresh().await;
        if let Err(err) = result {
            self.show_toast(Toast::error(err.to_string()));
        }
    }

    async fn request_submit(self) {
        let preflight = self.session.lock().await.preflight(SubmitTrigger::User);
        match preflight {
            Ok(SubmitPreflight::Ready) => self.submit(false).await,
            Ok(SubmitPreflight::NeedsConfirmation(notice)) => {
                let mut confirm = self.confirm;
                confirm.set(Some(notice));
            }
            Err(err) => self.show_toast(Toast::error(err.to_string())),
        }
    }

    async fn submit(self, confirmed: bool) {
        self.mark_busy(false);
        let result = self
            .service
            .submit_shared(&self.session, SubmitTrigger::User, confirmed)
            .await;
        self.refresh().await;
        match result {
            Ok(SubmitOutcome::Submitted { .. }) => self.finish(),
            Ok(SubmitOutcome::Declined) | Err(SessionError::Busy) => {}
            Err(err) => self.show_toast(Toast::error(err.to_string())),
        }
    }

    async fn run_timer(self) {
        // Dropping the handle when this task ends stops the pulses.
        let (_timer, mut pulses) = TimerHandle::every_second();
        let mut warned = false;
        while pulses.recv().await.is_some() {
            let report = self
                .service
                .tick_shared_with(&self.session, || {
                    self.show_toast(Toast::warning(TIME_UP_MESSAGE));
                })
                .await;
            self.refresh().await;
            match report {
                Ok(TickReport::Running { near_expiry, .. }) => {
                    if near_expiry && !warned {
                        warned = true;
                        let minutes = self.service.config().warning_secs.div_ceil(60);
                        self.show_toast(Toast::warning(format!(
                            "Less than {} left",
                            format_duration_minutes(minutes)
                        )));
                    }
                }
                Ok(TickReport::ExpiredWhileBusy) => {}
                Ok(TickReport::AutoSubmitted(_)) => {
                    self.finish();
                    break;
                }
                Ok(TickReport::Idle) => break,
                Err(err) => {
                    self.show_toast(Toast::error(err.to_string()));
                    break;
                }
            }
        }
    }
}

#[component]
pub fn TakeExamView(exam_id: u64) -> Element {
    let ctx = use_context::<AppContext>();
    let navigator = use_navigator();
    let service = ctx.exam_sessions();

    let vm = use_signal(|| None::<ExamScreenVm>);
    let toast = use_signal(|| None::<Toast>);
    let mut confirm = use_signal(|| None::<UnansweredNotice>);
    let handles = use_signal(|| None::<ExamHandles>);
    let mut leave_guard = use_context::<Signal<LeaveGuard>>();

    use_effect(move || {
        let armed = vm.read().as_ref().is_some_and(|screen| screen.leave_warning);
        if leave_guard.peek().is_armed() != armed {
            leave_guard.write().arm(armed);
        }
    });
    use_drop(move || leave_guard.write().arm(false));

    let resource = use_resource(move || {
        let service = service.clone();
        let mut handles = handles;
        async move {
            let session = service.open(ExamId::new(exam_id)).await;
            let resume = session.resume_pending();
            let opened = ExamHandles {
                exam_id,
                service,
                session: Arc::new(Mutex::new(session)),
                vm,
                toast,
                confirm,
                leave_guard,
                navigator,
            };
            opened.refresh().await;
            handles.set(Some(opened.clone()));
            if resume {
                spawn(opened.start());
            }
            Ok::<_, ViewError>(())
        }
    });

    let with_handles = move |run: fn(ExamHandles)| {
        if let Some(current) = handles.peek().clone() {
            run(current);
        }
    };
    let on_start = move |_: MouseEvent| {
        with_handles(|h| {
            spawn(h.start());
        });
    };
    let on_submit = move |_: MouseEvent| {
        with_handles(|h| {
            spawn(h.request_submit());
        });
    };
    let on_confirm = move |_: MouseEvent| {
        confirm.set(None);
        with_handles(|h| {
            spawn(h.submit(true));
        });
    };
    let on_answer = move |question: u64, option: String| {
        if let Some(current) = handles.peek().clone() {
            spawn(current.answer(question, option));
        }
    };

    let state = view_state_from_resource(resource);
    let screen = vm.read().clone();

    rsx! {
        div { class: "page exam-page",
            match (state, screen) {
                (ViewState::Error(err), _) => rsx! {
                    p { class: "error", "{err.message()}" }
                },
                (_, Some(screen)) => match screen.phase {
                    ScreenPhase::Instructions => rsx! {
                        section { class: "instructions",
                            h2 { "{screen.title}" }
                            if !screen.subject.is_empty() {
                                p { class: "subject", "{screen.subject}" }
                            }
                            if let Some(duration) = screen.duration_label.as_ref() {
                                p { "Duration: {duration}" }
                            }
                            ul {
                                li { "The timer starts when you press Start Exam and keeps running if you close this window." }
                                li { "Your answers are saved on this device as you go." }
                                li { "When time runs out your answers are submitted automatically." }
                            }
                            if screen.resuming {
                                p { class: "muted", "Resuming your exam..." }
                            }
                            button {
                                id: "start-exam",
                                class: "btn primary",
                                disabled: screen.is_busy(),
                                onclick: on_start,
                                "{screen.start_label()}"
                            }
                        }
                    },
                    ScreenPhase::Active => rsx! {
                        section { class: "exam-content",
                            header { class: "exam-header",
                                h2 { "{screen.title}" }
                                span {
                                    id: "timer",
                                    class: screen.timer_class(),
                                    "{screen.timer_label}"
                                }
                            }
                            p { class: "muted", "{screen.progress_label()}" }
                            if let Some(started) = screen.started_label.as_ref() {
                                p { class: "muted", "Started {started}" }
                            }
                            if screen.needs_retry {
                                div { class: "banner error",
                                    "Time is up but your answers were not submitted. Submit again to finish the exam."
                                }
                            }
                            if let Some(error) = screen.error.as_ref() {
                                div { class: "banner error", "{error}" }
                            }
                            for question in screen.questions.iter() {
                                div { key: "{question.id}", class: "question-container",
                                    h3 { "{question.number}. {question.text}" }
                                    {question.options.iter().map(|option| {
                                        let question_id = question.id;
                                        let value = option.value.clone();
                                        rsx! {
                                            label { key: "{option.value}", class: "option",
                                                input {
                                                    r#type: "radio",
                                                    name: "{question.input_name()}",
                                                    value: "{option.value}",
                                                    checked: option.selected,
                                                    disabled: screen.answers_locked,
                                                    onchange: move |_: FormEvent| on_answer(question_id, value.clone()),
                                                }
                                                span { "{option.value}. {option.label}" }
                                            }
                                        }
                                    })}
                                }
                            }
                            if screen.leave_warning {
                                p { class: "muted",
                                    "Your answers are saved on this device but not submitted until you press submit. Leaving this page asks for confirmation."
                                }
                            }
                            button {
                                id: "submit-exam",
                                class: "btn primary",
                                disabled: screen.is_busy(),
                                onclick: on_submit,
                                "{screen.submit_label()}"
                            }
                        }
                    },
                    ScreenPhase::Completed => rsx! {
                        section { class: "completed",
                            h2 { "Exam submitted" }
                            if let Some(message) = screen.completion_message.as_ref() {
                                p { "{message}" }
                            }
                        }
                    },
                },
                _ => rsx! {
                    p { "Loading..." }
                },
            }

            if let Some(notice) = confirm() {
                div { class: "overlay",
                    div { class: "dialog",
                        p { "{notice.message()}" }
                        div { class: "dialog-actions",
                            button { class: "btn", onclick: move |_: MouseEvent| confirm.set(None), "Keep answering" }
                            button { class: "btn primary", onclick: on_confirm, "Submit anyway" }
                        }
                    }
                }
            }

            if let Some(current) = toast() {
                div { class: current.kind.class(),
                    span { "{current.message}" }
                }
            }
        }
    }
}
