use dioxus::prelude::*;
use dioxus_router::{Link, use_navigator};

use crate::context::AppContext;
use crate::routes::Route;
use crate::views::ViewError;

#[component]
pub fn HomeView() -> Element {
    let ctx = use_context::<AppContext>();
    let navigator = use_navigator();
    let mut exam_input = use_signal(String::new);
    let mut error = use_signal(|| None::<ViewError>);

    let on_open = move |_: MouseEvent| match exam_input.read().trim().parse::<u64>() {
        Ok(exam_id) if exam_id > 0 => {
            error.set(None);
            navigator.push(Route::TakeExam { exam_id });
        }
        _ => error.set(Some(ViewError::InvalidExamId)),
    };

    rsx! {
        div { class: "page",
            h2 { "Home" }
            if let Some(exam_id) = ctx.launch_exam_id() {
                p {
                    Link { to: Route::TakeExam { exam_id: exam_id.value() }, "Continue to exam {exam_id}" }
                }
            }
            div { class: "open-exam",
                label { r#for: "exam-id", "Exam number" }
                input {
                    id: "exam-id",
                    r#type: "text",
                    value: "{exam_input}",
                    oninput: move |evt: FormEvent| exam_input.set(evt.value()),
                }
                button { class: "btn", onclick: on_open, "Open exam" }
            }
            if let Some(err) = error() {
                p { class: "error", "{err.message()}" }
            }
        }
    }
}
