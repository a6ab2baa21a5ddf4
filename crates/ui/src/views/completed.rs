use dioxus::prelude::*;
use dioxus_router::Link;

use crate::routes::Route;

#[component]
pub fn CompletedView(exam_id: u64) -> Element {
    rsx! {
        div { class: "page completed",
            h2 { "Exam submitted" }
            p { "Your answers for exam {exam_id} were received." }
            Link { to: Route::Home {}, "Back to home" }
        }
    }
}
