use dioxus::prelude::*;
use dioxus_router::{Outlet, Routable};

use crate::views::{CompletedView, GuardedLink, HomeView, LeaveGuardDialog, TakeExamView};

#[derive(Clone, Debug, Routable, PartialEq)]
#[rustfmt::skip]
pub enum Route {
    #[layout(Layout)]
        #[route("/", HomeView)] Home {},
        #[route("/exam/:exam_id", TakeExamView)] TakeExam { exam_id: u64 },
        #[route("/exam/:exam_id/done", CompletedView)] Completed { exam_id: u64 },
}

#[component]
fn Layout() -> Element {
    rsx! {
        div { class: "app",
            header { class: "topbar",
                h1 { "Exams" }
                GuardedLink { to: Route::Home {}, "Home" }
            }
            main { class: "content",
                Outlet::<Route> {}
            }
            LeaveGuardDialog {}
        }
    }
}
