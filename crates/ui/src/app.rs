use dioxus::prelude::*;
use dioxus_router::Router;

use crate::routes::Route;
use crate::views::LeaveGuard;

#[component]
pub fn App() -> Element {
    use_context_provider(|| Signal::new(LeaveGuard::default()));

    rsx! {
        document::Stylesheet { href: asset!("/assets/style.css") }

        document::Title { "Exams" }

        div { class: "app-root",
            ErrorBoundary {
                handle_error: |errors: ErrorContext| rsx! {
                    div { class: "fatal",
                        h1 { "Something went wrong" }
                        pre { "{errors:?}" }
                    }
                },
                Router::<Route> {}
            }
        }
    }
}
