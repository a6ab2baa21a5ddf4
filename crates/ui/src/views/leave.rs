use dioxus::prelude::*;
use dioxus_router::use_navigator;

use crate::routes::Route;

pub const LEAVE_PROMPT: &str =
    "Your answers have not been submitted yet. Leave this exam anyway?";

/// Navigation held back while an exam has answers that were not submitted.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LeaveGuard {
    armed: bool,
    pending: Option<Route>,
}

impl LeaveGuard {
    pub fn arm(&mut self, armed: bool) {
        self.armed = armed;
        if !armed {
            self.pending = None;
        }
    }

    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Returns the route to open now, or holds it until the learner decides.
    pub fn request(&mut self, to: Route) -> Option<Route> {
        if self.armed {
            self.pending = Some(to);
            None
        } else {
            Some(to)
        }
    }

    #[must_use]
    pub fn pending(&self) -> Option<&Route> {
        self.pending.as_ref()
    }

    pub fn stay(&mut self) {
        self.pending = None;
    }

    /// The learner chose to leave: disarm and hand back the held route.
    pub fn leave(&mut self) -> Option<Route> {
        self.armed = false;
        self.pending.take()
    }
}

/// Navigation link that asks first while the exam has unsubmitted answers.
#[component]
pub fn GuardedLink(to: Route, children: Element) -> Element {
    let mut guard = use_context::<Signal<LeaveGuard>>();
    let navigator = use_navigator();

    rsx! {
        button {
            class: "link",
            onclick: move |_: MouseEvent| {
                let target = guard.write().request(to.clone());
                if let Some(target) = target {
                    navigator.push(target);
                }
            },
            {children}
        }
    }
}

#[component]
pub fn LeaveGuardDialog() -> Element {
    let mut guard = use_context::<Signal<LeaveGuard>>();
    let navigator = use_navigator();

    if guard.read().pending().is_none() {
        return rsx! {};
    }

    rsx! {
        div { class: "overlay",
            div { class: "dialog",
                p { "{LEAVE_PROMPT}" }
                div { class: "dialog-actions",
                    button {
                        class: "btn",
                        onclick: move |_: MouseEvent| guard.write().stay(),
                        "Stay"
                    }
                    button {
                        class: "btn primary",
                        onclick: move |_: MouseEvent| {
                            let target = guard.write().leave();
                            if let Some(target) = target {
                                navigator.push(target);
                            }
                        },
                        "Leave"
                    }
                }
            }
        }
    }
}
