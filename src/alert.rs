//! Alert system for displaying success and error messages to users.
//!
//! Alerts are rendered as fragments that htmx swaps into the alert container
//! at the bottom of every page.

use std::time::Duration;

use maud::{Markup, html};

use crate::giving::{Banner, BannerKind};

/// An alert message to show the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Alert {
    Success { message: String, details: String },
    Error { message: String, details: String },
    /// An error with no details.
    ErrorSimple { message: String },
}

impl Alert {
    /// Convert a ledger banner into an alert.
    pub fn from_banner(banner: &Banner) -> Self {
        match banner.kind {
            BannerKind::Success => Alert::Success {
                message: banner.message.clone(),
                details: String::new(),
            },
            BannerKind::Error => Alert::ErrorSimple {
                message: banner.message.clone(),
            },
        }
    }

    /// Render the alert as an out-of-band swap into the alert container.
    ///
    /// The alert removes itself after `dismiss_after`.
    pub fn into_html(self, dismiss_after: Duration) -> Markup {
        let (message, details, container_style, icon_style) = match self {
            Alert::Success { message, details } => (
                message,
                details,
                "text-green-800 bg-green-50 border-green-300 \
                dark:bg-gray-800 dark:text-green-400 dark:border-green-800",
                "text-green-500 dark:text-green-400",
            ),
            Alert::Error { message, details } => (
                message,
                details,
                "text-red-800 bg-red-50 border-red-300 \
                dark:bg-gray-800 dark:text-red-400 dark:border-red-800",
                "text-red-500 dark:text-red-400",
            ),
            Alert::ErrorSimple { message } => (
                message,
                String::new(),
                "text-red-800 bg-red-50 border-red-300 \
                dark:bg-gray-800 dark:text-red-400 dark:border-red-800",
                "text-red-500 dark:text-red-400",
            ),
        };
        let dismiss_script = format!(
            "setTimeout(() => {{ const alert = document.getElementById('alert'); \
            if (alert) {{ alert.remove(); }} }}, {});",
            dismiss_after.as_millis()
        );

        // Template adapted from https://flowbite.com/docs/components/alerts/
        html!(
            div
                id="alert-container"
                hx-swap-oob="true"
                class="w-full max-w-md px-4"
                style="position: fixed; bottom: 1rem; left: 50%; transform: translateX(-50%); z-index: 9999;"
            {
                div
                    id="alert"
                    role="alert"
                    class={"flex items-start p-4 mb-4 border rounded-lg " (container_style)}
                {
                    span class={"shrink-0 me-3 font-bold " (icon_style)} { "!" }

                    div class="text-sm font-medium"
                    {
                        p { (message) }

                        @if !details.is_empty() {
                            p class="mt-1 font-normal" { (details) }
                        }
                    }

                    button
                        type="button"
                        aria-label="Dismiss"
                        class="ms-auto -mx-1.5 -my-1.5 rounded-lg p-1.5 inline-flex items-center justify-center h-8 w-8"
                        onclick="this.closest('#alert').remove()"
                    {
                        "×"
                    }
                }

                script { (maud::PreEscaped(dismiss_script)) }
            }
        )
    }
}
