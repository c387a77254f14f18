//! Defines the app level error type and conversions to rendered HTML pages and alerts.
use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};

use crate::{
    alert::Alert,
    giving::{ApiError, LedgerError},
    html::error_view,
    not_found::NotFoundError,
};

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// A ledger operation failed.
    ///
    /// The ledger has already recorded a banner for the operator by the time
    /// this error is returned.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// The configured timezone is not a canonical timezone name.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),

    /// The requested resource was not found.
    #[error("the requested resource could not be found")]
    NotFound,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::NotFound => NotFoundError.into_response(),
            Error::InvalidTimezoneError(timezone) => internal_error_page(
                "Invalid Timezone Settings",
                &format!(
                    "Could not get local timezone \"{timezone}\". Check your server settings and \
                    ensure the timezone has been set to valid, canonical timezone string"
                ),
            ),
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                internal_error_page(DEFAULT_DESCRIPTION, DEFAULT_FIX)
            }
        }
    }
}

impl Error {
    /// The HTTP status code for this error when it is returned from an API route.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Ledger(LedgerError::Busy { .. }) => StatusCode::CONFLICT,
            Error::Ledger(LedgerError::InvalidRange(_) | LedgerError::NoReport) => {
                StatusCode::BAD_REQUEST
            }
            Error::Ledger(LedgerError::Api(ApiError::ForeignCursor(_))) => StatusCode::BAD_REQUEST,
            Error::Ledger(LedgerError::Api(_)) => StatusCode::BAD_GATEWAY,
            Error::Ledger(LedgerError::Export(_)) | Error::InvalidTimezoneError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Error::NotFound => StatusCode::NOT_FOUND,
        }
    }

    /// Convert the error into an HTTP response with an HTML alert.
    pub fn into_alert_response(self, dismiss_after: Duration) -> Response {
        let status_code = self.status_code();
        let alert = match self {
            Error::Ledger(error) => Alert::ErrorSimple {
                message: error.display_message(),
            },
            Error::InvalidTimezoneError(timezone) => Alert::Error {
                message: "Invalid Timezone Settings".to_owned(),
                details: format!(
                    "Could not get local timezone \"{timezone}\". Check your server settings and \
                    ensure the timezone has been set to valid, canonical timezone string"
                ),
            },
            Error::NotFound => Alert::Error {
                message: "Not found".to_owned(),
                details: "The requested resource could not be found.".to_owned(),
            },
        };

        (status_code, alert.into_html(dismiss_after)).into_response()
    }
}

const DEFAULT_DESCRIPTION: &str = "Sorry, something went wrong.";
const DEFAULT_FIX: &str = "Try again later or check the server logs";

fn internal_error_page(description: &str, fix: &str) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Html(error_view("Internal Server Error", "500", description, fix).into_string()),
    )
        .into_response()
}

/// The page to display when an internal server error occurs.
pub async fn get_internal_server_error_page() -> Response {
    internal_error_page(DEFAULT_DESCRIPTION, DEFAULT_FIX)
}
