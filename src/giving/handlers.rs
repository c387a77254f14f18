//! The routes for the giving ledger and report pages.

use std::{sync::Arc, time::Duration};

use axum::{
    Form,
    extract::{FromRef, Path, Query, State},
    http::{
        StatusCode,
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    },
    response::{IntoResponse, Redirect, Response},
};
use axum_htmx::HxRequest;
use serde::Deserialize;
use time::UtcOffset;

use crate::{
    AppState, Error,
    alert::Alert,
    endpoints,
    timezone::{get_local_offset, local_today},
};

use super::{
    api::GivingApi,
    export::report_filename,
    report::ReportForm,
    report_view::{report_page, report_result},
    screen::{Banner, LedgerError, LedgerScreen},
    view::{ledger_page, ledger_section},
};

/// The state needed by the ledger and report routes.
#[derive(Debug)]
pub struct LedgerState<A> {
    pub screen: Arc<LedgerScreen<A>>,
    pub local_timezone: String,
    pub page_size: u64,
    pub banner_ttl: Duration,
}

impl<A> Clone for LedgerState<A> {
    fn clone(&self) -> Self {
        Self {
            screen: self.screen.clone(),
            local_timezone: self.local_timezone.clone(),
            page_size: self.page_size,
            banner_ttl: self.banner_ttl,
        }
    }
}

impl<A> FromRef<AppState<A>> for LedgerState<A> {
    fn from_ref(state: &AppState<A>) -> Self {
        Self {
            screen: state.screen.clone(),
            local_timezone: state.local_timezone.clone(),
            page_size: state.pagination_config.page_size,
            banner_ttl: state.banner_ttl,
        }
    }
}

impl<A> LedgerState<A> {
    fn local_offset(&self) -> Result<UtcOffset, Error> {
        get_local_offset(&self.local_timezone).ok_or_else(|| {
            tracing::error!("invalid timezone {}", self.local_timezone);
            Error::InvalidTimezoneError(self.local_timezone.clone())
        })
    }

    /// The response for a failed row action or report request.
    ///
    /// A request for a record that is already busy gets an empty response so
    /// the first request's result is the only one shown.
    fn error_response(&self, error: LedgerError) -> Response {
        match error {
            LedgerError::Busy { .. } => StatusCode::CONFLICT.into_response(),
            error => Error::from(error).into_alert_response(self.banner_ttl),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LedgerQuery {
    /// A `next`/`previous` link from the finance API.
    pub cursor: Option<String>,
}

/// Fetch a page of giving records and render the ledger.
///
/// htmx requests get just the ledger section. A failed fetch is shown on the
/// page itself.
pub async fn get_ledger_page<A: GivingApi + 'static>(
    State(state): State<LedgerState<A>>,
    HxRequest(is_htmx): HxRequest,
    Query(query): Query<LedgerQuery>,
) -> Response {
    let local_offset = match state.local_offset() {
        Ok(offset) => offset,
        Err(error) => return error.into_response(),
    };

    if let Err(error) = state.screen.fetch_page(query.cursor.as_deref()).await {
        tracing::error!("could not fetch giving records: {error}");
    }

    let snapshot = state.screen.snapshot();

    if is_htmx {
        ledger_section(&snapshot, state.page_size, local_offset, state.banner_ttl).into_response()
    } else {
        ledger_page(&snapshot, state.page_size, local_offset, state.banner_ttl).into_response()
    }
}

/// Check a record's payment with the gateway and report the outcome as an alert.
pub async fn verify_endpoint<A: GivingApi + 'static>(
    State(state): State<LedgerState<A>>,
    Path(reference): Path<String>,
) -> Response {
    match state.screen.verify(&reference).await {
        Ok(verification) => Alert::from_banner(&Banner::for_verification(&reference, &verification))
            .into_html(state.banner_ttl)
            .into_response(),
        Err(error) => state.error_response(error),
    }
}

/// Approve a record and render the reloaded ledger section.
pub async fn approve_endpoint<A: GivingApi + 'static>(
    State(state): State<LedgerState<A>>,
    Path(reference): Path<String>,
) -> Response {
    let local_offset = match state.local_offset() {
        Ok(offset) => offset,
        Err(error) => return error.into_alert_response(state.banner_ttl),
    };

    match state.screen.approve(&reference).await {
        Ok(_) => ledger_section(
            &state.screen.snapshot(),
            state.page_size,
            local_offset,
            state.banner_ttl,
        )
        .into_response(),
        Err(error) => state.error_response(error),
    }
}

/// Render the report page with the last generated report, if any.
pub async fn get_report_page<A: GivingApi + 'static>(
    State(state): State<LedgerState<A>>,
) -> Response {
    let local_offset = match state.local_offset() {
        Ok(offset) => offset,
        Err(error) => return error.into_response(),
    };

    report_page(
        state.screen.banner().as_ref(),
        state.screen.report().as_ref(),
        local_offset,
        state.banner_ttl,
    )
    .into_response()
}

/// Generate a report for the submitted date range and render it.
pub async fn generate_report_endpoint<A: GivingApi + 'static>(
    State(state): State<LedgerState<A>>,
    Form(form): Form<ReportForm>,
) -> Response {
    let local_offset = match state.local_offset() {
        Ok(offset) => offset,
        Err(error) => return error.into_alert_response(state.banner_ttl),
    };

    match state.screen.generate_report(form.to_range()).await {
        Ok(report) => report_result(
            state.screen.banner().as_ref(),
            Some(&report),
            local_offset,
            state.banner_ttl,
        )
        .into_response(),
        Err(error) => state.error_response(error),
    }
}

/// Download the last generated report as a PDF.
///
/// Without a report, or when rendering fails, the operator is sent back to
/// the report page where the error banner is shown.
pub async fn download_report_pdf<A: GivingApi + 'static>(
    State(state): State<LedgerState<A>>,
) -> Response {
    let local_offset = match state.local_offset() {
        Ok(offset) => offset,
        Err(error) => return error.into_response(),
    };

    match state.screen.export_report_pdf(local_offset) {
        Ok(bytes) => attachment(bytes, "application/pdf", "pdf", local_offset),
        Err(_) => Redirect::to(endpoints::REPORT_VIEW).into_response(),
    }
}

/// Download the last generated report as CSV.
pub async fn download_report_csv<A: GivingApi + 'static>(
    State(state): State<LedgerState<A>>,
) -> Response {
    let local_offset = match state.local_offset() {
        Ok(offset) => offset,
        Err(error) => return error.into_response(),
    };

    match state.screen.export_report_csv() {
        Ok(bytes) => attachment(bytes, "text/csv; charset=utf-8", "csv", local_offset),
        Err(_) => Redirect::to(endpoints::REPORT_VIEW).into_response(),
    }
}

fn attachment(
    bytes: Vec<u8>,
    content_type: &str,
    extension: &str,
    local_offset: UtcOffset,
) -> Response {
    let filename = report_filename(local_today(local_offset), extension);

    (
        [
            (CONTENT_TYPE, content_type.to_owned()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        bytes,
    )
        .into_response()
}
