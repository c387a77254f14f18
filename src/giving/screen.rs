//! The state behind the giving ledger screen.
//!
//! A [LedgerScreen] holds the page of giving records an operator is looking
//! at, the per-row actions that are in flight, the latest banner message and
//! the last generated report. Every operation talks to the finance API through
//! a [GivingApi] and then updates this state; nothing is patched locally on
//! the assumption that the server did what was asked.

use std::{
    collections::HashMap,
    fmt::Display,
    sync::{Mutex, MutexGuard, PoisonError},
    time::{Duration, Instant},
};

use time::{OffsetDateTime, UtcOffset};

use super::{
    api::{ApiError, GivingApi, ReportQuery},
    export::{ExportError, render_report_csv, render_report_pdf},
    models::{Approval, Page, Reference, ReportData, ReportRange, Verification},
    report::{RangeError, validate_range},
    totals::categorize_totals,
};

/// How long a banner stays visible unless configured otherwise.
pub const DEFAULT_BANNER_TTL: Duration = Duration::from_secs(5);

/// Where the current record set is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Loaded,
    Failed,
}

/// An action that is waiting on the finance API for a single record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowAction {
    Verifying,
    Approving,
}

impl Display for RowAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RowAction::Verifying => write!(f, "verification"),
            RowAction::Approving => write!(f, "approval"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerKind {
    Success,
    Error,
}

/// A transient message shown above the ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct Banner {
    pub kind: BannerKind,
    pub message: String,
    raised_at: Instant,
}

impl Banner {
    fn new(kind: BannerKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            raised_at: Instant::now(),
        }
    }

    fn is_live(&self, ttl: Duration) -> bool {
        self.raised_at.elapsed() < ttl
    }

    /// The banner for the outcome of verifying `reference`.
    pub fn for_verification(reference: &str, verification: &Verification) -> Self {
        if verification.confirmed {
            Self::new(
                BannerKind::Success,
                format!("Payment for {reference} has been confirmed."),
            )
        } else {
            Self::new(
                BannerKind::Error,
                format!("Payment for {reference} has not been confirmed yet."),
            )
        }
    }

    /// How long the banner has left to live.
    pub fn remaining(&self, ttl: Duration) -> Duration {
        ttl.saturating_sub(self.raised_at.elapsed())
    }
}

/// The errors ledger operations can end with.
///
/// By the time one of these is returned the screen has already raised a
/// banner for it (except [LedgerError::Busy], which is a silent no-op), so
/// callers only need it to choose a response status.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LedgerError {
    /// The record already has an action waiting on the finance API.
    #[error("{action} is already in progress for {reference}")]
    Busy {
        reference: Reference,
        action: RowAction,
    },

    /// The report range failed validation, no request was made.
    #[error(transparent)]
    InvalidRange(#[from] RangeError),

    #[error(transparent)]
    Api(#[from] ApiError),

    /// An export was requested before any report was generated.
    #[error("no report has been generated yet")]
    NoReport,

    #[error(transparent)]
    Export(#[from] ExportError),
}

impl LedgerError {
    /// The message to show an operator.
    pub fn display_message(&self) -> String {
        match self {
            LedgerError::Busy { action, .. } => {
                format!("The {action} for this record is still in progress.")
            }
            LedgerError::InvalidRange(error) => error.to_string(),
            LedgerError::Api(error) => error.display_message(),
            LedgerError::NoReport => "Generate a report before downloading it.".to_owned(),
            LedgerError::Export(_) => {
                "The report could not be prepared for download. Please try again.".to_owned()
            }
        }
    }
}

/// Tunables for a [LedgerScreen].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenSettings {
    /// The `limit` sent with report requests.
    pub report_limit: u64,
    /// How long banners stay visible.
    pub banner_ttl: Duration,
}

impl Default for ScreenSettings {
    fn default() -> Self {
        Self {
            report_limit: 1000,
            banner_ttl: DEFAULT_BANNER_TTL,
        }
    }
}

/// A point-in-time copy of the screen for rendering.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LedgerSnapshot {
    pub load_state: LoadState,
    /// The visible page, `None` until the first successful fetch.
    pub page: Option<Page>,
    /// The cursor the visible page was fetched with, `None` for the first page.
    pub active_cursor: Option<String>,
    pub in_flight: HashMap<Reference, RowAction>,
    /// The banner, if it has not expired yet.
    pub banner: Option<Banner>,
    pub report: Option<ReportData>,
}

impl LedgerSnapshot {
    pub fn row_action(&self, reference: &str) -> Option<RowAction> {
        self.in_flight.get(reference).copied()
    }
}

#[derive(Debug, Default)]
struct ScreenState {
    load_state: LoadState,
    page: Option<Page>,
    active_cursor: Option<String>,
    /// Incremented for every page fetch so late responses can be recognised.
    fetch_generation: u64,
    in_flight: HashMap<Reference, RowAction>,
    banner: Option<Banner>,
    report: Option<ReportData>,
}

impl ScreenState {
    fn raise(&mut self, kind: BannerKind, message: impl Into<String>) {
        let banner = Banner::new(kind, message);

        match kind {
            BannerKind::Success => tracing::info!("{}", banner.message),
            BannerKind::Error => tracing::warn!("{}", banner.message),
        }

        self.banner = Some(banner);
    }
}

/// The giving ledger screen.
#[derive(Debug)]
pub struct LedgerScreen<A> {
    api: A,
    settings: ScreenSettings,
    state: Mutex<ScreenState>,
}

/// Marks a record as busy until dropped.
struct InFlight<'a> {
    state: &'a Mutex<ScreenState>,
    reference: Reference,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        lock(self.state).in_flight.remove(&self.reference);
    }
}

// No code panics while holding the lock, so a poisoned lock still holds consistent state.
fn lock(state: &Mutex<ScreenState>) -> MutexGuard<'_, ScreenState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<A: GivingApi> LedgerScreen<A> {
    pub fn new(api: A, settings: ScreenSettings) -> Self {
        Self {
            api,
            settings,
            state: Mutex::new(ScreenState::default()),
        }
    }

    /// The finance API this screen talks to.
    pub fn api(&self) -> &A {
        &self.api
    }

    /// Copy the current state for rendering, dropping an expired banner.
    pub fn snapshot(&self) -> LedgerSnapshot {
        let state = lock(&self.state);

        LedgerSnapshot {
            load_state: state.load_state,
            page: state.page.clone(),
            active_cursor: state.active_cursor.clone(),
            in_flight: state.in_flight.clone(),
            banner: self.live_banner(&state),
            report: state.report.clone(),
        }
    }

    /// The current banner, if it has not expired.
    pub fn banner(&self) -> Option<Banner> {
        self.live_banner(&lock(&self.state))
    }

    fn live_banner(&self, state: &ScreenState) -> Option<Banner> {
        state
            .banner
            .as_ref()
            .filter(|banner| banner.is_live(self.settings.banner_ttl))
            .cloned()
    }

    /// The last generated report.
    pub fn report(&self) -> Option<ReportData> {
        lock(&self.state).report.clone()
    }

    fn raise(&self, kind: BannerKind, message: impl Into<String>) {
        lock(&self.state).raise(kind, message);
    }

    fn begin(&self, reference: &str, action: RowAction) -> Result<InFlight<'_>, LedgerError> {
        let mut state = lock(&self.state);

        if let Some(&current) = state.in_flight.get(reference) {
            tracing::debug!("ignoring {action} for {reference}, {current} already in flight");
            return Err(LedgerError::Busy {
                reference: reference.to_owned(),
                action: current,
            });
        }

        state.in_flight.insert(reference.to_owned(), action);

        Ok(InFlight {
            state: &self.state,
            reference: reference.to_owned(),
        })
    }

    /// Fetch a page of giving records and make it the visible page.
    ///
    /// `cursor` is a `next`/`previous` link from the visible page, or `None`
    /// for the first page. On failure the visible page is kept as it was. If
    /// another fetch starts before this one finishes, this one's response is
    /// discarded.
    pub async fn fetch_page(&self, cursor: Option<&str>) -> Result<(), LedgerError> {
        let generation = {
            let mut state = lock(&self.state);
            state.fetch_generation += 1;
            state.load_state = LoadState::Loading;
            state.fetch_generation
        };

        let result = self.api.list_page(cursor).await;
        let mut state = lock(&self.state);

        if generation != state.fetch_generation {
            tracing::debug!("discarding stale response for page {cursor:?}");
            return Ok(());
        }

        match result {
            Ok(page) => {
                tracing::debug!(
                    "loaded {} giving records of {}",
                    page.results.len(),
                    page.count
                );
                state.page = Some(page);
                state.active_cursor = cursor.map(str::to_owned);
                state.load_state = LoadState::Loaded;
                Ok(())
            }
            Err(error) => {
                state.load_state = LoadState::Failed;
                state.raise(BannerKind::Error, error.display_message());
                Err(error.into())
            }
        }
    }

    /// Ask the payment gateway whether the record's payment has settled.
    ///
    /// Only the banner changes. The record itself is refreshed the next time
    /// its page is fetched.
    pub async fn verify(&self, reference: &str) -> Result<Verification, LedgerError> {
        let _in_flight = self.begin(reference, RowAction::Verifying)?;

        match self.api.verify(reference).await {
            Ok(verification) => {
                let banner = Banner::for_verification(reference, &verification);
                lock(&self.state).raise(banner.kind, banner.message);
                Ok(verification)
            }
            Err(error) => {
                self.raise(BannerKind::Error, error.display_message());
                Err(error.into())
            }
        }
    }

    /// Approve a record, then reload the visible page to show what the server recorded.
    pub async fn approve(&self, reference: &str) -> Result<Approval, LedgerError> {
        let in_flight = self.begin(reference, RowAction::Approving)?;

        let approval = match self.api.approve(reference).await {
            Ok(approval) => approval,
            Err(error) => {
                self.raise(BannerKind::Error, error.display_message());
                return Err(error.into());
            }
        };
        drop(in_flight);

        let message = if approval.message.trim().is_empty() {
            format!("Giving {reference} approved.")
        } else {
            approval.message.clone()
        };
        self.raise(BannerKind::Success, message);

        let cursor = lock(&self.state).active_cursor.clone();
        // A failed reload raises its own banner and keeps the old page.
        if let Err(error) = self.fetch_page(cursor.as_deref()).await {
            tracing::warn!("approved {reference} but could not reload the ledger: {error}");
        }

        Ok(approval)
    }

    /// Fetch the giving records for a date range as a report.
    ///
    /// The range is validated before any request is made. The visible ledger
    /// page is not touched.
    pub async fn generate_report(&self, range: ReportRange) -> Result<ReportData, LedgerError> {
        let (from, to) = validate_range(range).inspect_err(|error| {
            self.raise(BannerKind::Error, error.to_string());
        })?;

        let query = ReportQuery::new(self.settings.report_limit, from, to);
        let page = self.api.list_range(&query).await.inspect_err(|error| {
            self.raise(BannerKind::Error, error.display_message());
        })?;

        if page.next.is_some() {
            tracing::warn!(
                "report for {from} to {to} holds {} of {} records, raise the report limit to include them all",
                page.results.len(),
                page.count
            );
        }

        let report = ReportData {
            from,
            to,
            totals: categorize_totals(&page.results),
            records: page.results,
            generated_at: OffsetDateTime::now_utc(),
        };

        let mut state = lock(&self.state);
        state.report = Some(report.clone());
        state.raise(
            BannerKind::Success,
            format!(
                "Report generated with {} records.",
                report.records.len()
            ),
        );

        Ok(report)
    }

    /// Render the last generated report as a PDF.
    pub fn export_report_pdf(&self, local_offset: UtcOffset) -> Result<Vec<u8>, LedgerError> {
        self.export(|report| render_report_pdf(report, local_offset))
    }

    /// Render the last generated report as CSV.
    pub fn export_report_csv(&self) -> Result<Vec<u8>, LedgerError> {
        self.export(render_report_csv)
    }

    fn export(
        &self,
        render: impl FnOnce(&ReportData) -> Result<Vec<u8>, ExportError>,
    ) -> Result<Vec<u8>, LedgerError> {
        let Some(report) = self.report() else {
            let error = LedgerError::NoReport;
            self.raise(BannerKind::Error, error.display_message());
            return Err(error);
        };

        render(&report).map_err(|error| {
            tracing::error!("could not export report: {error}");
            let error = LedgerError::from(error);
            self.raise(BannerKind::Error, error.display_message());
            error
        })
    }
}
