//! The giving ledger: records fetched from the finance API, the operations an
//! operator performs on them, and the pages that show them.

mod api;
mod chart;
mod export;
mod handlers;
mod models;
mod report;
mod report_view;
mod screen;
mod totals;
mod view;

pub use api::{
    ApiCredentials, ApiError, GENERIC_FAILURE_MESSAGE, GivingApi, Rejection, RemoteGivingApi,
    ReportQuery, format_api_date,
};
pub use chart::{Granularity, bucket_giving, giving_chart};
pub use export::{
    ExportError, Orientation, TableLayout, render_report_csv, render_report_pdf, report_filename,
};
pub use handlers::{
    approve_endpoint, download_report_csv, download_report_pdf, generate_report_endpoint,
    get_ledger_page, get_report_page, verify_endpoint,
};
pub use models::{
    Approval, GivingRecord, GivingType, Page, Reference, ReportData, ReportRange, Verification,
};
pub use report::{RangeError, ReportForm, validate_range};
pub use screen::{
    Banner, BannerKind, DEFAULT_BANNER_TTL, LedgerError, LedgerScreen, LedgerSnapshot, LoadState,
    RowAction, ScreenSettings,
};
pub use totals::{CategoryTotals, GivingCategory, categorize_totals, parse_amount};
