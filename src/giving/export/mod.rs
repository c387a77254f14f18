//! Downloadable renditions of a generated giving report.

mod csv;
mod pdf;

pub use csv::render_report_csv;
pub use pdf::{Orientation, TableLayout, render_report_pdf};

use time::Date;

/// The errors that can occur while rendering a report for download.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExportError {
    #[error("could not render PDF: {0}")]
    Pdf(String),

    #[error("could not write CSV: {0}")]
    Csv(String),
}

/// The download file name for a report generated on `date`,
/// e.g. "church-giving-report-2024-05-01.pdf".
pub fn report_filename(date: Date, extension: &str) -> String {
    format!("church-giving-report-{date}.{extension}")
}
