//! Report range input and validation.

use serde::{Deserialize, Serialize};
use time::{Date, format_description::BorrowedFormatItem, macros::format_description};

use super::models::ReportRange;

/// The format browsers submit `<input type="date">` values in.
const FORM_DATE_FORMAT: &[BorrowedFormatItem] = format_description!("[year]-[month]-[day]");

/// The report form as submitted by the browser.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportForm {
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
}

impl ReportForm {
    /// Read the form into a range.
    ///
    /// Empty fields, and fields that are not `yyyy-mm-dd` dates, are treated as
    /// missing so that validation reports them together.
    pub fn to_range(&self) -> ReportRange {
        ReportRange {
            from: parse_form_date(&self.from),
            to: parse_form_date(&self.to),
        }
    }
}

fn parse_form_date(text: &str) -> Option<Date> {
    let text = text.trim();

    if text.is_empty() {
        return None;
    }

    Date::parse(text, FORM_DATE_FORMAT)
        .inspect_err(|error| tracing::debug!("ignoring invalid report date {text:?}: {error}"))
        .ok()
}

/// Format a date for an `<input type="date">` value.
pub fn format_form_date(date: Date) -> String {
    date.format(FORM_DATE_FORMAT)
        .unwrap_or_else(|_| date.to_string())
}

/// Why a report range was refused before any request was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RangeError {
    #[error("Please select both a start date and an end date.")]
    MissingDates,

    #[error("The start date {from} is after the end date {to}.")]
    Inverted { from: Date, to: Date },
}

/// Check that both ends of `range` are present and in order.
pub fn validate_range(range: ReportRange) -> Result<(Date, Date), RangeError> {
    match (range.from, range.to) {
        (Some(from), Some(to)) if from > to => Err(RangeError::Inverted { from, to }),
        (Some(from), Some(to)) => Ok((from, to)),
        _ => Err(RangeError::MissingDates),
    }
}
