//! The console's endpoint URIs.
//!
//! For endpoints that take a parameter, e.g., '/api/giving/{reference}/verify', use [format_endpoint].

/// The root route which redirects to the ledger.
pub const ROOT: &str = "/";
/// The page listing giving records.
pub const LEDGER_VIEW: &str = "/giving";
/// The page for generating and downloading giving reports.
pub const REPORT_VIEW: &str = "/giving/report";
/// The page to display when an internal server error occurs.
pub const INTERNAL_ERROR_VIEW: &str = "/error";

/// The route to verify the payment of a giving record.
pub const VERIFY_GIVING: &str = "/api/giving/{reference}/verify";
/// The route to approve a giving record.
pub const APPROVE_GIVING: &str = "/api/giving/{reference}/approve";
/// The route to generate a report for a date range.
pub const GENERATE_REPORT: &str = "/api/giving/report";
/// The route to download the last report as a PDF.
pub const REPORT_PDF: &str = "/api/giving/report/pdf";
/// The route to download the last report as a CSV file.
pub const REPORT_CSV: &str = "/api/giving/report/csv";

/// Replace the parameter in `endpoint_path` with `value`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/api/giving/{reference}/verify',
/// '{reference}' is the parameter.
///
/// `value` is percent-encoded so that it stays a single path segment.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// the original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, value: &str) -> String {
    let Some(param_start) = endpoint_path.find('{') else {
        return endpoint_path.to_owned();
    };

    let param_end = endpoint_path[param_start..]
        .find('}')
        .map_or(endpoint_path.len(), |end| param_start + end + 1);

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        encode_path_segment(value),
        &endpoint_path[param_end..]
    )
}

/// Percent-encode `value` so it stays a single path segment.
pub fn encode_path_segment(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());

    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{byte:02X}")),
        }
    }

    encoded
}

/// The ledger page URL for `cursor`, or the first page if there is none.
pub fn ledger_page(cursor: Option<&str>) -> String {
    match cursor {
        Some(cursor) => match serde_urlencoded::to_string(&[("cursor", cursor)]) {
            Ok(query) => format!("{LEDGER_VIEW}?{query}"),
            Err(error) => {
                tracing::error!("could not encode cursor {cursor:?}: {error}");
                LEDGER_VIEW.to_owned()
            }
        },
        None => LEDGER_VIEW.to_owned(),
    }
}
