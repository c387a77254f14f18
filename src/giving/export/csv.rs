//! CSV export of a giving report.

use time::format_description::well_known::Rfc3339;

use crate::giving::models::ReportData;

use super::ExportError;

const HEADER: [&str; 9] = [
    "reference",
    "type",
    "amount",
    "giver",
    "detail",
    "confirmed",
    "auditor",
    "initiated_at",
    "confirmation_date",
];

/// Write every record in `report` as a CSV row, in the order the API returned them.
pub fn render_report_csv(report: &ReportData) -> Result<Vec<u8>, ExportError> {
    let mut writer = ::csv::Writer::from_writer(Vec::new());
    let to_error = |error: ::csv::Error| ExportError::Csv(error.to_string());

    writer.write_record(HEADER).map_err(to_error)?;

    for record in &report.records {
        let initiated_at = record
            .initiated_at
            .format(&Rfc3339)
            .map_err(|error| ExportError::Csv(error.to_string()))?;
        let confirmation_date = match record.confirmation_date {
            Some(date) => date
                .format(&Rfc3339)
                .map_err(|error| ExportError::Csv(error.to_string()))?,
            None => String::new(),
        };

        writer
            .write_record([
                record.reference.as_str(),
                record.giving_type.label(),
                record.amount.as_str(),
                record.giver.as_str(),
                record.detail.as_deref().unwrap_or_default(),
                if record.confirmed { "true" } else { "false" },
                record.auditor.as_deref().unwrap_or_default(),
                initiated_at.as_str(),
                confirmation_date.as_str(),
            ])
            .map_err(to_error)?;
    }

    writer
        .into_inner()
        .map_err(|error| ExportError::Csv(error.to_string()))
}
