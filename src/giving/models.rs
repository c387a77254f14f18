//! Wire and domain types for giving records returned by the finance API.

use std::fmt::Display;

use serde::{Deserialize, Deserializer, Serialize};
use time::{Date, OffsetDateTime};

use super::totals::CategoryTotals;

/// The unique, server-assigned identifier of a giving transaction.
pub type Reference = String;

/// The kind of contribution a member made.
///
/// Labels from the API are matched case-insensitively. Labels this client does
/// not know about are kept verbatim so that a new giving type on the server
/// does not break the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum GivingType {
    Tithe,
    Stewardship,
    Offering,
    Project,
    Welfare,
    Other(String),
}

impl GivingType {
    /// The label the API uses for this giving type, e.g. "TITHE".
    pub fn label(&self) -> &str {
        match self {
            GivingType::Tithe => "TITHE",
            GivingType::Stewardship => "STEWARDSHIP",
            GivingType::Offering => "OFFERING",
            GivingType::Project => "PROJECT",
            GivingType::Welfare => "WELFARE",
            GivingType::Other(label) => label,
        }
    }
}

impl From<String> for GivingType {
    fn from(label: String) -> Self {
        match label.trim().to_ascii_uppercase().as_str() {
            "TITHE" => GivingType::Tithe,
            "STEWARDSHIP" => GivingType::Stewardship,
            "OFFERING" => GivingType::Offering,
            "PROJECT" => GivingType::Project,
            "WELFARE" => GivingType::Welfare,
            _ => GivingType::Other(label),
        }
    }
}

impl From<GivingType> for String {
    fn from(giving_type: GivingType) -> Self {
        giving_type.label().to_owned()
    }
}

impl Display for GivingType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            GivingType::Tithe => "Tithe",
            GivingType::Stewardship => "Stewardship",
            GivingType::Offering => "Offering",
            GivingType::Project => "Project",
            GivingType::Welfare => "Welfare",
            GivingType::Other(label) => label,
        };

        write!(f, "{name}")
    }
}

/// A recorded financial contribution by a church member.
///
/// The console never edits these fields. Confirmation and approval happen on
/// the server and the new state is read back with a fresh page fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GivingRecord {
    pub reference: Reference,
    #[serde(rename = "type")]
    pub giving_type: GivingType,
    /// A decimal string, e.g. "1500.00".
    #[serde(deserialize_with = "amount_from_string_or_number")]
    pub amount: String,
    #[serde(default)]
    pub detail: Option<String>,
    pub giver: String,
    pub confirmed: bool,
    /// The staff member who approved the record, if any.
    #[serde(default)]
    pub auditor: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub initiated_at: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub confirmation_date: Option<OffsetDateTime>,
    /// URLs of receipts or other attachments.
    #[serde(default)]
    pub files: Vec<String>,
}

impl GivingRecord {
    /// Whether an operator has already approved this record.
    pub fn is_approved(&self) -> bool {
        self.auditor.as_deref().is_some_and(|auditor| !auditor.is_empty())
    }
}

// Some deployments serialise decimals as JSON numbers, others as strings.
fn amount_from_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Amount {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Amount::deserialize(deserializer)? {
        Amount::Text(text) => text,
        Amount::Number(number) => number.to_string(),
    })
}

/// A cursor-style pagination envelope.
///
/// `results` keeps the order the server sent (newest first).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Page {
    pub results: Vec<GivingRecord>,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    #[serde(default)]
    pub count: u64,
}

/// The body of a successful payment verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verification {
    pub confirmed: bool,
}

/// The body of a successful approval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approval {
    #[serde(default)]
    pub message: String,
}

/// The date range an operator picked for a report.
///
/// Either end may be missing until the form is complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReportRange {
    pub from: Option<Date>,
    pub to: Option<Date>,
}

/// A generated giving report, kept apart from the paginated ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportData {
    pub from: Date,
    pub to: Date,
    pub records: Vec<GivingRecord>,
    pub totals: CategoryTotals,
    pub generated_at: OffsetDateTime,
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::{GivingRecord, GivingType, Page};

    #[test]
    fn parses_page_from_api_json() {
        let json = r#"{
            "count": 2,
            "next": "https://api.example.org/giving/admin/list/?limit=10&offset=10",
            "previous": null,
            "results": [
                {
                    "reference": "GV-002",
                    "type": "tithe",
                    "amount": "250.50",
                    "detail": null,
                    "giver": "Ada",
                    "confirmed": true,
                    "auditor": "pastor.john",
                    "initiated_at": "2024-03-02T10:00:00Z",
                    "confirmation_date": "2024-03-02T10:05:00Z",
                    "files": ["https://cdn.example.org/receipt.png"]
                },
                {
                    "reference": "GV-001",
                    "type": "BUILDING_FUND",
                    "amount": 40,
                    "giver": "Grace",
                    "confirmed": false,
                    "initiated_at": "2024-03-01T09:00:00Z"
                }
            ]
        }"#;

        let page: Page = serde_json::from_str(json).expect("Could not parse page");

        assert_eq!(page.count, 2);
        assert!(page.next.is_some());
        assert_eq!(page.previous, None);
        assert_eq!(page.results[0].giving_type, GivingType::Tithe);
        assert_eq!(page.results[0].amount, "250.50");
        assert!(page.results[0].is_approved());
        assert_eq!(
            page.results[0].confirmation_date,
            Some(datetime!(2024-03-02 10:05:00 UTC))
        );
        assert_eq!(
            page.results[1].giving_type,
            GivingType::Other("BUILDING_FUND".to_owned())
        );
        assert_eq!(page.results[1].amount, "40");
        assert!(!page.results[1].is_approved());
        assert!(page.results[1].files.is_empty());
    }

    #[test]
    fn giving_type_serializes_as_api_label() {
        let record = GivingRecord {
            reference: "GV-1".to_owned(),
            giving_type: GivingType::Welfare,
            amount: "1".to_owned(),
            detail: None,
            giver: "Ada".to_owned(),
            confirmed: true,
            auditor: Some(String::new()),
            initiated_at: datetime!(2024-01-01 0:00 UTC),
            confirmation_date: None,
            files: Vec::new(),
        };

        let json = serde_json::to_value(&record).expect("Could not serialize record");

        assert_eq!(json["type"], "WELFARE");
        assert!(!record.is_approved(), "an empty auditor is not an approval");
    }
}
