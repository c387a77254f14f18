//! Summary totals for giving reports.

use super::models::{GivingRecord, GivingType};

/// The buckets giving is reported under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GivingCategory {
    /// Stewardship and tithes are reported together.
    StewardshipTithe,
    Offering,
    Project,
    Welfare,
}

impl GivingCategory {
    /// All categories in report order.
    pub const ALL: [GivingCategory; 4] = [
        GivingCategory::StewardshipTithe,
        GivingCategory::Offering,
        GivingCategory::Project,
        GivingCategory::Welfare,
    ];

    /// Find the bucket for a giving type label.
    ///
    /// Matching is a case-insensitive substring search, so a label such as
    /// "SPECIAL_OFFERING" lands in [GivingCategory::Offering]. Returns `None`
    /// for labels that match no bucket.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.to_lowercase();

        if label.contains("stewardship") || label.contains("tithe") {
            Some(GivingCategory::StewardshipTithe)
        } else if label.contains("offering") {
            Some(GivingCategory::Offering)
        } else if label.contains("project") {
            Some(GivingCategory::Project)
        } else if label.contains("welfare") {
            Some(GivingCategory::Welfare)
        } else {
            None
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            GivingCategory::StewardshipTithe => "Stewardship & Tithe",
            GivingCategory::Offering => "Offering",
            GivingCategory::Project => "Project",
            GivingCategory::Welfare => "Welfare",
        }
    }
}

impl GivingType {
    /// The report bucket this giving type is summed under, if any.
    pub fn category(&self) -> Option<GivingCategory> {
        match self {
            GivingType::Tithe | GivingType::Stewardship => Some(GivingCategory::StewardshipTithe),
            GivingType::Offering => Some(GivingCategory::Offering),
            GivingType::Project => Some(GivingCategory::Project),
            GivingType::Welfare => Some(GivingCategory::Welfare),
            GivingType::Other(label) => GivingCategory::from_label(label),
        }
    }
}

/// Confirmed giving summed per category.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CategoryTotals {
    pub stewardship_tithe: f64,
    pub offering: f64,
    pub project: f64,
    pub welfare: f64,
    /// The sum of the four category totals.
    pub grand_total: f64,
}

impl CategoryTotals {
    pub fn get(&self, category: GivingCategory) -> f64 {
        match category {
            GivingCategory::StewardshipTithe => self.stewardship_tithe,
            GivingCategory::Offering => self.offering,
            GivingCategory::Project => self.project,
            GivingCategory::Welfare => self.welfare,
        }
    }

    fn add(&mut self, category: GivingCategory, amount: f64) {
        match category {
            GivingCategory::StewardshipTithe => self.stewardship_tithe += amount,
            GivingCategory::Offering => self.offering += amount,
            GivingCategory::Project => self.project += amount,
            GivingCategory::Welfare => self.welfare += amount,
        }
    }
}

/// Sum the confirmed records in `records` per giving category.
///
/// Unconfirmed records are ignored entirely, as are records whose type matches
/// no category. An empty slice gives all-zero totals.
pub fn categorize_totals(records: &[GivingRecord]) -> CategoryTotals {
    let mut totals = records
        .iter()
        .filter(|record| record.confirmed)
        .filter_map(|record| {
            record
                .giving_type
                .category()
                .map(|category| (category, parse_amount(&record.amount)))
        })
        .fold(CategoryTotals::default(), |mut totals, (category, amount)| {
            totals.add(category, amount);
            totals
        });

    totals.grand_total = GivingCategory::ALL
        .iter()
        .map(|&category| totals.get(category))
        .sum();

    totals
}

/// Parse a decimal amount the way a lenient browser client would.
///
/// Leading whitespace is skipped and the longest numeric prefix is used, so
/// "1500.00", "  12.5" and "100 NGN" parse to 1500.0, 12.5 and 100.0.
/// Anything without a numeric prefix, or that is not finite, counts as zero.
pub fn parse_amount(amount: &str) -> f64 {
    let amount = amount.trim_start();
    let bytes = amount.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }

    let mut seen_digit = false;
    let mut seen_point = false;

    while let Some(&byte) = bytes.get(end) {
        match byte {
            b'0'..=b'9' => seen_digit = true,
            b'.' if !seen_point => seen_point = true,
            _ => break,
        }
        end += 1;
    }

    if !seen_digit {
        return 0.0;
    }

    // An exponent only counts when digits follow it, e.g. "1e3" but not "1e".
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exponent_end = end + 1;
        if matches!(bytes.get(exponent_end), Some(b'+' | b'-')) {
            exponent_end += 1;
        }
        let digits_start = exponent_end;
        while bytes.get(exponent_end).is_some_and(u8::is_ascii_digit) {
            exponent_end += 1;
        }
        if exponent_end > digits_start {
            end = exponent_end;
        }
    }

    amount[..end]
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .unwrap_or(0.0)
}
