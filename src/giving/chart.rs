//! The giving chart on the report page.
//!
//! Confirmed records are summed per giving category into date buckets whose
//! size depends on how long the report period is, then drawn as an ECharts
//! stacked bar chart.

use charming::{
    Chart,
    component::{Axis, Grid, Legend, Title},
    element::{
        AxisLabel, AxisPointer, AxisPointerType, AxisType, Emphasis, EmphasisFocus, JsFunction,
        Tooltip, Trigger,
    },
    series::bar,
};
use maud::{Markup, PreEscaped, html};
use time::{Date, Duration, Month, UtcOffset};

use super::{
    models::ReportData,
    totals::{GivingCategory, parse_amount},
};

/// The HTML element ID of the chart container.
pub const GIVING_CHART_ID: &str = "giving-chart";

/// The size of the date buckets on the chart's x-axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Daily,
    Weekly,
    Monthly,
}

impl Granularity {
    /// Pick the bucket size for a report covering `from` to `to` inclusive.
    pub fn for_range(from: Date, to: Date) -> Self {
        let days = (to - from).whole_days() + 1;

        if days <= 31 {
            Granularity::Daily
        } else if days <= 183 {
            Granularity::Weekly
        } else {
            Granularity::Monthly
        }
    }

    /// The first day of the bucket holding `date`.
    fn bucket_start(self, date: Date) -> Date {
        match self {
            Granularity::Daily => date,
            Granularity::Weekly => {
                date - Duration::days(date.weekday().number_days_from_monday().into())
            }
            Granularity::Monthly => date.replace_day(1).unwrap_or(date),
        }
    }

    fn next_bucket(self, start: Date) -> Option<Date> {
        match self {
            Granularity::Daily => start.next_day(),
            Granularity::Weekly => start.checked_add(Duration::weeks(1)),
            Granularity::Monthly => {
                let (year, month) = match start.month() {
                    Month::December => (start.year() + 1, Month::January),
                    month => (start.year(), month.next()),
                };
                Date::from_calendar_date(year, month, 1).ok()
            }
        }
    }

    fn label(self, start: Date) -> String {
        match self {
            Granularity::Daily => format!("{} {:02}", short_month(start.month()), start.day()),
            Granularity::Weekly => {
                let (year, week, _) = start.to_iso_week_date();
                format!("{year}-W{week:02}")
            }
            Granularity::Monthly => format!("{} {}", short_month(start.month()), start.year()),
        }
    }
}

fn short_month(month: Month) -> &'static str {
    match month {
        Month::January => "Jan",
        Month::February => "Feb",
        Month::March => "Mar",
        Month::April => "Apr",
        Month::May => "May",
        Month::June => "Jun",
        Month::July => "Jul",
        Month::August => "Aug",
        Month::September => "Sep",
        Month::October => "Oct",
        Month::November => "Nov",
        Month::December => "Dec",
    }
}

/// Per-category totals for each bucket of a report period.
#[derive(Debug, Clone, PartialEq)]
pub struct GivingSeries {
    pub granularity: Granularity,
    pub labels: Vec<String>,
    /// One value per label for each category, in [GivingCategory::ALL] order.
    pub values: Vec<(GivingCategory, Vec<f64>)>,
}

/// Bucket the confirmed records of `report`.
///
/// Records are dated by their initiation time in `local_offset`. Every bucket
/// in the period gets a label, including ones with no giving. Records dated
/// outside the period are ignored.
pub fn bucket_giving(report: &ReportData, local_offset: UtcOffset) -> GivingSeries {
    let granularity = Granularity::for_range(report.from, report.to);

    let mut starts = Vec::new();
    let mut cursor = Some(granularity.bucket_start(report.from));
    while let Some(start) = cursor.filter(|start| *start <= report.to) {
        starts.push(start);
        cursor = granularity.next_bucket(start);
    }

    let mut values: Vec<(GivingCategory, Vec<f64>)> = GivingCategory::ALL
        .iter()
        .map(|category| (*category, vec![0.0; starts.len()]))
        .collect();

    for record in report.records.iter().filter(|record| record.confirmed) {
        let date = record.initiated_at.to_offset(local_offset).date();
        if date < report.from || date > report.to {
            continue;
        }

        let Some(category) = record.giving_type.category() else {
            continue;
        };
        let Ok(index) = starts.binary_search(&granularity.bucket_start(date)) else {
            continue;
        };

        if let Some((_, series)) = values.iter_mut().find(|(c, _)| *c == category) {
            series[index] += parse_amount(&record.amount);
        }
    }

    GivingSeries {
        granularity,
        labels: starts.iter().map(|start| granularity.label(*start)).collect(),
        values,
    }
}

/// Build the stacked bar chart for `report`.
pub fn giving_chart(report: &ReportData, local_offset: UtcOffset) -> Chart {
    let series = bucket_giving(report, local_offset);
    let subtext = match series.granularity {
        Granularity::Daily => "Confirmed giving per day",
        Granularity::Weekly => "Confirmed giving per week",
        Granularity::Monthly => "Confirmed giving per month",
    };

    let mut chart = Chart::new()
        .title(Title::new().text("Giving").subtext(subtext).left(20).top("1%"))
        .tooltip(
            Tooltip::new()
                .trigger(Trigger::Axis)
                .value_formatter(currency_formatter())
                .axis_pointer(AxisPointer::new().type_(AxisPointerType::Shadow)),
        )
        .legend(Legend::new().left(200).top("1%"))
        .grid(
            Grid::new()
                .left("3%")
                .right("4%")
                .bottom("3%")
                .top(90)
                .contain_label(true),
        )
        .x_axis(Axis::new().type_(AxisType::Category).data(series.labels))
        .y_axis(
            Axis::new()
                .type_(AxisType::Value)
                .axis_label(AxisLabel::new().formatter(currency_formatter())),
        );

    for (category, data) in series.values {
        chart = chart.series(
            bar::Bar::new()
                .name(category.name())
                .stack("Giving")
                .emphasis(Emphasis::new().focus(EmphasisFocus::Series))
                .data(data),
        );
    }

    chart
}

fn currency_formatter() -> JsFunction {
    JsFunction::new_with_args(
        "number",
        "const currencyFormatter = new Intl.NumberFormat('en-US', {
              style: 'currency',
              currency: 'USD'
            });
            return (number) ? currencyFormatter.format(number) : \"-\";",
    )
}

/// The chart container followed by the script that draws `chart` into it.
///
/// The script runs as soon as it is inserted, so the markup works both in a
/// full page and when swapped in by htmx. ECharts must already be loaded.
pub fn chart_view(chart: &Chart) -> Markup {
    let script = format!(
        r#"(function() {{
            const chart = echarts.init(document.getElementById("{GIVING_CHART_ID}"));
            chart.setOption({chart});
            window.addEventListener('resize', chart.resize);

            const darkModeMediaQuery = window.matchMedia('(prefers-color-scheme: dark)');
            const updateTheme = () => {{
                chart.setTheme(darkModeMediaQuery.matches ? 'dark' : 'default');
            }};
            darkModeMediaQuery.addEventListener('change', updateTheme);
            updateTheme();
        }})();"#
    );

    html!(
        div
            id=(GIVING_CHART_ID)
            class="min-h-[380px] w-full rounded dark:bg-gray-100"
        {}

        script { (PreEscaped(script)) }
    )
}

#[cfg(test)]
mod tests {
    use time::{
        Date, UtcOffset,
        macros::{date, datetime, offset},
    };

    use crate::{
        giving::{
            models::{GivingRecord, ReportData},
            totals::categorize_totals,
        },
        test_utils::record,
    };

    use super::{Granularity, bucket_giving, giving_chart};

    fn report(from: Date, to: Date, records: Vec<GivingRecord>) -> ReportData {
        ReportData {
            from,
            to,
            totals: categorize_totals(&records),
            records,
            generated_at: datetime!(2024-12-31 12:00 UTC),
        }
    }

    #[test]
    fn granularity_follows_range_length() {
        assert_eq!(
            Granularity::for_range(date!(2024 - 03 - 01), date!(2024 - 03 - 31)),
            Granularity::Daily
        );
        assert_eq!(
            Granularity::for_range(date!(2024 - 03 - 01), date!(2024 - 04 - 01)),
            Granularity::Weekly
        );
        assert_eq!(
            Granularity::for_range(date!(2024 - 01 - 01), date!(2024 - 07 - 01)),
            Granularity::Weekly
        );
        assert_eq!(
            Granularity::for_range(date!(2024 - 01 - 01), date!(2024 - 12 - 31)),
            Granularity::Monthly
        );
    }

    #[test]
    fn daily_buckets_cover_every_day() {
        let mut tithe = record("GV-1", "TITHE", "100", true);
        tithe.initiated_at = datetime!(2024-03-02 10:00 UTC);
        let mut pending = record("GV-2", "OFFERING", "999", false);
        pending.initiated_at = datetime!(2024-03-02 11:00 UTC);
        let mut welfare = record("GV-3", "WELFARE", "7.5", true);
        welfare.initiated_at = datetime!(2024-03-03 10:00 UTC);

        let period = report(
            date!(2024 - 03 - 01),
            date!(2024 - 03 - 03),
            vec![tithe, pending, welfare],
        );

        let series = bucket_giving(&period, UtcOffset::UTC);

        assert_eq!(series.granularity, Granularity::Daily);
        assert_eq!(series.labels, vec!["Mar 01", "Mar 02", "Mar 03"]);
        assert_eq!(series.values[0].1, vec![0.0, 100.0, 0.0]);
        assert_eq!(series.values[1].1, vec![0.0, 0.0, 0.0], "unconfirmed giving counted");
        assert_eq!(series.values[3].1, vec![0.0, 0.0, 7.5]);
    }

    #[test]
    fn weekly_buckets_start_on_monday() {
        let mut project = record("GV-1", "PROJECT", "50", true);
        // A Sunday, so it belongs to the week starting 2024-03-04.
        project.initiated_at = datetime!(2024-03-10 10:00 UTC);

        let period = report(
            date!(2024 - 03 - 01),
            date!(2024 - 04 - 30),
            vec![project],
        );

        let series = bucket_giving(&period, UtcOffset::UTC);

        assert_eq!(series.granularity, Granularity::Weekly);
        assert_eq!(series.labels[0], "2024-W09");
        assert_eq!(series.labels[1], "2024-W10");
        assert_eq!(series.values[2].1[1], 50.0);
    }

    #[test]
    fn monthly_buckets_cross_year_end() {
        let mut offering = record("GV-1", "OFFERING", "20", true);
        offering.initiated_at = datetime!(2024-01-15 10:00 UTC);

        let period = report(
            date!(2023 - 06 - 15),
            date!(2024 - 02 - 10),
            vec![offering],
        );

        let series = bucket_giving(&period, UtcOffset::UTC);

        assert_eq!(series.granularity, Granularity::Monthly);
        assert_eq!(series.labels.first().map(String::as_str), Some("Jun 2023"));
        assert_eq!(series.labels.last().map(String::as_str), Some("Feb 2024"));
        assert_eq!(series.labels.len(), 9);
        assert_eq!(series.values[1].1[7], 20.0);
    }

    #[test]
    fn chart_has_a_series_per_category() {
        let chart = giving_chart(
            &report(date!(2024 - 03 - 01), date!(2024 - 03 - 03), vec![]),
            UtcOffset::UTC,
        );
        let options = chart.to_string();

        for name in ["Stewardship & Tithe", "Offering", "Project", "Welfare"] {
            assert!(options.contains(name), "missing series {name}");
        }
    }

    #[test]
    fn records_near_midnight_use_the_local_date() {
        let mut late = record("GV-1", "TITHE", "40", true);
        // 23:30 UTC on the 2nd is already the 3rd in New Zealand.
        late.initiated_at = datetime!(2024-03-02 23:30 UTC);
        let mut early = record("GV-2", "WELFARE", "15", true);
        // 00:30 UTC on the 2nd is still the 1st in Los Angeles.
        early.initiated_at = datetime!(2024-03-02 00:30 UTC);
        let period = report(date!(2024 - 03 - 01), date!(2024 - 03 - 03), vec![late, early]);

        let nz = bucket_giving(&period, offset!(+13));
        let la = bucket_giving(&period, offset!(-8));

        assert_eq!(nz.values[0].1, vec![0.0, 0.0, 40.0]);
        assert_eq!(nz.values[3].1, vec![0.0, 15.0, 0.0]);
        assert_eq!(la.values[0].1, vec![0.0, 40.0, 0.0]);
        assert_eq!(la.values[3].1, vec![15.0, 0.0, 0.0]);
    }

    #[test]
    fn records_shifted_out_of_the_period_are_ignored() {
        let mut late = record("GV-1", "TITHE", "40", true);
        late.initiated_at = datetime!(2024-03-03 23:30 UTC);
        let period = report(date!(2024 - 03 - 01), date!(2024 - 03 - 03), vec![late]);

        let series = bucket_giving(&period, offset!(+13));

        assert_eq!(series.values[0].1, vec![0.0, 0.0, 0.0]);
    }
}
