//! HTML rendering for the report page.

use std::time::Duration;

use maud::{Markup, html};
use time::UtcOffset;

use crate::{
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, ECHARTS_URL, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, HeadElement,
        LINK_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE,
        base, format_currency, loading_spinner,
    },
    navigation::NavBar,
};

use super::{
    chart::{chart_view, giving_chart},
    models::{ReportData, ReportRange},
    report::format_form_date,
    screen::Banner,
    totals::{GivingCategory, parse_amount},
    view::{banner_view, format_date_time},
};

/// The HTML element ID of the section that generated reports replace.
const REPORT_RESULT_ID: &str = "report-result";

/// The full report page with the form and the last generated report.
pub(super) fn report_page(
    banner: Option<&Banner>,
    report: Option<&ReportData>,
    local_offset: UtcOffset,
    banner_ttl: Duration,
) -> Markup {
    let range = report
        .map(|report| ReportRange {
            from: Some(report.from),
            to: Some(report.to),
        })
        .unwrap_or_default();

    let content = html! {
        (NavBar::new(endpoints::REPORT_VIEW).into_html())

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="w-full space-y-6 lg:max-w-6xl"
            {
                h1 class="text-xl font-bold" { "Giving Report" }

                (report_form(range))

                (report_result(banner, report, local_offset, banner_ttl))
            }
        }
    };

    base(
        "Giving Report",
        &[HeadElement::ScriptLink(ECHARTS_URL.to_owned())],
        &content,
    )
}

fn report_form(range: ReportRange) -> Markup {
    let from = range.from.map(format_form_date).unwrap_or_default();
    let to = range.to.map(format_form_date).unwrap_or_default();

    html! {
        form
            hx-post=(endpoints::GENERATE_REPORT)
            hx-target={ "#" (REPORT_RESULT_ID) }
            hx-swap="outerHTML"
            hx-target-error="#alert-container"
            hx-disabled-elt="find button"
            class="flex flex-wrap items-end gap-4"
        {
            div
            {
                label for="from" class=(FORM_LABEL_STYLE) { "From" }
                input type="date" name="from" id="from" value=(from) required class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="to" class=(FORM_LABEL_STYLE) { "To" }
                input type="date" name="to" id="to" value=(to) required class=(FORM_TEXT_INPUT_STYLE);
            }

            div class="w-48"
            {
                button type="submit" class=(BUTTON_PRIMARY_STYLE)
                {
                    span class="htmx-indicator" { (loading_spinner()) }
                    "Generate Report"
                }
            }
        }
    }
}

/// The generated report, or a prompt to generate one, for htmx swaps.
pub(super) fn report_result(
    banner: Option<&Banner>,
    report: Option<&ReportData>,
    local_offset: UtcOffset,
    banner_ttl: Duration,
) -> Markup {
    html! {
        section id=(REPORT_RESULT_ID) class="space-y-6"
        {
            @if let Some(banner) = banner {
                (banner_view(banner, banner_ttl))
            }

            @match report {
                None => {
                    p { "Pick a date range to generate a report." }
                }
                Some(report) => {
                    (report_summary(report, local_offset))
                }
            }
        }
    }
}

fn report_summary(report: &ReportData, local_offset: UtcOffset) -> Markup {
    html! {
        header class="flex justify-between flex-wrap items-end gap-4"
        {
            div
            {
                h2 class="text-lg font-semibold" { "Church Giving Report" }
                p class="text-sm" { "Period: " (report.from) " to " (report.to) }
                p class="text-sm" { "Generated: " (format_date_time(report.generated_at, local_offset)) }
            }

            div class="space-x-4"
            {
                a href=(endpoints::REPORT_PDF) class=(LINK_STYLE) download { "Download PDF" }
                a href=(endpoints::REPORT_CSV) class=(LINK_STYLE) download { "Download CSV" }
            }
        }

        dl id="report-totals" class="grid grid-cols-2 lg:grid-cols-5 gap-4"
        {
            @for category in GivingCategory::ALL {
                div class="p-4 rounded bg-white dark:bg-gray-800 shadow"
                {
                    dt class="text-sm" { (category.name()) }
                    dd class="text-lg font-semibold" { (format_currency(report.totals.get(category))) }
                }
            }

            div class="p-4 rounded bg-white dark:bg-gray-800 shadow"
            {
                dt class="text-sm" { "Total" }
                dd class="text-lg font-bold" { (format_currency(report.totals.grand_total)) }
            }
        }

        @if report.records.is_empty() {
            p { "No giving records found for this period." }
        } @else {
            (chart_view(&giving_chart(report, local_offset)))

            div class="relative overflow-x-auto shadow-md rounded"
            {
                table class="w-full text-sm text-left rtl:text-right text-gray-500 dark:text-gray-400"
                {
                    thead class=(TABLE_HEADER_STYLE)
                    {
                        tr
                        {
                            th scope="col" class=(TABLE_CELL_STYLE) { "Reference" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Type" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Amount" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Giver" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Initiated" }
                            th scope="col" class=(TABLE_CELL_STYLE) { "Confirmed" }
                        }
                    }

                    tbody
                    {
                        @for record in &report.records {
                            tr class=(TABLE_ROW_STYLE)
                            {
                                td class=(TABLE_CELL_STYLE) { (record.reference) }
                                td class=(TABLE_CELL_STYLE) { (record.giving_type) }
                                td class="px-6 py-4 text-right" { (format_currency(parse_amount(&record.amount))) }
                                td class=(TABLE_CELL_STYLE) { (record.giver) }
                                td class=(TABLE_CELL_STYLE) { (format_date_time(record.initiated_at, local_offset)) }
                                td class=(TABLE_CELL_STYLE) { @if record.confirmed { "Yes" } @else { "No" } }
                            }
                        }
                    }
                }
            }
        }
    }
}
