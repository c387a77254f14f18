//! HTML rendering for the giving ledger page.

use std::time::Duration;

use maud::{Markup, PreEscaped, html};
use time::{OffsetDateTime, UtcOffset, format_description::BorrowedFormatItem, macros::format_description};
use unicode_segmentation::UnicodeSegmentation;

use crate::{
    endpoints::{self, format_endpoint},
    html::{
        LINK_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE,
        base, format_currency, loading_spinner,
    },
    navigation::NavBar,
    pagination::{page_position, pagination_view},
};

use super::{
    models::GivingRecord,
    screen::{Banner, BannerKind, LedgerSnapshot, LoadState, RowAction},
    totals::parse_amount,
};

/// The HTML element ID of the ledger section that approvals replace.
pub(super) const LEDGER_ID: &str = "ledger";

/// The max number of graphemes to display in the detail column before
/// truncating and displaying ellipses.
const MAX_DETAIL_GRAPHEMES: usize = 32;

const DATE_TIME_FORMAT: &[BorrowedFormatItem] =
    format_description!("[year]-[month]-[day] [hour]:[minute]");

const ACTION_BUTTON_STYLE: &str = "inline-flex items-center px-3 py-1.5 text-xs font-medium \
    text-white bg-blue-600 rounded hover:enabled:bg-blue-700 disabled:bg-blue-400 \
    disabled:cursor-not-allowed dark:bg-blue-600 hover:enabled:dark:bg-blue-700";

const BADGE_STYLE: &str = "inline-flex items-center px-2.5 py-0.5 text-xs font-semibold rounded-full";

/// The full ledger page.
pub(super) fn ledger_page(
    snapshot: &LedgerSnapshot,
    page_size: u64,
    local_offset: UtcOffset,
    banner_ttl: Duration,
) -> Markup {
    let content = html! {
        (NavBar::new(endpoints::LEDGER_VIEW).into_html())

        main class=(PAGE_CONTAINER_STYLE)
        {
            (ledger_section(snapshot, page_size, local_offset, banner_ttl))
        }
    };

    base("Giving", &[], &content)
}

/// The ledger section on its own, for htmx swaps.
pub(super) fn ledger_section(
    snapshot: &LedgerSnapshot,
    page_size: u64,
    local_offset: UtcOffset,
    banner_ttl: Duration,
) -> Markup {
    let records = snapshot
        .page
        .as_ref()
        .map(|page| page.results.as_slice())
        .unwrap_or_default();

    html! {
        section id=(LEDGER_ID) class="w-full space-y-4 lg:max-w-6xl"
        {
            header class="flex justify-between flex-wrap items-end"
            {
                h1 class="text-xl font-bold" { "Giving" }

                a href=(endpoints::REPORT_VIEW) class=(LINK_STYLE) { "Generate Report" }
            }

            @if let Some(banner) = &snapshot.banner {
                (banner_view(banner, banner_ttl))
            }

            @match (&snapshot.page, snapshot.load_state) {
                (None, LoadState::Failed) => {
                    p class="text-center"
                    {
                        "The giving records could not be loaded. "
                        a href=(endpoints::ledger_page(snapshot.active_cursor.as_deref())) class=(LINK_STYLE)
                        { "Try again" }
                    }
                }
                (None, _) => {
                    p class="text-center" { (loading_spinner()) "Loading giving records..." }
                }
                (Some(_), _) if records.is_empty() => {
                    p class="text-center" { "No giving records yet." }
                }
                (Some(page), _) => {
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
                                    th scope="col" class=(TABLE_CELL_STYLE) { "Detail" }
                                    th scope="col" class=(TABLE_CELL_STYLE) { "Initiated" }
                                    th scope="col" class=(TABLE_CELL_STYLE) { "Status" }
                                    th scope="col" class=(TABLE_CELL_STYLE) { "Files" }
                                    th scope="col" class=(TABLE_CELL_STYLE) { "Actions" }
                                }
                            }

                            tbody
                            {
                                @for record in records {
                                    (record_row(record, snapshot.row_action(&record.reference), local_offset))
                                }
                            }
                        }
                    }

                    (pagination_view(
                        page_position(snapshot.active_cursor.as_deref(), page.count, page_size),
                        page.previous.as_deref(),
                        page.next.as_deref(),
                    ))
                }
            }
        }
    }
}

/// An inline banner above the ledger or report.
///
/// The banner can be dismissed, and removes itself once `ttl` has passed since
/// it was raised.
pub(super) fn banner_view(banner: &Banner, ttl: Duration) -> Markup {
    let style = match banner.kind {
        BannerKind::Success => {
            "p-4 text-sm text-green-800 rounded-lg bg-green-50 dark:bg-gray-800 dark:text-green-400"
        }
        BannerKind::Error => {
            "p-4 text-sm text-red-800 rounded-lg bg-red-50 dark:bg-gray-800 dark:text-red-400"
        }
    };

    let dismiss_script = format!(
        "(function(banner) {{ setTimeout(() => banner.remove(), {}); }})\
        (document.currentScript.closest('#banner'));",
        banner.remaining(ttl).as_millis()
    );

    html!(
        div id="banner" role="status" class={ "flex items-start " (style) }
        {
            p { (banner.message) }

            button
                type="button"
                aria-label="Dismiss"
                class="ms-auto -my-1 px-2 font-bold"
                onclick="this.closest('#banner').remove()"
            {
                "×"
            }

            script { (PreEscaped(dismiss_script)) }
        }
    )
}

fn record_row(record: &GivingRecord, action: Option<RowAction>, local_offset: UtcOffset) -> Markup {
    let (detail, tooltip) = format_detail(record.detail.as_deref().unwrap_or_default());

    html! {
        tr class=(TABLE_ROW_STYLE) data-reference=(record.reference)
        {
            td class=(TABLE_CELL_STYLE) { (record.reference) }
            td class=(TABLE_CELL_STYLE) { (record.giving_type) }
            td class="px-6 py-4 text-right" { (format_currency(parse_amount(&record.amount))) }
            td class=(TABLE_CELL_STYLE) { (record.giver) }
            td class=(TABLE_CELL_STYLE) title=[tooltip] { (detail) }
            td class=(TABLE_CELL_STYLE)
            {
                time datetime=(record.initiated_at) { (format_date_time(record.initiated_at, local_offset)) }
            }
            td class=(TABLE_CELL_STYLE) { (status_badge(record)) }
            td class=(TABLE_CELL_STYLE)
            {
                @for (index, file) in record.files.iter().enumerate() {
                    a href=(file) target="_blank" rel="noopener noreferrer" class={ (LINK_STYLE) " block" }
                    {
                        "File " (index + 1)
                    }
                }
            }
            td class={ (TABLE_CELL_STYLE) " space-x-2 whitespace-nowrap" }
            {
                @if !record.confirmed {
                    (action_button(
                        "Verify",
                        &format_endpoint(endpoints::VERIFY_GIVING, &record.reference),
                        "none",
                        action == Some(RowAction::Verifying),
                        action.is_some(),
                    ))
                }

                @if let Some(auditor) = record.auditor.as_deref().filter(|_| record.is_approved()) {
                    span class="text-xs" { "Approved by " (auditor) }
                } @else {
                    (action_button(
                        "Approve",
                        &format_endpoint(endpoints::APPROVE_GIVING, &record.reference),
                        "outerHTML",
                        action == Some(RowAction::Approving),
                        action.is_some(),
                    ))
                }
            }
        }
    }
}

/// A button that posts to `url`.
///
/// Approvals replace the whole ledger, verifications only raise an alert.
/// A button for a record with an action in flight is disabled, and shows a
/// spinner if `in_progress` is its own action.
fn action_button(label: &str, url: &str, swap: &str, in_progress: bool, disabled: bool) -> Markup {
    html! {
        button
            type="button"
            hx-post=(url)
            hx-target={ "#" (LEDGER_ID) }
            hx-swap=(swap)
            hx-target-error="#alert-container"
            hx-disabled-elt="this"
            class=(ACTION_BUTTON_STYLE)
            disabled[disabled]
        {
            @if in_progress {
                (loading_spinner())
            } @else {
                span class="htmx-indicator" { (loading_spinner()) }
            }
            (label)
        }
    }
}

fn status_badge(record: &GivingRecord) -> Markup {
    let (label, colour) = match (record.confirmed, record.is_approved()) {
        (_, true) => (
            "Approved",
            "text-blue-800 bg-blue-100 dark:bg-blue-900 dark:text-blue-300",
        ),
        (true, false) => (
            "Confirmed",
            "text-green-800 bg-green-100 dark:bg-green-900 dark:text-green-300",
        ),
        (false, false) => (
            "Pending",
            "text-yellow-800 bg-yellow-100 dark:bg-yellow-900 dark:text-yellow-300",
        ),
    };

    html!( span class={ (BADGE_STYLE) " " (colour) } { (label) } )
}

pub(super) fn format_date_time(date_time: OffsetDateTime, local_offset: UtcOffset) -> String {
    let local = date_time.to_offset(local_offset);

    local
        .format(DATE_TIME_FORMAT)
        .unwrap_or_else(|_| local.to_string())
}

fn format_detail(detail: &str) -> (String, Option<&str>) {
    let detail_length = detail.graphemes(true).count();

    if detail_length <= MAX_DETAIL_GRAPHEMES {
        (detail.to_owned(), None)
    } else {
        let truncated: String = detail
            .graphemes(true)
            .take(MAX_DETAIL_GRAPHEMES - 3)
            .collect();
        (truncated + "...", Some(detail))
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, time::Duration};

    use scraper::{Html, Selector};
    use time::{UtcOffset, macros::{datetime, offset}};

    use crate::{
        giving::screen::{LedgerSnapshot, LoadState, RowAction},
        test_utils::{assert_valid_html, page_of, record},
    };

    use super::{format_date_time, format_detail, ledger_section};

    fn render(snapshot: &LedgerSnapshot) -> Html {
        Html::parse_fragment(&ledger_section(snapshot, 20, UtcOffset::UTC, Duration::from_secs(5)).into_string())
    }

    fn buttons(html: &Html, reference: &str) -> Vec<(String, bool)> {
        let selector = Selector::parse(&format!("tr[data-reference=\"{reference}\"] button")).unwrap();

        html.select(&selector)
            .map(|button| {
                (
                    button.text().collect::<String>().trim().to_owned(),
                    button.value().attr("disabled").is_some(),
                )
            })
            .collect()
    }

    #[test]
    fn shows_actions_for_record_state() {
        let mut approved = record("GV-3", "TITHE", "10", true);
        approved.auditor = Some("deacon.paul".to_owned());
        let snapshot = LedgerSnapshot {
            load_state: LoadState::Loaded,
            page: Some(page_of(vec![
                record("GV-1", "TITHE", "10", false),
                record("GV-2", "OFFERING", "5", true),
                approved,
            ])),
            ..Default::default()
        };

        let html = render(&snapshot);

        assert_valid_html(&html);
        assert_eq!(
            buttons(&html, "GV-1"),
            vec![("Verify".to_owned(), false), ("Approve".to_owned(), false)]
        );
        assert_eq!(buttons(&html, "GV-2"), vec![("Approve".to_owned(), false)]);
        assert!(buttons(&html, "GV-3").is_empty());
        let approved_text = html
            .select(&Selector::parse("tr[data-reference=\"GV-3\"]").unwrap())
            .next()
            .expect("No row for GV-3")
            .text()
            .collect::<String>();
        assert!(approved_text.contains("Approved by deacon.paul"));
    }

    #[test]
    fn in_flight_record_has_disabled_buttons() {
        let snapshot = LedgerSnapshot {
            load_state: LoadState::Loaded,
            page: Some(page_of(vec![
                record("GV-1", "TITHE", "10", false),
                record("GV-2", "TITHE", "10", false),
            ])),
            in_flight: HashMap::from([("GV-1".to_owned(), RowAction::Verifying)]),
            ..Default::default()
        };

        let html = render(&snapshot);

        assert_eq!(
            buttons(&html, "GV-1"),
            vec![("Verify".to_owned(), true), ("Approve".to_owned(), true)]
        );
        assert_eq!(
            buttons(&html, "GV-2"),
            vec![("Verify".to_owned(), false), ("Approve".to_owned(), false)]
        );
    }

    #[test]
    fn failed_first_load_offers_retry() {
        let snapshot = LedgerSnapshot {
            load_state: LoadState::Failed,
            ..Default::default()
        };

        let html = render(&snapshot);

        let text = html.root_element().text().collect::<String>();
        assert!(text.contains("The giving records could not be loaded."));
        assert!(html.select(&Selector::parse("table").unwrap()).next().is_none());
    }

    #[test]
    fn empty_page_shows_message() {
        let snapshot = LedgerSnapshot {
            load_state: LoadState::Loaded,
            page: Some(page_of(vec![])),
            ..Default::default()
        };

        let text = render(&snapshot).root_element().text().collect::<String>();

        assert!(text.contains("No giving records yet."));
    }

    #[test]
    fn long_detail_is_truncated_with_tooltip() {
        let detail = "For the new roof over the children's church hall 🙏";

        let (shown, tooltip) = format_detail(detail);

        assert_eq!(shown, "For the new roof over the chi...");
        assert_eq!(tooltip, Some(detail));
        assert_eq!(format_detail("Thanks"), ("Thanks".to_owned(), None));
    }

    #[test]
    fn dates_use_local_offset() {
        assert_eq!(
            format_date_time(datetime!(2024-03-10 23:30 UTC), offset!(+1)),
            "2024-03-11 00:30"
        );
    }
}
