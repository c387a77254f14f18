//! This modules defines the common functionality for paging through cursor-paginated data.

use maud::{Markup, html};
use reqwest::Url;

use crate::endpoints;

/// The config for pagination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationConfig {
    /// The number of records the finance API returns per page.
    pub page_size: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self { page_size: 20 }
    }
}

/// Where a page sits among all pages, e.g. page 2 of 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PagePosition {
    pub current: u64,
    pub total: u64,
}

/// Work out the position of the page fetched with `cursor`.
///
/// The position is derived from the cursor's `offset` query parameter. A
/// missing cursor, or one without a readable offset, is treated as the first
/// page. There is always at least one page, even when `count` is zero.
pub fn page_position(cursor: Option<&str>, count: u64, page_size: u64) -> PagePosition {
    let page_size = page_size.max(1);
    let total = count.div_ceil(page_size).max(1);
    let offset = cursor.and_then(cursor_offset).unwrap_or(0);

    PagePosition {
        current: (offset / page_size + 1).min(total),
        total,
    }
}

fn cursor_offset(cursor: &str) -> Option<u64> {
    let url = Url::parse(cursor).ok()?;

    url.query_pairs()
        .find(|(key, _)| key == "offset")
        .and_then(|(_, value)| value.parse().ok())
}

/// Previous/next controls for a page of the ledger.
///
/// `previous` and `next` are the API cursors of the neighbouring pages.
pub fn pagination_view(
    position: PagePosition,
    previous: Option<&str>,
    next: Option<&str>,
) -> Markup {
    let previous_href = previous.map(|cursor| endpoints::ledger_page(Some(cursor)));
    let next_href = next.map(|cursor| endpoints::ledger_page(Some(cursor)));

    html! {
        nav class="pagination flex justify-center"
        {
            ul class="pagination flex items-center justify-between w-full px-2 py-2"
            {
                li class="flex items-center justify-start"
                {
                    @if let Some(href) = previous_href {
                        a
                            href=(href)
                            role="button"
                            class="inline-flex items-center rounded px-2 py-1 text-sm text-blue-600 hover:underline"
                        { "Prev" }
                    } @else {
                        span class="inline-flex items-center rounded px-2 py-1 text-sm text-gray-400 dark:text-gray-500"
                        { "Prev" }
                    }
                }

                li class="flex-1 text-center font-semibold text-gray-900 dark:text-white px-2"
                {
                    span aria-current="page" { "Page " (position.current) " of " (position.total) }
                }

                li class="flex items-center justify-end"
                {
                    @if let Some(href) = next_href {
                        a
                            href=(href)
                            role="button"
                            class="inline-flex items-center rounded px-2 py-1 text-sm text-blue-600 hover:underline"
                        { "Next" }
                    } @else {
                        span class="inline-flex items-center rounded px-2 py-1 text-sm text-gray-400 dark:text-gray-500"
                        { "Next" }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use scraper::{Html, Selector};

    use crate::pagination::{PagePosition, page_position, pagination_view};

    #[test]
    fn first_page_without_cursor() {
        let got = page_position(None, 45, 20);

        assert_eq!(got, PagePosition { current: 1, total: 3 });
    }

    #[test]
    fn reads_offset_from_cursor() {
        let got = page_position(
            Some("https://api.example.org/giving/admin/list/?limit=20&offset=40"),
            45,
            20,
        );

        assert_eq!(got, PagePosition { current: 3, total: 3 });
    }

    #[test]
    fn previous_cursor_without_offset_is_first_page() {
        let got = page_position(
            Some("https://api.example.org/giving/admin/list/?limit=20"),
            45,
            20,
        );

        assert_eq!(got.current, 1);
    }

    #[test]
    fn empty_ledger_has_one_page() {
        assert_eq!(page_position(None, 0, 20), PagePosition { current: 1, total: 1 });
    }

    #[test]
    fn offset_past_the_end_is_clamped() {
        let got = page_position(Some("https://api.example.org/?offset=999"), 45, 20);

        assert_eq!(got, PagePosition { current: 3, total: 3 });
    }

    #[test]
    fn renders_links_for_available_cursors() {
        let markup = pagination_view(
            PagePosition { current: 1, total: 2 },
            None,
            Some("https://api.example.org/giving/admin/list/?offset=20"),
        );
        let html = Html::parse_fragment(&markup.into_string());

        let links = html
            .select(&Selector::parse("a").unwrap())
            .map(|a| (a.text().collect::<String>(), a.value().attr("href").unwrap_or_default().to_owned()))
            .collect::<Vec<_>>();
        assert_eq!(
            links,
            vec![(
                "Next".to_owned(),
                "/giving?cursor=https%3A%2F%2Fapi.example.org%2Fgiving%2Fadmin%2Flist%2F%3Foffset%3D20".to_owned()
            )]
        );
        let current = html
            .select(&Selector::parse("[aria-current=page]").unwrap())
            .next()
            .expect("No current page label")
            .text()
            .collect::<String>();
        assert_eq!(current, "Page 1 of 2");
    }
}
