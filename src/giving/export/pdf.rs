//! Printable PDF rendition of a giving report.
//!
//! The table is measured before anything is drawn: column widths come from
//! the longest cell in each column, and the page turns landscape when the
//! table does not fit across a portrait page. Tables that are too wide even
//! for landscape are drawn in a smaller font.

use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfLayerReference};
use time::{UtcOffset, format_description::BorrowedFormatItem, macros::format_description};
use unicode_segmentation::UnicodeSegmentation;

use crate::{
    giving::{
        models::{GivingRecord, ReportData},
        totals::{GivingCategory, parse_amount},
    },
    html::format_currency,
};

use super::ExportError;

const A4_SHORT_EDGE_MM: f32 = 210.0;
const A4_LONG_EDGE_MM: f32 = 297.0;
const MARGIN_MM: f32 = 15.0;
const CELL_PADDING_MM: f32 = 3.0;

const BASE_FONT_SIZE_PT: f32 = 9.0;
const MIN_FONT_SIZE_PT: f32 = 6.0;
const TITLE_FONT_SIZE_PT: f32 = 16.0;
/// Helvetica averages roughly half an em per character.
const AVERAGE_CHAR_WIDTH_EM: f32 = 0.5;
const MM_PER_PT: f32 = 0.352_778;
const LINE_HEIGHT_EM: f32 = 1.6;

/// Cells longer than this are truncated with an ellipsis.
const MAX_CELL_GRAPHEMES: usize = 36;

const NO_DATA_MESSAGE: &str = "No giving records found for this period.";

const COLUMN_HEADERS: [&str; 7] = [
    "Date",
    "Reference",
    "Type",
    "Giver",
    "Amount",
    "Status",
    "Auditor",
];

const DATE_FORMAT: &[BorrowedFormatItem] = format_description!("[year]-[month]-[day]");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Portrait,
    Landscape,
}

impl Orientation {
    fn page_size(self) -> (f32, f32) {
        match self {
            Orientation::Portrait => (A4_SHORT_EDGE_MM, A4_LONG_EDGE_MM),
            Orientation::Landscape => (A4_LONG_EDGE_MM, A4_SHORT_EDGE_MM),
        }
    }

    fn usable_width(self) -> f32 {
        self.page_size().0 - 2.0 * MARGIN_MM
    }
}

/// The measured geometry of the report table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableLayout {
    pub orientation: Orientation,
    pub font_size: f32,
    /// Column widths in millimetres.
    pub column_widths: Vec<f32>,
}

impl TableLayout {
    /// Measure `rows` and pick an orientation and font size that fit them.
    pub fn measure(rows: &[[String; 7]]) -> Self {
        let char_counts: Vec<usize> = (0..COLUMN_HEADERS.len())
            .map(|column| {
                rows.iter()
                    .map(|row| row[column].graphemes(true).count())
                    .chain(std::iter::once(COLUMN_HEADERS[column].len()))
                    .max()
                    .unwrap_or_default()
            })
            .collect();

        let widths_at = |font_size: f32| -> Vec<f32> {
            let char_width = font_size * AVERAGE_CHAR_WIDTH_EM * MM_PER_PT;
            char_counts
                .iter()
                .map(|&count| count as f32 * char_width + 2.0 * CELL_PADDING_MM)
                .collect()
        };

        let column_widths = widths_at(BASE_FONT_SIZE_PT);
        let table_width: f32 = column_widths.iter().sum();

        if table_width <= Orientation::Portrait.usable_width() {
            return Self {
                orientation: Orientation::Portrait,
                font_size: BASE_FONT_SIZE_PT,
                column_widths,
            };
        }

        let usable_width = Orientation::Landscape.usable_width();
        let font_size = if table_width <= usable_width {
            BASE_FONT_SIZE_PT
        } else {
            // Padding does not shrink with the font, so solve for the text width alone.
            let padding = 2.0 * CELL_PADDING_MM * COLUMN_HEADERS.len() as f32;
            let scale = (usable_width - padding) / (table_width - padding);
            (BASE_FONT_SIZE_PT * scale).max(MIN_FONT_SIZE_PT)
        };

        Self {
            orientation: Orientation::Landscape,
            font_size,
            column_widths: widths_at(font_size),
        }
    }

    fn line_height(&self) -> f32 {
        self.font_size * LINE_HEIGHT_EM * MM_PER_PT
    }
}

/// A line of text placed on a page, in millimetres from the bottom left.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedText {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub font_size: f32,
    pub bold: bool,
}

/// Everything drawn on one page of the report.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageContent {
    pub texts: Vec<PlacedText>,
}

impl PageContent {
    fn push(&mut self, text: impl Into<String>, x: f32, y: f32, font_size: f32, bold: bool) {
        self.texts.push(PlacedText {
            text: text.into(),
            x,
            y,
            font_size,
            bold,
        });
    }

    fn push_row(&mut self, layout: &TableLayout, cells: &[String; 7], y: f32, bold: bool) {
        let mut x = MARGIN_MM;

        for (cell, width) in cells.iter().zip(&layout.column_widths) {
            self.push(cell.as_str(), x + CELL_PADDING_MM, y, layout.font_size, bold);
            x += width;
        }
    }

    fn push_page_number(&mut self, page_number: usize, page_width: f32) {
        self.push(
            format!("Page {page_number}"),
            page_width - MARGIN_MM - 12.0,
            MARGIN_MM / 2.0,
            MIN_FONT_SIZE_PT,
            false,
        );
    }

    /// Whether any line on the page reads exactly `text`.
    #[cfg(test)]
    pub fn contains(&self, text: &str) -> bool {
        self.texts.iter().any(|placed| placed.text == text)
    }
}

/// The report laid out page by page, ready to draw.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportLayout {
    pub table: TableLayout,
    pub pages: Vec<PageContent>,
}

/// Lay out `report` across as many pages as its table needs.
///
/// The header row is repeated at the top of every page after the first. An
/// empty report gets a "no data" line and no table header.
pub fn lay_out_report(report: &ReportData, local_offset: UtcOffset) -> ReportLayout {
    let rows: Vec<[String; 7]> = report
        .records
        .iter()
        .map(|record| table_row(record, local_offset))
        .collect();
    let table = TableLayout::measure(&rows);
    let (page_width, page_height) = table.orientation.page_size();
    let line_height = table.line_height();

    let mut pages = Vec::new();
    let mut page = PageContent::default();
    let mut y = page_height - MARGIN_MM;

    page.push("Church Giving Report", MARGIN_MM, y, TITLE_FONT_SIZE_PT, true);
    y -= TITLE_FONT_SIZE_PT * LINE_HEIGHT_EM * MM_PER_PT;

    let period = format!(
        "Period: {} to {}",
        format_date(report.from),
        format_date(report.to)
    );
    let generated = format!(
        "Generated: {}",
        format_date(report.generated_at.to_offset(local_offset).date())
    );
    for line in [period, generated] {
        page.push(line, MARGIN_MM, y, BASE_FONT_SIZE_PT, false);
        y -= line_height;
    }
    y -= line_height;

    for category in GivingCategory::ALL {
        let line = format!(
            "{}: {}",
            category.name(),
            format_currency(report.totals.get(category))
        );
        page.push(line, MARGIN_MM, y, BASE_FONT_SIZE_PT, false);
        y -= line_height;
    }
    page.push(
        format!("Total: {}", format_currency(report.totals.grand_total)),
        MARGIN_MM,
        y,
        BASE_FONT_SIZE_PT,
        true,
    );
    y -= 2.0 * line_height;

    if rows.is_empty() {
        page.push(NO_DATA_MESSAGE, MARGIN_MM, y, BASE_FONT_SIZE_PT, false);
        page.push_page_number(1, page_width);
        pages.push(page);

        return ReportLayout { table, pages };
    }

    let header = COLUMN_HEADERS.map(str::to_owned);
    page.push_row(&table, &header, y, true);
    y -= line_height;

    for row in &rows {
        if y < MARGIN_MM + line_height {
            page.push_page_number(pages.len() + 1, page_width);
            pages.push(std::mem::take(&mut page));
            y = page_height - MARGIN_MM;

            page.push_row(&table, &header, y, true);
            y -= line_height;
        }

        page.push_row(&table, row, y, false);
        y -= line_height;
    }

    page.push_page_number(pages.len() + 1, page_width);
    pages.push(page);

    ReportLayout { table, pages }
}

/// Render `report` as a PDF document.
///
/// Dates are shown in `local_offset`. An empty report renders a page with an
/// explicit "no data" message in place of the table.
pub fn render_report_pdf(
    report: &ReportData,
    local_offset: UtcOffset,
) -> Result<Vec<u8>, ExportError> {
    let layout = lay_out_report(report, local_offset);
    let (page_width, page_height) = layout.table.orientation.page_size();
    let to_error = |error: printpdf::Error| ExportError::Pdf(error.to_string());

    let (document, first_page, first_layer) = PdfDocument::new(
        "Church Giving Report",
        Mm(page_width),
        Mm(page_height),
        "Page 1",
    );
    let font = document
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(to_error)?;
    let bold_font = document
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(to_error)?;

    for (index, page) in layout.pages.iter().enumerate() {
        let layer = if index == 0 {
            document.get_page(first_page).get_layer(first_layer)
        } else {
            let (page_index, layer_index) = document.add_page(
                Mm(page_width),
                Mm(page_height),
                format!("Page {}", index + 1),
            );
            document.get_page(page_index).get_layer(layer_index)
        };

        draw_page(&layer, page, &font, &bold_font);
    }

    document.save_to_bytes().map_err(to_error)
}

fn draw_page(
    layer: &PdfLayerReference,
    page: &PageContent,
    font: &IndirectFontRef,
    bold_font: &IndirectFontRef,
) {
    for placed in &page.texts {
        layer.use_text(
            placed.text.as_str(),
            placed.font_size,
            Mm(placed.x),
            Mm(placed.y),
            if placed.bold { bold_font } else { font },
        );
    }
}

fn table_row(record: &GivingRecord, local_offset: UtcOffset) -> [String; 7] {
    [
        format_date(record.initiated_at.to_offset(local_offset).date()),
        truncate(&record.reference),
        truncate(&record.giving_type.to_string()),
        truncate(&record.giver),
        format_currency(parse_amount(&record.amount)),
        if record.confirmed {
            "Confirmed".to_owned()
        } else {
            "Pending".to_owned()
        },
        truncate(record.auditor.as_deref().unwrap_or("-")),
    ]
}

fn format_date(date: time::Date) -> String {
    date.format(DATE_FORMAT).unwrap_or_else(|_| date.to_string())
}

fn truncate(text: &str) -> String {
    let graphemes: Vec<&str> = text.graphemes(true).collect();

    if graphemes.len() <= MAX_CELL_GRAPHEMES {
        text.to_owned()
    } else {
        format!("{}...", graphemes[..MAX_CELL_GRAPHEMES - 3].concat())
    }
}
