//! Tolerant extraction of the renewal table.
//!
//! The renewals page has no stable id or class on its table, so the table is
//! located by visible text: a `<th>` containing a known header label, walked
//! up to its nearest ancestor `<table>`. Body rows are parsed independently;
//! a malformed row becomes a row-level diagnostic instead of aborting the
//! batch, and every input row yields exactly one output element.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error_handling::HtmlApiError;

// CSS selector strings
const HEADER_CELL_SELECTOR_STR: &str = "th";
const BODY_ROW_SELECTOR_STR: &str = "tbody > tr";
const ANCHOR_SELECTOR_STR: &str = "a[href]";

// Regex patterns
const DAYS_PATTERN: &str = r"(?i)(\d+)\s*days?";

/// Query parameter of the renew link that carries the entity id.
const RENEW_ID_PARAM: &str = "domain";

static HEADER_CELL_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(HEADER_CELL_SELECTOR_STR)
        .expect("Failed to parse header cell selector - this is a bug")
});

static BODY_ROW_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(BODY_ROW_SELECTOR_STR)
        .expect("Failed to parse body row selector - this is a bug")
});

static ANCHOR_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(ANCHOR_SELECTOR_STR).expect("Failed to parse anchor selector - this is a bug")
});

static DAYS_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(DAYS_PATTERN).expect("Failed to compile days regex - this is a bug"));

/// A fully parsed renewal row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenewalRecord {
    /// Entity id taken from the renew link's query string.
    pub id: u64,
    /// Domain name (cell 0).
    pub name: String,
    /// Whether the status cell reads "active" (case-insensitive).
    pub is_active: bool,
    /// Days until expiry (cell 2).
    pub days_left: i64,
    /// Renewal window threshold in days (cell 3).
    pub min_renewal_days: i64,
    /// Absolute renew link, resolved against the page origin.
    pub renew_url: Url,
}

/// One output element per table row: a record, or a diagnostic naming the row
/// index and the field(s) that failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    /// The row parsed cleanly.
    Record(RenewalRecord),
    /// The row was malformed; the batch continues without it.
    Error(String),
}

/// Extracts renewal rows from `html`.
///
/// The table is located by `label`: the first `<th>` whose text contains it,
/// walked up to the nearest ancestor `<table>`. Fails with
/// [`HtmlApiError::TableNotFound`] when no header cell matches; row-level
/// problems never fail the call. The output preserves row order and has
/// exactly one element per `<tbody>` row.
pub fn extract_renewal_table(
    html: &str,
    label: &str,
    page_url: &Url,
) -> Result<Vec<RowOutcome>, HtmlApiError> {
    let document = Html::parse_document(html);

    let table = document
        .select(&HEADER_CELL_SELECTOR)
        .filter(|th| th.text().collect::<String>().contains(label))
        .find_map(enclosing_table)
        .ok_or_else(|| HtmlApiError::TableNotFound {
            label: label.to_string(),
        })?;

    Ok(table
        .select(&BODY_ROW_SELECTOR)
        .enumerate()
        .map(|(index, row)| parse_row(index, row, page_url))
        .collect())
}

fn enclosing_table<'a>(element: ElementRef<'a>) -> Option<ElementRef<'a>> {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|ancestor| ancestor.value().name() == "table")
}

fn parse_row(index: usize, row: ElementRef, page_url: &Url) -> RowOutcome {
    let cells: Vec<ElementRef> = row
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|child| matches!(child.value().name(), "td" | "th"))
        .collect();

    if cells.len() < 5 {
        return RowOutcome::Error(format!(
            "row #{index} has {} cells, expected 5. Row content: {}",
            cells.len(),
            row.inner_html().trim()
        ));
    }

    let mut row_errors: Vec<String> = Vec::new();

    let name = cell_text(&cells[0]);
    if name.is_empty() {
        row_errors.push(field_error("name", 0, index));
    }

    let status_text = cell_text(&cells[1]);
    let is_active = if status_text.is_empty() {
        row_errors.push(field_error("isActive", 1, index));
        false
    } else {
        status_text.eq_ignore_ascii_case("active")
    };

    let days_left = match extract_days(&cells[2]) {
        Some(days) => days,
        None => {
            row_errors.push(field_error("daysLeft", 2, index));
            0
        }
    };

    let min_renewal_days = match extract_days(&cells[3]) {
        Some(days) => days,
        None => {
            row_errors.push(field_error("minRenewalDays", 3, index));
            0
        }
    };

    // Renew links are origin-rooted: the markup is written as if served from
    // the site root, so a relative href resolves against the origin rather
    // than the page's own path.
    let origin = page_origin(page_url);
    let renew = cells[4]
        .select(&ANCHOR_SELECTOR)
        .next()
        .and_then(|anchor| anchor.value().attr("href"))
        .and_then(|href| origin.join(href.trim()).ok())
        .and_then(|url| {
            let id = url
                .query_pairs()
                .find(|(key, _)| key == RENEW_ID_PARAM)
                .and_then(|(_, value)| value.parse::<u64>().ok())?;
            Some((id, url))
        });
    let (id, renew_url) = match renew {
        Some(found) => found,
        None => {
            row_errors.push(format!(
                "\"id\" and \"renewUrl\" properties not detected in cell 4, row {index}"
            ));
            (0, page_url.clone())
        }
    };

    if !row_errors.is_empty() {
        return RowOutcome::Error(format!(
            "row #{index} has errors: {}",
            row_errors.join("; ")
        ));
    }

    RowOutcome::Record(RenewalRecord {
        id,
        name,
        is_active,
        days_left,
        min_renewal_days,
        renew_url,
    })
}

/// Strips `page_url` down to its origin: scheme, host and port, root path.
fn page_origin(page_url: &Url) -> Url {
    let mut origin = page_url.clone();
    origin.set_path("/");
    origin.set_query(None);
    origin.set_fragment(None);
    origin
}

fn cell_text(cell: &ElementRef) -> String {
    cell.text().collect::<String>().trim().to_string()
}

fn field_error(field: &str, cell: usize, row: usize) -> String {
    format!("\"{field}\" property not detected in cell {cell}, row {row}")
}

/// Matches `<integer> day(s)` in the cell text, e.g. "14 Days" or "1 day".
fn extract_days(cell: &ElementRef) -> Option<i64> {
    DAYS_REGEX
        .captures(&cell.text().collect::<String>())
        .and_then(|captures| captures.get(1))
        .and_then(|days| days.as_str().parse::<i64>().ok())
}
