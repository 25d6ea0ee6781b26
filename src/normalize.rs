//! Result normalization
//!
//! Reshapes an [`AnalysisResult`] into flat rows for a tabular destination:
//!
//! - key/value blocks fold into one form row, the last occurrence of a key
//!   winning;
//! - table rows are ordered by `(table_id, row_index)` and padded to the
//!   widest row of their table;
//! - query answers become a form row with exactly the configured aliases.
//!
//! Nothing here fails on an individual block. Blocks that cannot be
//! interpreted are skipped.

use chrono::{Datelike, NaiveDate};
use itertools::Itertools;
use tracing::{trace, warn};

use crate::model::{AnalysisResult, Block, NormalizedFormRow, NormalizedTableRow};

#[derive(Debug, thiserror::Error)]
pub enum InvalidInput {
    #[error("analysis result has no blocks member")]
    MissingBlocks,
}

/// Form row and table rows of one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Normalized {
    pub form: NormalizedFormRow,
    pub tables: Vec<NormalizedTableRow>,
}

pub fn normalize(result: &AnalysisResult) -> Normalized {
    Normalized {
        form: normalize_form(result),
        tables: normalize_tables(result),
    }
}

/// Fold key/value blocks into a single row.
///
/// A repeated key keeps its first column position and takes the value of its
/// last occurrence.
pub fn normalize_form(result: &AnalysisResult) -> NormalizedFormRow {
    let mut row = NormalizedFormRow::default();
    for block in &result.blocks {
        let Block::KeyValue { key, value } = block else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            trace!(%value, "skip key/value block without key");
            continue;
        }
        row.insert(key, value.trim());
    }
    row
}

pub fn normalize_tables(result: &AnalysisResult) -> Vec<NormalizedTableRow> {
    let rows = result
        .blocks
        .iter()
        .filter_map(|block| match block {
            Block::TableRow {
                table_id,
                row_index,
                cells,
            } => Some((*table_id, *row_index, cells)),
            _ => None,
        })
        .sorted_by_key(|(table_id, row_index, _)| (*table_id, *row_index))
        .collect::<Vec<_>>();

    let mut normalized = Vec::with_capacity(rows.len());
    for (_, table) in &rows.iter().chunk_by(|(table_id, _, _)| *table_id) {
        let table = table.collect::<Vec<_>>();
        let width = table
            .iter()
            .map(|(_, _, cells)| cells.len())
            .max()
            .unwrap_or(0);
        normalized.extend(table.into_iter().map(|(_, _, cells)| {
            let mut row = cells.to_vec();
            row.resize(width, String::new());
            row
        }));
    }
    normalized
}

/// Build a row whose columns are exactly `aliases`, in order.
///
/// Aliases without an answer map to an empty string; answers for aliases
/// that were not asked for are ignored.
pub fn normalize_queries<S: AsRef<str>>(result: &AnalysisResult, aliases: &[S]) -> NormalizedFormRow {
    let mut row = aliases
        .iter()
        .map(|alias| (alias.as_ref(), ""))
        .collect::<NormalizedFormRow>();
    for block in &result.blocks {
        let Block::QueryAnswer {
            query_alias,
            answer,
        } = block
        else {
            continue;
        };
        match row.0.get_mut(query_alias) {
            Some(slot) => *slot = answer.trim().to_owned(),
            None => trace!(%query_alias, "skip answer for unknown alias"),
        }
    }
    row
}

/// Run-wide column order of the form tab.
///
/// Seeded from the tab's header row. Keys not seen before are appended at the
/// end so that columns already written never shift. The tab is append-only,
/// so once the header row exists the columns added later stay unlabeled in
/// the sheet; the batch run reports them in `RunReport::unlabeled_columns`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormLayout {
    columns: Vec<String>,
}

impl FormLayout {
    pub fn from_header<S: Into<String>>(header: impl IntoIterator<Item = S>) -> Self {
        let mut columns = header.into_iter().map(Into::into).collect::<Vec<String>>();
        while columns.last().is_some_and(|c| c.trim().is_empty()) {
            columns.pop();
        }
        Self { columns }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Add the columns of `row` that are not laid out yet and return them.
    pub fn extend(&mut self, row: &NormalizedFormRow) -> Vec<String> {
        let added = row
            .columns()
            .filter(|column| !self.columns.iter().any(|c| c == column))
            .map(ToOwned::to_owned)
            .collect::<Vec<_>>();
        self.columns.extend(added.iter().cloned());
        added
    }

    /// Cells of `row` in layout order, empty for absent columns.
    pub fn render(&self, row: &NormalizedFormRow) -> Vec<String> {
        self.columns
            .iter()
            .map(|column| row.get(column).unwrap_or_default().to_owned())
            .collect()
    }
}

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%m-%d-%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%m/%d/%y",
    "%d/%m/%y",
    "%m-%d-%y",
    "%B %d, %Y",
    "%B %d %Y",
    "%d %B %Y",
    "%d %B, %Y",
    "%A, %B %d, %Y",
    "%Y%m%d",
];

/// Formats without a day of month. Parsed as the first of the month.
const MONTH_FORMATS: &[&str] = &["%B %Y", "%B, %Y", "%m/%Y", "%Y-%m"];

pub const DATE_OUTPUT_FORMAT: &str = "%Y/%m/%d";

/// `%Y` takes one or two digits too, so "03/05/24" would read as year 3 and
/// "March 2024" as day 20 of year 24. Such readings are discarded.
const MIN_YEAR: i32 = 1000;

fn parse_with(input: &str, format: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(input, format)
        .ok()
        .filter(|date| date.year() >= MIN_YEAR)
}

fn strip_ordinal(word: &str) -> &str {
    let digits = word.trim_end_matches(|c: char| c.is_ascii_alphabetic());
    let suffix = &word[digits.len()..];
    if !digits.is_empty()
        && digits.chars().all(|c| c.is_ascii_digit())
        && matches!(suffix.to_ascii_lowercase().as_str(), "st" | "nd" | "rd" | "th")
    {
        digits
    } else {
        word
    }
}

fn clean_date(raw: &str) -> String {
    raw.split_whitespace()
        .map(|word| {
            let (word, comma) = match word.strip_suffix(',') {
                Some(word) => (word, ","),
                None => (word, ""),
            };
            let word = word.trim_end_matches('.');
            format!("{}{comma}", strip_ordinal(word))
        })
        .join(" ")
}

/// Parse a date answer in any of the common invoice spellings.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let cleaned = clean_date(raw);
    if cleaned.is_empty() {
        return None;
    }
    if let Ok(datetime) = chrono::DateTime::parse_from_rfc3339(&cleaned) {
        return Some(datetime.date_naive());
    }
    DATE_FORMATS
        .iter()
        .find_map(|format| parse_with(&cleaned, format))
        .or_else(|| {
            MONTH_FORMATS
                .iter()
                .find_map(|format| parse_with(&format!("1 {cleaned}"), &format!("%d {format}")))
        })
}

/// Render a date answer as `YYYY/MM/DD`, keeping it verbatim when unparseable.
pub fn normalize_date(raw: &str) -> String {
    match parse_date(raw) {
        Some(date) => date.format(DATE_OUTPUT_FORMAT).to_string(),
        None => {
            if !raw.trim().is_empty() {
                warn!(date = raw, "failed to parse date");
            }
            raw.to_owned()
        }
    }
}
