//! Data model shared by the pipelines
//!
//! Everything here is created and discarded within the processing of a
//! single document, except [`SheetTarget`] which is resolved once per run.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One source PDF in object storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentReference {
    pub bucket: String,
    pub key: String,
}

impl DocumentReference {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for DocumentReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s3://{}/{}", self.bucket, self.key)
    }
}

/// A unit of extracted information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum Block {
    KeyValue {
        key: String,
        value: String,
    },
    TableRow {
        table_id: u32,
        row_index: u32,
        cells: Vec<String>,
    },
    QueryAnswer {
        query_alias: String,
        answer: String,
    },
    /// A line of running text.
    Line { text: String },
}

impl Block {
    pub fn key_value(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::KeyValue {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn table_row<S: Into<String>>(
        table_id: u32,
        row_index: u32,
        cells: impl IntoIterator<Item = S>,
    ) -> Self {
        Self::TableRow {
            table_id,
            row_index,
            cells: cells.into_iter().map(Into::into).collect(),
        }
    }

    pub fn query_answer(query_alias: impl Into<String>, answer: impl Into<String>) -> Self {
        Self::QueryAnswer {
            query_alias: query_alias.into(),
            answer: answer.into(),
        }
    }

    pub fn line(text: impl Into<String>) -> Self {
        Self::Line { text: text.into() }
    }
}

/// Output of a document analysis, reduced to the blocks the normalizer reads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub blocks: Vec<Block>,
}

impl AnalysisResult {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Running text of the document, one line per `Line` block.
    pub fn full_text(&self) -> String {
        self.blocks
            .iter()
            .filter_map(|block| match block {
                Block::Line { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl FromIterator<Block> for AnalysisResult {
    fn from_iter<T: IntoIterator<Item = Block>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Column name to value, in column order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedFormRow(pub IndexMap<String, String>);

impl NormalizedFormRow {
    pub fn get(&self, column: &str) -> Option<&str> {
        self.0.get(column).map(String::as_str)
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.0.insert(column.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// `column: value` lines, used as summarization input.
    pub fn render_text(&self) -> String {
        self.0
            .iter()
            .map(|(column, value)| format!("{column}: {value}"))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for NormalizedFormRow {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

pub type NormalizedTableRow = Vec<String>;

/// A tab within a spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SheetTarget {
    pub spreadsheet_id: String,
    pub tab: String,
}

impl SheetTarget {
    pub fn new(spreadsheet_id: impl Into<String>, tab: impl Into<String>) -> Self {
        Self {
            spreadsheet_id: spreadsheet_id.into(),
            tab: tab.into(),
        }
    }

    /// A1 notation range covering the whole tab.
    pub fn range(&self) -> String {
        format!("'{}'", self.tab.replace('\'', "''"))
    }

    /// A1 notation range covering the header row.
    pub fn header_range(&self) -> String {
        format!("{}!1:1", self.range())
    }
}

impl fmt::Display for SheetTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.spreadsheet_id, self.tab)
    }
}
