//! Textract block graph conversion
//!
//! Textract answers with a flat list of blocks linked by id. Keys, values,
//! table cells and query answers only carry text through their `CHILD`
//! words, so the graph is resolved here into the flat [`Block`] variants the
//! normalizer works on.

use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;
use tracing::trace;

use crate::{
    model::{AnalysisResult, Block},
    normalize::InvalidInput,
};

pub const BLOCK_KEY_VALUE_SET: &str = "KEY_VALUE_SET";
pub const BLOCK_TABLE: &str = "TABLE";
pub const BLOCK_CELL: &str = "CELL";
pub const BLOCK_WORD: &str = "WORD";
pub const BLOCK_LINE: &str = "LINE";
pub const BLOCK_SELECTION_ELEMENT: &str = "SELECTION_ELEMENT";
pub const BLOCK_QUERY: &str = "QUERY";
pub const BLOCK_QUERY_RESULT: &str = "QUERY_RESULT";

const RELATIONSHIP_CHILD: &str = "CHILD";
const RELATIONSHIP_VALUE: &str = "VALUE";
const RELATIONSHIP_ANSWER: &str = "ANSWER";

const ENTITY_KEY: &str = "KEY";
const SELECTED: &str = "SELECTED";

/// Body of an `AnalyzeDocument` response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawResponse {
    pub blocks: Option<Vec<RawBlock>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawBlock {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub block_type: String,
    pub text: Option<String>,
    #[serde(default)]
    pub entity_types: Vec<String>,
    #[serde(default)]
    pub relationships: Vec<RawRelationship>,
    pub row_index: Option<u32>,
    pub column_index: Option<u32>,
    pub selection_status: Option<String>,
    pub query: Option<RawQuery>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawRelationship {
    #[serde(rename = "Type")]
    pub kind: String,
    #[serde(default)]
    pub ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RawQuery {
    pub text: String,
    pub alias: Option<String>,
}

impl RawQuery {
    fn label(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.text)
    }
}

impl RawBlock {
    fn related<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.relationships
            .iter()
            .filter(move |rel| rel.kind == kind)
            .flat_map(|rel| rel.ids.iter().map(String::as_str))
    }

    fn is_key(&self) -> bool {
        self.block_type == BLOCK_KEY_VALUE_SET && self.entity_types.iter().any(|e| e == ENTITY_KEY)
    }
}

impl RawResponse {
    /// A response without a `Blocks` member carries nothing to normalize.
    pub fn into_analysis(self) -> Result<AnalysisResult, InvalidInput> {
        let blocks = self.blocks.ok_or(InvalidInput::MissingBlocks)?;
        Ok(resolve_blocks(&blocks))
    }
}

struct BlockGraph<'a> {
    by_id: HashMap<&'a str, &'a RawBlock>,
}

impl<'a> BlockGraph<'a> {
    fn new(blocks: &'a [RawBlock]) -> Self {
        Self {
            by_id: blocks.iter().map(|b| (b.id.as_str(), b)).collect(),
        }
    }

    fn get(&self, id: &str) -> Option<&'a RawBlock> {
        self.by_id.get(id).copied()
    }

    /// Words under `block`, space separated. A ticked checkbox reads as `X`.
    fn child_text(&self, block: &RawBlock) -> String {
        block
            .related(RELATIONSHIP_CHILD)
            .filter_map(|id| self.get(id))
            .filter_map(|child| match child.block_type.as_str() {
                BLOCK_WORD => child.text.as_deref(),
                BLOCK_SELECTION_ELEMENT
                    if child.selection_status.as_deref() == Some(SELECTED) =>
                {
                    Some("X")
                }
                _ => None,
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn key_value(&self, key: &RawBlock) -> Block {
        let value = key
            .related(RELATIONSHIP_VALUE)
            .next()
            .and_then(|id| self.get(id))
            .map(|value| self.child_text(value))
            .unwrap_or_default();
        Block::KeyValue {
            key: self.child_text(key),
            value,
        }
    }

    fn table_rows(&self, table_id: u32, table: &RawBlock) -> Vec<Block> {
        let mut rows = BTreeMap::<u32, BTreeMap<u32, String>>::new();
        for cell in table
            .related(RELATIONSHIP_CHILD)
            .filter_map(|id| self.get(id))
            .filter(|child| child.block_type == BLOCK_CELL)
        {
            let (Some(row), Some(column)) = (cell.row_index, cell.column_index) else {
                trace!(id = %cell.id, "cell without position");
                continue;
            };
            rows.entry(row)
                .or_default()
                .insert(column, self.child_text(cell));
        }
        rows.into_iter()
            .map(|(row_index, mut columns)| {
                let width = columns.keys().next_back().copied().unwrap_or(0);
                let cells = (1..=width)
                    .map(|column| columns.remove(&column).unwrap_or_default())
                    .collect();
                Block::TableRow {
                    table_id,
                    row_index,
                    cells,
                }
            })
            .collect()
    }
}

/// Resolve the Textract block graph into flat blocks.
///
/// Blocks come out in response order; each table expands in place to its
/// rows, tables being numbered from 1 in order of appearance.
pub fn resolve_blocks(blocks: &[RawBlock]) -> AnalysisResult {
    let graph = BlockGraph::new(blocks);
    let query_aliases = blocks
        .iter()
        .filter(|b| b.block_type == BLOCK_QUERY)
        .filter_map(|b| b.query.as_ref().map(|q| (b, q.label())))
        .flat_map(|(b, label)| b.related(RELATIONSHIP_ANSWER).map(move |id| (id, label)))
        .collect::<HashMap<_, _>>();

    let mut resolved = Vec::new();
    let mut table_id = 0;
    for block in blocks {
        match block.block_type.as_str() {
            BLOCK_KEY_VALUE_SET if block.is_key() => resolved.push(graph.key_value(block)),
            BLOCK_TABLE => {
                table_id += 1;
                resolved.extend(graph.table_rows(table_id, block));
            }
            BLOCK_QUERY_RESULT => {
                let alias = query_aliases
                    .get(block.id.as_str())
                    .copied()
                    .or_else(|| block.query.as_ref().map(RawQuery::label));
                if let Some(alias) = alias {
                    resolved.push(Block::QueryAnswer {
                        query_alias: alias.to_owned(),
                        answer: block.text.clone().unwrap_or_default(),
                    });
                }
            }
            BLOCK_LINE => resolved.push(Block::Line {
                text: block.text.clone().unwrap_or_default(),
            }),
            _ => {}
        }
    }
    AnalysisResult::new(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> AnalysisResult {
        serde_json::from_str::<RawResponse>(json)
            .unwrap()
            .into_analysis()
            .unwrap()
    }

    #[test]
    fn test_key_value_with_checkbox() {
        let result = parse(
            r#"{"Blocks": [
                {"Id": "k", "BlockType": "KEY_VALUE_SET", "EntityTypes": ["KEY"],
                 "Relationships": [{"Type": "VALUE", "Ids": ["v"]}, {"Type": "CHILD", "Ids": ["w1", "w2"]}]},
                {"Id": "v", "BlockType": "KEY_VALUE_SET", "EntityTypes": ["VALUE"],
                 "Relationships": [{"Type": "CHILD", "Ids": ["s"]}]},
                {"Id": "w1", "BlockType": "WORD", "Text": "Paid"},
                {"Id": "w2", "BlockType": "WORD", "Text": "in full"},
                {"Id": "s", "BlockType": "SELECTION_ELEMENT", "SelectionStatus": "SELECTED"}
            ]}"#,
        );
        assert_eq!(result.blocks, vec![Block::key_value("Paid in full", "X")]);
    }

    #[test]
    fn test_key_without_value() {
        let result = parse(
            r#"{"Blocks": [
                {"Id": "k", "BlockType": "KEY_VALUE_SET", "EntityTypes": ["KEY"],
                 "Relationships": [{"Type": "CHILD", "Ids": ["w"]}]},
                {"Id": "w", "BlockType": "WORD", "Text": "Notes"}
            ]}"#,
        );
        assert_eq!(result.blocks, vec![Block::key_value("Notes", "")]);
    }

    #[test]
    fn test_unselected_checkbox_reads_empty() {
        let result = parse(
            r#"{"Blocks": [
                {"Id": "k", "BlockType": "KEY_VALUE_SET", "EntityTypes": ["KEY"],
                 "Relationships": [{"Type": "VALUE", "Ids": ["v"]}, {"Type": "CHILD", "Ids": ["w"]}]},
                {"Id": "v", "BlockType": "KEY_VALUE_SET", "EntityTypes": ["VALUE"],
                 "Relationships": [{"Type": "CHILD", "Ids": ["s", "missing"]}]},
                {"Id": "w", "BlockType": "WORD", "Text": "Overdue"},
                {"Id": "s", "BlockType": "SELECTION_ELEMENT", "SelectionStatus": "NOT_SELECTED"}
            ]}"#,
        );
        assert_eq!(result.blocks, vec![Block::key_value("Overdue", "")]);
    }

    #[test]
    fn test_tables_are_numbered_and_gaps_filled() {
        let result = parse(
            r#"{"Blocks": [
                {"Id": "t1", "BlockType": "TABLE", "Relationships": [{"Type": "CHILD", "Ids": ["c3", "c1", "c2"]}]},
                {"Id": "c1", "BlockType": "CELL", "RowIndex": 1, "ColumnIndex": 1,
                 "Relationships": [{"Type": "CHILD", "Ids": ["w1"]}]},
                {"Id": "c2", "BlockType": "CELL", "RowIndex": 1, "ColumnIndex": 3,
                 "Relationships": [{"Type": "CHILD", "Ids": ["w2"]}]},
                {"Id": "c3", "BlockType": "CELL", "RowIndex": 2, "ColumnIndex": 1,
                 "Relationships": [{"Type": "CHILD", "Ids": ["w3"]}]},
                {"Id": "w1", "BlockType": "WORD", "Text": "Widget"},
                {"Id": "w2", "BlockType": "WORD", "Text": "10.00"},
                {"Id": "w3", "BlockType": "WORD", "Text": "Gadget"},
                {"Id": "t2", "BlockType": "TABLE", "Relationships": [{"Type": "CHILD", "Ids": ["c4"]}]},
                {"Id": "c4", "BlockType": "CELL", "RowIndex": 1, "ColumnIndex": 1}
            ]}"#,
        );
        assert_eq!(
            result.blocks,
            vec![
                Block::table_row(1, 1, ["Widget", "", "10.00"]),
                Block::table_row(1, 2, ["Gadget"]),
                Block::table_row(2, 1, [""]),
            ]
        );
    }

    #[test]
    fn test_query_answers_take_alias_from_query_block() {
        let result = parse(
            r#"{"Blocks": [
                {"Id": "q1", "BlockType": "QUERY", "Query": {"Text": "Title", "Alias": "Title"},
                 "Relationships": [{"Type": "ANSWER", "Ids": ["a1"]}]},
                {"Id": "q2", "BlockType": "QUERY", "Query": {"Text": "What is the date?"},
                 "Relationships": [{"Type": "ANSWER", "Ids": ["a2"]}]},
                {"Id": "q3", "BlockType": "QUERY", "Query": {"Text": "Volume", "Alias": "VolumeIssueNumber"}},
                {"Id": "a1", "BlockType": "QUERY_RESULT", "Text": "Quarterly Report"},
                {"Id": "a2", "BlockType": "QUERY_RESULT", "Text": "March 3, 2024"},
                {"Id": "l1", "BlockType": "LINE", "Text": "Quarterly Report"}
            ]}"#,
        );
        assert_eq!(
            result.blocks,
            vec![
                Block::query_answer("Title", "Quarterly Report"),
                Block::query_answer("What is the date?", "March 3, 2024"),
                Block::line("Quarterly Report"),
            ]
        );
    }

    #[test]
    fn test_missing_blocks_is_invalid() {
        let response = serde_json::from_str::<RawResponse>(r#"{"DocumentMetadata": {"Pages": 1}}"#)
            .unwrap();
        assert!(matches!(
            response.into_analysis(),
            Err(InvalidInput::MissingBlocks)
        ));
    }

    #[test]
    fn test_empty_blocks_is_valid() {
        assert!(parse(r#"{"Blocks": []}"#).is_empty());
    }
}
