//! Positional tables shared by the extractors, the merge engine and the
//! spreadsheet I/O layer.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single cell value.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    /// No value.
    #[default]
    Empty,
    /// A numeric value.
    Number(Decimal),
    /// Free text.
    Text(String),
}

impl CellValue {
    /// Build a text cell, mapping blank text to [`CellValue::Empty`].
    pub fn text(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.trim().is_empty() {
            Self::Empty
        } else {
            Self::Text(value)
        }
    }

    /// Returns `true` for [`CellValue::Empty`].
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Numeric view of the cell, if it holds or spells a plain number.
    pub fn as_number(&self) -> Option<Decimal> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => parse_plain_number(s),
            Self::Empty => None,
        }
    }

    /// Render the cell the way a spreadsheet would display it.
    pub fn display(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => Ok(()),
            Self::Number(n) => write!(f, "{}", n.normalize()),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        Self::text(value)
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        Self::text(value)
    }
}

impl From<Decimal> for CellValue {
    fn from(value: Decimal) -> Self {
        Self::Number(value)
    }
}

impl From<Option<String>> for CellValue {
    fn from(value: Option<String>) -> Self {
        value.map(Self::text).unwrap_or_default()
    }
}

/// Parse a plain dot-decimal number, accepting scientific notation.
pub(crate) fn parse_plain_number(s: &str) -> Option<Decimal> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}

/// One row of cells.
pub type Row = Vec<CellValue>;

/// A table as returned by page-level grid extraction.
pub type RawTable = Vec<Row>;

/// Identifies a source table taking part in a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceId {
    /// Reconstructed invoice line items.
    Invoice,
    /// Packing list.
    PackingList,
    /// Specification.
    Specification,
}

impl SourceId {
    /// All sources, in merge order.
    pub const ALL: [SourceId; 3] = [Self::Invoice, Self::PackingList, Self::Specification];
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Invoice => "invoice",
            Self::PackingList => "packing list",
            Self::Specification => "specification",
        };
        f.write_str(name)
    }
}

/// An ordered sequence of positional rows with an optional header record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceTable {
    /// Header record, if the table carries one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<Vec<String>>,
    /// Data rows.
    pub rows: Vec<Row>,
}

impl SourceTable {
    /// Create a table without header.
    pub fn new(rows: Vec<Row>) -> Self {
        Self { header: None, rows }
    }

    /// Create a table with a header record.
    pub fn with_header(header: Vec<String>, rows: Vec<Row>) -> Self {
        Self {
            header: Some(header),
            rows,
        }
    }

    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if the table has no data rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Widest row (or header) in the table.
    pub fn width(&self) -> usize {
        let rows = self.rows.iter().map(Vec::len).max().unwrap_or(0);
        let header = self.header.as_ref().map(Vec::len).unwrap_or(0);
        rows.max(header)
    }

    /// Cell at `(row, column)`; missing cells read as empty.
    pub fn cell(&self, row: usize, column: usize) -> &CellValue {
        static EMPTY: CellValue = CellValue::Empty;
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .unwrap_or(&EMPTY)
    }

    /// Keep only the first `count` rows.
    pub fn truncate(&mut self, count: usize) {
        self.rows.truncate(count);
    }

    /// Header with positional names (`0`, `1`, ...) when none is set.
    pub fn header_or_positional(&self) -> Vec<String> {
        match &self.header {
            Some(h) => h.clone(),
            None => (0..self.width()).map(|i| i.to_string()).collect(),
        }
    }
}
