//! Whitespace-column table detection over page text.
//!
//! A table is a run of consecutive lines that split into at least
//! `min_columns` cells on column gaps (a tab or two or more spaces).

use lazy_static::lazy_static;
use regex::Regex;

use super::PageTableSource;
use crate::models::table::{CellValue, RawTable};

lazy_static! {
    static ref COLUMN_GAP: Regex = Regex::new(r"\t+|\s{2,}").unwrap();
}

/// Detects tables in page text by column gaps.
#[derive(Debug, Clone)]
pub struct TextTableDetector {
    min_columns: usize,
}

impl TextTableDetector {
    pub fn new() -> Self {
        Self { min_columns: 2 }
    }

    /// Minimum number of cells for a line to count as a table row.
    pub fn with_min_columns(mut self, min_columns: usize) -> Self {
        self.min_columns = min_columns.max(1);
        self
    }

    fn split_cells(line: &str) -> Vec<CellValue> {
        COLUMN_GAP
            .split(line.trim())
            .map(|cell| CellValue::text(cell.trim()))
            .collect()
    }
}

impl Default for TextTableDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl PageTableSource for TextTableDetector {
    fn page_tables(&self, page_text: &str) -> Vec<RawTable> {
        let mut tables = Vec::new();
        let mut current: RawTable = Vec::new();

        for line in page_text.lines() {
            let cells = if line.trim().is_empty() {
                Vec::new()
            } else {
                Self::split_cells(line)
            };

            if cells.len() >= self.min_columns {
                current.push(cells);
            } else if !current.is_empty() {
                tables.push(std::mem::take(&mut current));
            }
        }

        if !current.is_empty() {
            tables.push(current);
        }

        tables
    }
}
