//! Tabular extraction with document-family post-filters.

use rust_decimal::Decimal;
use tracing::debug;

use crate::models::table::{CellValue, RawTable, Row, SourceTable};
use crate::pdf::PageTableSource;

/// Post-filters applied to every extracted page table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableFilters {
    /// Keep only rows whose first column is a sequence index in `[1, max]`.
    pub filter_spec: bool,
    /// Drop the first and last row of tables with more than two rows.
    pub remove_edges: bool,
}

/// Extracts page tables and concatenates them into one source table.
pub struct TabularExtractor<S> {
    source: S,
    filters: TableFilters,
}

impl<S: PageTableSource> TabularExtractor<S> {
    pub fn new(source: S, filters: TableFilters) -> Self {
        Self { source, filters }
    }

    /// Extract from page texts, in page order.
    pub fn extract_pages<T: AsRef<str>>(&self, pages: &[T]) -> SourceTable {
        let page_tables = pages
            .iter()
            .map(|page| self.source.page_tables(page.as_ref()))
            .collect();
        self.merge_tables(page_tables)
    }

    /// Filter and concatenate already-extracted page tables.
    pub fn merge_tables(&self, page_tables: Vec<Vec<RawTable>>) -> SourceTable {
        let mut rows: Vec<Row> = Vec::new();
        let mut kept = 0usize;

        for (page_idx, tables) in page_tables.into_iter().enumerate() {
            for table in tables {
                // Header-only artifacts
                if table.len() < 2 {
                    continue;
                }

                let mut table = table;
                if self.filters.filter_spec {
                    table = filter_index_range(table);
                }
                if self.filters.remove_edges && table.len() > 2 {
                    table = trim_edges(table);
                }

                debug!("Page {}: keeping table with {} rows", page_idx + 1, table.len());
                kept += 1;
                rows.extend(table);
            }
        }

        debug!("Tabular extraction kept {} tables, {} rows", kept, rows.len());
        SourceTable::new(rows)
    }
}

/// Keep rows whose first cell is a number in `[1, max observed]`.
///
/// Non-numeric first cells count as missing and are always dropped.
fn filter_index_range(table: RawTable) -> RawTable {
    let indexed: Vec<(Option<Decimal>, Row)> = table
        .into_iter()
        .map(|row| (row.first().and_then(CellValue::as_number), row))
        .collect();

    let Some(max) = indexed.iter().filter_map(|(idx, _)| *idx).max() else {
        return Vec::new();
    };

    indexed
        .into_iter()
        .filter_map(|(idx, mut row)| {
            let idx = idx?;
            if idx < Decimal::ONE || idx > max {
                return None;
            }
            row[0] = CellValue::Number(idx);
            Some(row)
        })
        .collect()
}

fn trim_edges(mut table: RawTable) -> RawTable {
    table.pop();
    table.remove(0);
    table
}
