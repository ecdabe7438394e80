//! Row-count reconciliation across source tables.
//!
//! Row N of every source is assumed to describe the same physical good. That
//! assumption is only checked by comparing row counts once, here; everything
//! downstream addresses rows through [`RowKey`]s handed out by the aligned
//! set, so no projection can read past the reconciled count.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use super::diagnostics::{Diagnostic, DiagnosticCode};
use crate::error::MergeError;
use crate::models::table::{CellValue, SourceId, SourceTable};

/// Index of a row shared by every table of an [`AlignedSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RowKey(usize);

impl RowKey {
    /// 0-based row index.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Source tables truncated to a common row count.
#[derive(Debug, Clone)]
pub struct AlignedSet {
    min_count: usize,
    tables: BTreeMap<SourceId, SourceTable>,
}

impl AlignedSet {
    /// Number of aligned rows.
    pub fn min_count(&self) -> usize {
        self.min_count
    }

    /// Keys of all aligned rows, in order.
    pub fn rows(&self) -> impl Iterator<Item = RowKey> + '_ {
        (0..self.min_count).map(RowKey)
    }

    /// Aligned table for `source`.
    pub fn table(&self, source: SourceId) -> Option<&SourceTable> {
        self.tables.get(&source)
    }

    /// Cell of `source` at `row`; short sources read as empty.
    pub fn cell(&self, row: RowKey, source: SourceId, column: usize) -> Result<&CellValue, MergeError> {
        let table = self
            .tables
            .get(&source)
            .ok_or_else(|| MergeError::MissingSource(source.to_string()))?;
        Ok(table.cell(row.index(), column))
    }

    /// Fail if `source` is absent or lacks `column`.
    pub fn check_column(&self, source: SourceId, column: usize) -> Result<(), MergeError> {
        let table = self
            .tables
            .get(&source)
            .ok_or_else(|| MergeError::MissingSource(source.to_string()))?;
        let width = table.width();
        if width > 0 && column >= width {
            return Err(MergeError::MissingColumn { table: source, column });
        }
        Ok(())
    }
}

/// Decides the aligned row count and truncates every source to it.
#[derive(Debug, Clone)]
pub struct RowAligner {
    authoritative: Vec<SourceId>,
}

impl RowAligner {
    /// Aligner whose row count comes from `authoritative` sources.
    ///
    /// An empty list makes every supplied table authoritative.
    pub fn new(authoritative: Vec<SourceId>) -> Self {
        Self { authoritative }
    }

    /// Align `tables`, reporting one diagnostic per mismatched pair of
    /// authoritative tables.
    pub fn align(
        &self,
        mut tables: BTreeMap<SourceId, SourceTable>,
    ) -> Result<(AlignedSet, Vec<Diagnostic>), MergeError> {
        let authoritative: Vec<SourceId> = if self.authoritative.is_empty() {
            tables.keys().copied().collect()
        } else {
            self.authoritative.clone()
        };

        let mut counts = Vec::with_capacity(authoritative.len());
        for source in &authoritative {
            let table = tables
                .get(source)
                .ok_or_else(|| MergeError::MissingSource(source.to_string()))?;
            counts.push((*source, table.len()));
        }

        let min_count = counts.iter().map(|(_, n)| *n).min().unwrap_or(0);

        let mut diagnostics = Vec::new();
        for (i, (a, count_a)) in counts.iter().enumerate() {
            for (b, count_b) in &counts[i + 1..] {
                if count_a != count_b {
                    let message = format!(
                        "row count mismatch: {} has {} rows, {} has {} rows; using {}",
                        a, count_a, b, count_b, min_count
                    );
                    warn!("{}", message);
                    diagnostics.push(Diagnostic::new(DiagnosticCode::RowCountMismatch, message));
                }
            }
        }

        for (source, table) in tables.iter_mut() {
            if table.len() > min_count {
                debug!("Dropping {} rows of {}", table.len() - min_count, source);
            } else if table.len() < min_count {
                debug!("{} has only {} of {} rows", source, table.len(), min_count);
            }
            table.truncate(min_count);
        }

        Ok((AlignedSet { min_count, tables }, diagnostics))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: usize, width: usize) -> SourceTable {
        SourceTable::new(
            (0..rows)
                .map(|r| (0..width).map(|c| CellValue::text(format!("{r}:{c}"))).collect())
                .collect(),
        )
    }

    #[test]
    fn test_min_count_truncates_every_table() {
        let mut tables = BTreeMap::new();
        tables.insert(SourceId::Specification, table(10, 2));
        tables.insert(SourceId::Invoice, table(7, 2));
        tables.insert(SourceId::PackingList, table(12, 2));

        let aligner = RowAligner::new(vec![SourceId::Specification, SourceId::Invoice]);
        let (aligned, diagnostics) = aligner.align(tables).unwrap();

        assert_eq!(aligned.min_count(), 7);
        assert_eq!(aligned.rows().count(), 7);
        for source in SourceId::ALL {
            assert_eq!(aligned.table(source).unwrap().len(), 7);
        }
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, DiagnosticCode::RowCountMismatch);
        assert!(diagnostics[0].message.contains("10"));
        assert!(diagnostics[0].message.contains("using 7"));
    }

    #[test]
    fn test_equal_counts_produce_no_diagnostic() {
        let mut tables = BTreeMap::new();
        tables.insert(SourceId::Specification, table(3, 1));
        tables.insert(SourceId::Invoice, table(3, 1));

        let (aligned, diagnostics) = RowAligner::new(Vec::new()).align(tables).unwrap();

        assert_eq!(aligned.min_count(), 3);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_short_non_authoritative_table_reads_empty() {
        let mut tables = BTreeMap::new();
        tables.insert(SourceId::Invoice, table(3, 1));
        tables.insert(SourceId::PackingList, table(1, 1));

        let (aligned, _) = RowAligner::new(vec![SourceId::Invoice]).align(tables).unwrap();
        let last = aligned.rows().last().unwrap();

        assert_eq!(aligned.cell(last, SourceId::PackingList, 0).unwrap(), &CellValue::Empty);
        assert_eq!(aligned.cell(last, SourceId::Invoice, 0).unwrap(), &CellValue::from("2:0"));
    }

    #[test]
    fn test_missing_authoritative_source_is_fatal() {
        let mut tables = BTreeMap::new();
        tables.insert(SourceId::Invoice, table(3, 1));

        let result = RowAligner::new(vec![SourceId::Specification]).align(tables);
        assert!(matches!(result, Err(MergeError::MissingSource(_))));
    }

    #[test]
    fn test_check_column() {
        let mut tables = BTreeMap::new();
        tables.insert(SourceId::Invoice, table(2, 3));
        let (aligned, _) = RowAligner::new(Vec::new()).align(tables).unwrap();

        assert!(aligned.check_column(SourceId::Invoice, 2).is_ok());
        assert!(matches!(
            aligned.check_column(SourceId::Invoice, 3),
            Err(MergeError::MissingColumn { column: 3, .. })
        ));
    }
}
