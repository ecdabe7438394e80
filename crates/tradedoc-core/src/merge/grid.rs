//! Addressable destination grid.

use std::collections::{BTreeMap, BTreeSet};

use crate::models::table::{CellValue, SourceTable};

/// A mutable cell grid addressed by 1-based `(row, column)`, as spreadsheet
/// templates are.
pub trait TemplateGrid {
    /// Current value of a cell; unset cells read as empty.
    fn cell(&self, row: u32, column: u32) -> CellValue;

    /// Overwrite a cell.
    fn set_cell(&mut self, row: u32, column: u32, value: CellValue);

    /// Mark a row for visual attention.
    fn highlight_row(&mut self, row: u32);
}

/// In-memory grid, loaded from a template table and committed as a table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryGrid {
    cells: BTreeMap<(u32, u32), CellValue>,
    highlighted: BTreeSet<u32>,
}

impl MemoryGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grid whose row 1 is the header (if any) followed by the table rows.
    pub fn from_table(table: &SourceTable) -> Self {
        let mut grid = Self::new();
        let mut row_no = 1u32;

        if let Some(header) = &table.header {
            for (c, value) in header.iter().enumerate() {
                grid.set_cell(row_no, c as u32 + 1, CellValue::text(value.as_str()));
            }
            row_no += 1;
        }

        for row in &table.rows {
            for (c, value) in row.iter().enumerate() {
                grid.set_cell(row_no, c as u32 + 1, value.clone());
            }
            row_no += 1;
        }

        grid
    }

    /// Highest used row and column, `(0, 0)` for an empty grid.
    pub fn extent(&self) -> (u32, u32) {
        self.cells
            .keys()
            .fold((0, 0), |(rows, cols), (r, c)| (rows.max(*r), cols.max(*c)))
    }

    /// Rows marked with [`TemplateGrid::highlight_row`].
    pub fn highlighted_rows(&self) -> impl Iterator<Item = u32> + '_ {
        self.highlighted.iter().copied()
    }

    /// Returns `true` if `row` is highlighted.
    pub fn is_highlighted(&self, row: u32) -> bool {
        self.highlighted.contains(&row)
    }

    /// Dense table of the whole grid, row 1 first, without header.
    pub fn to_table(&self) -> SourceTable {
        let (rows, cols) = self.extent();
        SourceTable::new(
            (1..=rows)
                .map(|r| (1..=cols).map(|c| self.cell(r, c)).collect())
                .collect(),
        )
    }
}

impl TemplateGrid for MemoryGrid {
    fn cell(&self, row: u32, column: u32) -> CellValue {
        self.cells.get(&(row, column)).cloned().unwrap_or_default()
    }

    fn set_cell(&mut self, row: u32, column: u32, value: CellValue) {
        if value.is_empty() {
            self.cells.remove(&(row, column));
        } else {
            self.cells.insert((row, column), value);
        }
    }

    fn highlight_row(&mut self, row: u32) {
        self.highlighted.insert(row);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_table_places_header_on_row_one() {
        let table = SourceTable::with_header(
            vec!["A".to_string(), "B".to_string()],
            vec![vec![CellValue::from("x"), CellValue::from("y")]],
        );
        let grid = MemoryGrid::from_table(&table);

        assert_eq!(grid.cell(1, 2), CellValue::from("B"));
        assert_eq!(grid.cell(2, 1), CellValue::from("x"));
        assert_eq!(grid.extent(), (2, 2));
    }

    #[test]
    fn test_to_table_is_dense() {
        let mut grid = MemoryGrid::new();
        grid.set_cell(3, 2, CellValue::from("z"));

        let table = grid.to_table();
        assert_eq!(table.len(), 3);
        assert_eq!(table.rows[0], vec![CellValue::Empty, CellValue::Empty]);
        assert_eq!(table.cell(2, 1), &CellValue::from("z"));
    }

    #[test]
    fn test_highlight() {
        let mut grid = MemoryGrid::new();
        grid.highlight_row(18);
        assert!(grid.is_highlighted(18));
        assert_eq!(grid.highlighted_rows().collect::<Vec<_>>(), vec![18]);
    }
}
