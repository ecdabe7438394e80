//! Reading and writing tables as CSV or workbook files.

use std::fs;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Range, Reader};
use csv::{ReaderBuilder, WriterBuilder};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::error::Result;
use crate::merge::MemoryGrid;
use crate::models::table::{CellValue, Row, SourceTable};

/// Read the first sheet of a workbook (xlsx, xls, ods) or a CSV file.
///
/// With `has_header` the first row becomes the header record. Workbook rows
/// and columns are positioned from cell `A1` even when leading cells are
/// empty.
pub fn read_table(path: &Path, has_header: bool) -> Result<SourceTable> {
    let mut rows = if is_csv(path) {
        read_csv_rows(path)?
    } else {
        read_workbook_rows(path)?
    };

    let header = if has_header && !rows.is_empty() {
        Some(rows.remove(0).iter().map(CellValue::display).collect())
    } else {
        None
    };

    debug!("Read {} rows from {}", rows.len(), path.display());
    Ok(SourceTable { header, rows })
}

/// Write a table as CSV, header record first.
pub fn write_table(path: &Path, table: &SourceTable) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut writer = WriterBuilder::new().flexible(true).from_path(path)?;
    if let Some(header) = &table.header {
        writer.write_record(header)?;
    }
    for row in &table.rows {
        writer.write_record(row.iter().map(CellValue::display))?;
    }
    writer.flush()?;

    debug!("Wrote {} rows to {}", table.len(), path.display());
    Ok(())
}

/// Load a destination grid template; row 1 of the file is grid row 1.
pub fn load_grid(path: &Path) -> Result<MemoryGrid> {
    Ok(MemoryGrid::from_table(&read_table(path, false)?))
}

/// Save a destination grid as CSV.
pub fn save_grid(path: &Path, grid: &MemoryGrid) -> Result<()> {
    write_table(path, &grid.to_table())
}

fn is_csv(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("csv"))
        .unwrap_or(false)
}

fn read_csv_rows(path: &Path) -> Result<Vec<Row>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(CellValue::text).collect());
    }
    Ok(rows)
}

fn read_workbook_rows(path: &Path) -> Result<Vec<Row>> {
    let mut workbook = open_workbook_auto(path)?;
    let Some(range) = workbook.worksheet_range_at(0) else {
        warn!("{} has no sheets", path.display());
        return Ok(Vec::new());
    };
    Ok(range_rows(&range?))
}

fn range_rows(range: &Range<Data>) -> Vec<Row> {
    let Some((first_row, first_col)) = range.start() else {
        return Vec::new();
    };

    let mut rows: Vec<Row> = (0..first_row).map(|_| Vec::new()).collect();
    for row in range.rows() {
        let mut cells: Row = (0..first_col).map(|_| CellValue::Empty).collect();
        cells.extend(row.iter().map(data_to_cell));
        rows.push(cells);
    }
    rows
}

fn data_to_cell(data: &Data) -> CellValue {
    match data {
        Data::Empty | Data::Error(_) => CellValue::Empty,
        Data::String(s) => CellValue::text(s.as_str()),
        Data::Int(i) => CellValue::Number(Decimal::from(*i)),
        Data::Float(f) => match Decimal::from_f64(*f) {
            Some(n) => CellValue::Number(n.normalize()),
            None => CellValue::text(f.to_string()),
        },
        Data::Bool(b) => CellValue::text(if *b { "TRUE" } else { "FALSE" }),
        Data::DateTime(dt) => CellValue::text(dt.to_string()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::text(s.as_str()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::TemplateGrid;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    #[test]
    fn test_csv_with_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pl.csv");
        fs::write(&path, "0,1,2\n1,Olivenöl,\"12,5\"\n2,Essig\n").unwrap();

        let table = read_table(&path, true).unwrap();

        assert_eq!(table.header, Some(vec!["0".to_string(), "1".to_string(), "2".to_string()]));
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(0, 2), &CellValue::from("12,5"));
        assert_eq!(table.cell(1, 2), &CellValue::Empty);
    }

    #[test]
    fn test_write_then_read_keeps_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("table.csv");
        let table = SourceTable::with_header(
            vec!["A".to_string(), "B".to_string()],
            vec![
                vec![CellValue::from("x, y"), CellValue::Number(Decimal::from_str("2.50").unwrap())],
                vec![CellValue::Empty, CellValue::from("z")],
            ],
        );

        write_table(&path, &table).unwrap();
        let back = read_table(&path, true).unwrap();

        assert_eq!(back.header, table.header);
        assert_eq!(back.cell(0, 0), &CellValue::from("x, y"));
        assert_eq!(back.cell(0, 1), &CellValue::from("2.5"));
        assert_eq!(back.cell(1, 0), &CellValue::Empty);
    }

    #[test]
    fn test_grid_round_trip_keeps_row_numbers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grid.csv");
        let mut grid = MemoryGrid::new();
        grid.set_cell(1, 1, CellValue::from("Invoice"));
        grid.set_cell(18, 3, CellValue::from("Масло"));

        save_grid(&path, &grid).unwrap();
        let loaded = load_grid(&path).unwrap();

        assert_eq!(loaded.cell(1, 1), CellValue::from("Invoice"));
        assert_eq!(loaded.cell(18, 3), CellValue::from("Масло"));
        assert_eq!(loaded.extent(), (18, 3));
    }

    #[test]
    fn test_data_to_cell() {
        assert_eq!(data_to_cell(&Data::Int(7)), CellValue::Number(Decimal::from(7)));
        assert_eq!(
            data_to_cell(&Data::Float(2.5)),
            CellValue::Number(Decimal::from_str("2.5").unwrap())
        );
        assert_eq!(data_to_cell(&Data::String("  ".to_string())), CellValue::Empty);
        assert_eq!(data_to_cell(&Data::Bool(true)), CellValue::from("TRUE"));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(read_table(Path::new("/nonexistent/table.xlsx"), false).is_err());
    }
}
