//! Spreadsheet and CSV loading.
//!
//! Turns an xlsx workbook (via [`calamine`]) or a CSV file (via [`csv`]) into
//! a [`Table`]. The first row is always the header row.

use std::io::Cursor;
use std::path::Path;

use calamine::{Data, Reader, Xlsx};
use streaming_core::models::Cell;
use streaming_core::{Result, StreamingError};
use tracing::debug;

use crate::table::Table;

// ── Public types ──────────────────────────────────────────────────────────────

/// Physical encoding of a tabular input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Xlsx,
    Csv,
}

impl TableFormat {
    /// `.csv` (any case) is CSV; everything else is treated as a workbook.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => TableFormat::Csv,
            _ => TableFormat::Xlsx,
        }
    }
}

/// Which worksheet of a workbook to read. Ignored for CSV.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetSelector<'a> {
    First,
    Named(&'a str),
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Read a table from disk, choosing the format by file extension.
pub fn read_table(path: &Path, sheet: SheetSelector<'_>) -> Result<Table> {
    let bytes = std::fs::read(path).map_err(|source| StreamingError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let table = read_table_from_bytes(&bytes, TableFormat::from_path(path), sheet)?;
    debug!(
        "Read {} rows with headers {:?} from {}",
        table.len(),
        table.headers(),
        path.display()
    );
    Ok(table)
}

/// Decode a table from in-memory bytes.
pub fn read_table_from_bytes(
    bytes: &[u8],
    format: TableFormat,
    sheet: SheetSelector<'_>,
) -> Result<Table> {
    match format {
        TableFormat::Xlsx => read_xlsx(bytes, sheet),
        TableFormat::Csv => read_csv(bytes),
    }
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn read_xlsx(bytes: &[u8], sheet: SheetSelector<'_>) -> Result<Table> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))
        .map_err(|e| StreamingError::UnreadableTable(format!("Error reading Excel: {e}")))?;

    let names = workbook.sheet_names();
    let sheet_name = match sheet {
        SheetSelector::First => names
            .first()
            .cloned()
            .ok_or_else(|| StreamingError::UnreadableTable("Excel file has no sheets".into()))?,
        SheetSelector::Named(wanted) => names
            .iter()
            .find(|n| n.as_str() == wanted)
            .cloned()
            .ok_or_else(|| StreamingError::SheetNotFound {
                sheet: wanted.to_string(),
                available: names.clone(),
            })?,
    };

    let range = workbook.worksheet_range(&sheet_name).map_err(|e| {
        StreamingError::UnreadableTable(format!("Failed to read sheet {sheet_name}: {e}"))
    })?;

    let mut rows = range.rows();
    let headers = rows
        .next()
        .map(|header| header.iter().map(|c| data_to_cell(c).to_string()).collect())
        .unwrap_or_default();
    let data = rows
        .map(|row| row.iter().map(data_to_cell).collect())
        .collect();

    Ok(Table::new(headers, data))
}

fn read_csv(bytes: &[u8]) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|e| StreamingError::UnreadableTable(format!("Error reading CSV: {e}")))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record =
            record.map_err(|e| StreamingError::UnreadableTable(format!("Error reading CSV: {e}")))?;
        rows.push(
            record
                .iter()
                .map(|field| {
                    if field.is_empty() {
                        Cell::Empty
                    } else {
                        Cell::Text(field.to_string())
                    }
                })
                .collect(),
        );
    }

    Ok(Table::new(headers, rows))
}

fn data_to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::Int(i) => Cell::Int(*i),
        Data::Float(f) => Cell::Float(*f),
        Data::String(s) if s.is_empty() => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Bool(b) => Cell::Bool(*b),
        other => Cell::Text(other.to_string()),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use rust_xlsxwriter::Workbook;
    use tempfile::TempDir;

    fn workbook_bytes() -> Vec<u8> {
        let mut workbook = Workbook::new();
        let first = workbook.add_worksheet();
        first.set_name("Raw").unwrap();
        first.write_string(0, 0, "Uniquename").unwrap();
        first.write_string(0, 1, "Section").unwrap();
        first.write_string(1, 0, "abc123").unwrap();
        first.write_number(1, 1, 1.0).unwrap();
        first.write_string(2, 0, "xyz456").unwrap();

        let second = workbook.add_worksheet();
        second.set_name("Fall 2025").unwrap();
        second.write_string(0, 0, "Course").unwrap();
        second.write_string(1, 0, "FRENCH 220").unwrap();
        workbook.save_to_buffer().unwrap()
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(TableFormat::from_path(Path::new("a.CSV")), TableFormat::Csv);
        assert_eq!(TableFormat::from_path(Path::new("a.xlsx")), TableFormat::Xlsx);
        assert_eq!(TableFormat::from_path(Path::new("noext")), TableFormat::Xlsx);
    }

    #[test]
    fn test_read_xlsx_first_sheet() {
        let table =
            read_table_from_bytes(&workbook_bytes(), TableFormat::Xlsx, SheetSelector::First)
                .unwrap();
        assert_eq!(table.headers(), ["Uniquename", "Section"]);
        assert_eq!(table.len(), 2);

        let rows: Vec<_> = table.rows().collect();
        assert_eq!(rows[0].get(0), &Cell::from("abc123"));
        assert_eq!(rows[0].get(1).to_string(), "1");
        assert!(rows[1].get(1).is_missing());
    }

    #[test]
    fn test_read_xlsx_named_sheet() {
        let table = read_table_from_bytes(
            &workbook_bytes(),
            TableFormat::Xlsx,
            SheetSelector::Named("Fall 2025"),
        )
        .unwrap();
        assert_eq!(table.headers(), ["Course"]);
    }

    #[test]
    fn test_read_xlsx_missing_sheet() {
        let err = read_table_from_bytes(
            &workbook_bytes(),
            TableFormat::Xlsx,
            SheetSelector::Named("Winter 2026"),
        )
        .unwrap_err();
        match err {
            StreamingError::SheetNotFound { sheet, available } => {
                assert_eq!(sheet, "Winter 2026");
                assert_eq!(available, vec!["Raw", "Fall 2025"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_read_xlsx_garbage_is_unreadable() {
        let err = read_table_from_bytes(b"not a workbook", TableFormat::Xlsx, SheetSelector::First)
            .unwrap_err();
        assert!(matches!(err, StreamingError::UnreadableTable(_)));
        assert!(err.is_input_format());
    }

    #[test]
    fn test_read_csv_empty_fields_are_missing() {
        let csv = "Uniquename,Course,Section\nabc123,french 220,1\nxyz456,GERMAN 101,\n";
        let table =
            read_table_from_bytes(csv.as_bytes(), TableFormat::Csv, SheetSelector::First).unwrap();
        assert_eq!(table.headers(), ["Uniquename", "Course", "Section"]);
        let rows: Vec<_> = table.rows().collect();
        assert_eq!(rows[0].get(2), &Cell::from("1"));
        assert!(rows[1].get(2).is_missing());
    }

    #[test]
    fn test_read_table_from_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("raw.csv");
        std::fs::write(&path, "Course\nFRENCH 220\n").unwrap();

        let table = read_table(&path, SheetSelector::First).unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_read_table_missing_file() {
        let err = read_table(Path::new("/tmp/does-not-exist-lrc.xlsx"), SheetSelector::First)
            .unwrap_err();
        assert!(matches!(err, StreamingError::FileRead { .. }));
    }
}
