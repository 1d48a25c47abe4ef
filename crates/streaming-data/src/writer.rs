//! Processed-workbook output.
//!
//! Writes clean records as a single-sheet xlsx named after the term, ready
//! for manual review before the merge step.

use rust_xlsxwriter::{Workbook, Worksheet, XlsxError};
use streaming_core::models::{Cell, CleanRecord};
use streaming_core::{Result, StreamingError};

use crate::table::Table;

/// Column headers of the processed workbook, in order.
pub const CLEAN_COLUMNS: [&str; 6] = [
    "Instructor",
    "Course",
    "Section",
    "Language",
    "Reservations",
    "Students Enrolled",
];

/// Column indices (must match [`CLEAN_COLUMNS`])
mod cols {
    pub const INSTRUCTOR: usize = 0;
    pub const COURSE: usize = 1;
    pub const SECTION: usize = 2;
    pub const LANGUAGE: usize = 3;
    pub const RESERVATIONS: usize = 4;
    pub const STUDENTS: usize = 5;
}

/// Largest integer magnitude an xlsx number cell holds exactly (`2^53`).
const MAX_EXACT_NUMBER: u64 = 1 << 53;

/// Suggested file name for a term's processed workbook.
pub fn processed_file_name(term: &str) -> String {
    format!("{}_processed.xlsx", term.replace(' ', "_"))
}

/// Render records as xlsx bytes with one sheet named `term`.
pub fn write_clean_workbook(term: &str, records: &[CleanRecord]) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    worksheet
        .set_name(term)
        .map_err(|e| StreamingError::InvalidSheetName {
            name: term.to_string(),
            reason: e.to_string(),
        })?;
    let table = clean_table(records);
    write_header(worksheet, table.headers()).map_err(xlsx_error)?;

    for (idx, row) in table.rows().enumerate() {
        let row_num = idx as u32 + 1;
        for col in 0..CLEAN_COLUMNS.len() {
            write_cell(worksheet, row_num, col as u16, row.get(col)).map_err(xlsx_error)?;
        }
    }

    workbook.save_to_buffer().map_err(xlsx_error)
}

/// The same records as an in-memory [`Table`] with [`CLEAN_COLUMNS`] headers.
///
/// Counts that do not fit an `i64` are kept exactly as text.
pub fn clean_table(records: &[CleanRecord]) -> Table {
    let rows = records
        .iter()
        .map(|r| {
            let mut cells = vec![Cell::Empty; CLEAN_COLUMNS.len()];
            cells[cols::INSTRUCTOR] = r.instructor.clone();
            cells[cols::COURSE] = Cell::Text(r.course.clone());
            cells[cols::SECTION] = r.section.clone();
            if !r.language.is_empty() {
                cells[cols::LANGUAGE] = Cell::Text(r.language.clone());
            }
            cells[cols::RESERVATIONS] = count_cell(r.reservations);
            cells[cols::STUDENTS] = count_cell(r.students);
            cells
        })
        .collect();
    Table::new(CLEAN_COLUMNS.iter().map(|c| c.to_string()).collect(), rows)
}

fn count_cell(count: u64) -> Cell {
    i64::try_from(count)
        .map(Cell::Int)
        .unwrap_or_else(|_| Cell::Text(count.to_string()))
}

fn write_header(ws: &mut Worksheet, headers: &[String]) -> std::result::Result<(), XlsxError> {
    for (col, name) in headers.iter().enumerate() {
        ws.write_string(0, col as u16, name)?;
    }
    Ok(())
}

fn write_cell(
    ws: &mut Worksheet,
    row: u32,
    col: u16,
    cell: &Cell,
) -> std::result::Result<(), XlsxError> {
    match cell {
        Cell::Empty => {}
        // Excel numbers are doubles; larger integers are written as text.
        Cell::Int(i) if i.unsigned_abs() > MAX_EXACT_NUMBER => {
            ws.write_string(row, col, i.to_string())?;
        }
        Cell::Int(i) => {
            ws.write_number(row, col, *i as f64)?;
        }
        Cell::Float(f) => {
            ws.write_number(row, col, *f)?;
        }
        Cell::Text(s) => {
            ws.write_string(row, col, s)?;
        }
        Cell::Bool(b) => {
            ws.write_boolean(row, col, *b)?;
        }
    }
    Ok(())
}

fn xlsx_error(e: XlsxError) -> StreamingError {
    StreamingError::Other(anyhow::anyhow!("Failed to write workbook: {e}"))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
