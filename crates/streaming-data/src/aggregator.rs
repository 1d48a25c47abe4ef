//! Term aggregation over clean records.
//!
//! Folds one term's reviewed records into a [`TermSummary`]: counts are
//! summed per (department, level), per department and per term.

use streaming_core::courses::{department_key, is_practice_course, level_bucket};
use streaming_core::models::{Cell, TermSummary};
use streaming_core::{Result, StreamingError};
use tracing::debug;

use crate::table::Table;

/// Columns read from the reviewed workbook. Matched case-insensitively.
pub const TERM_COLUMNS: [&str; 4] = ["Course", "Language", "Students Enrolled", "Reservations"];

// ── TermAggregator ────────────────────────────────────────────────────────────

/// Stateless helper that builds a fresh [`TermSummary`] for one term.
pub struct TermAggregator;

impl TermAggregator {
    /// Aggregate a reviewed table.
    ///
    /// Rows with a blank or practice course are skipped. Any other row whose
    /// student or reservation count is not a non-negative number, or whose
    /// counts would overflow a running total, aborts the whole term with
    /// [`StreamingError::InvalidNumber`].
    pub fn aggregate_table(table: &Table) -> Result<TermSummary> {
        let [course_col, language_col, students_col, reservations_col] =
            table.resolve_columns(TERM_COLUMNS)?;

        let mut summary = TermSummary::default();
        let mut skipped = 0usize;

        for (idx, row) in table.rows().enumerate() {
            let line = idx + 2;
            let course = row.get(course_col).to_string();
            let language = row.get(language_col).as_text();

            let Some((department, level)) = Self::classify(&course, language.as_deref()) else {
                skipped += 1;
                continue;
            };

            let students = parse_count(row.get(students_col), TERM_COLUMNS[2], line)?;
            let reservations = parse_count(row.get(reservations_col), TERM_COLUMNS[3], line)?;
            summary
                .add(&department, &level, students, reservations)
                .map_err(|e| e.at_row(line))?;
        }

        debug!(
            "Aggregated {} rows into {} departments ({} skipped)",
            table.len(),
            summary.departments.len(),
            skipped
        );
        Ok(summary)
    }

    /// `(department key, level bucket)` for a course, or `None` when the row
    /// does not count (blank or practice course).
    pub fn classify(course: &str, language: Option<&str>) -> Option<(String, String)> {
        let course = course.trim();
        if course.is_empty() || is_practice_course(course) {
            debug!("Skipping course {:?}", course);
            return None;
        }
        let department = department_key(course, language)?;
        Some((department, level_bucket(course)))
    }
}

/// `2^64`: truncated float counts must stay below this to fit a `u64`.
const COUNT_FLOAT_LIMIT: f64 = 18_446_744_073_709_551_616.0;

/// Integer parse for count columns.
///
/// Accepts non-negative integers, finite floats (truncated toward zero) and
/// text holding a non-negative integer. Negative counts are rejected.
fn parse_count(cell: &Cell, field: &str, line: usize) -> Result<u64> {
    let parsed = match cell {
        Cell::Int(i) => u64::try_from(*i).ok(),
        Cell::Float(f) if f.is_finite() => {
            let whole = f.trunc();
            (whole >= 0.0 && whole < COUNT_FLOAT_LIMIT).then_some(whole as u64)
        }
        Cell::Text(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| StreamingError::InvalidNumber {
        field: field.to_string(),
        value: cell.to_string(),
        row: line,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use streaming_core::models::{LevelBucket, MasterStore, UNKNOWN_LEVEL};

    fn term_table(rows: Vec<[Cell; 4]>) -> Table {
        Table::new(
            TERM_COLUMNS.iter().map(|s| s.to_string()).collect(),
            rows.into_iter().map(|r| r.to_vec()).collect(),
        )
    }

    fn row(course: &str, language: &str, students: i64, reservations: i64) -> [Cell; 4] {
        let language = if language.is_empty() {
            Cell::Empty
        } else {
            Cell::from(language)
        };
        [
            Cell::from(course),
            language,
            Cell::Int(students),
            Cell::Int(reservations),
        ]
    }

    // ── aggregate_table ───────────────────────────────────────────────────────

    #[test]
    fn test_aggregate_single_record() {
        let table = term_table(vec![row("FRENCH 220", "French", 25, 2)]);
        let summary = TermAggregator::aggregate_table(&table).unwrap();

        let french = &summary.departments["FRENCH"];
        assert_eq!(
            french.levels["200"],
            LevelBucket {
                students: 25,
                reservations: 2
            }
        );
        assert_eq!(french.total_students, 25);
        assert_eq!(french.total_reservations, 2);
        assert_eq!(summary.total_students, 25);
        assert_eq!(summary.total_reservations, 2);
    }

    #[test]
    fn test_aggregate_departments_and_levels() {
        let table = term_table(vec![
            row("FRENCH 220", "French", 25, 2),
            row("FRENCH 231", "French", 10, 1),
            row("FRENCH 101", "French", 30, 3),
            row("ASIANLAN 101", "Japanese, Korean", 20, 1),
            row("ASIANLAN 102", "Korean", 15, 1),
            row("SEMINAR", "", 5, 1),
        ]);
        let summary = TermAggregator::aggregate_table(&table).unwrap();

        let keys: Vec<&str> = summary.departments.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec!["ASIANLAN: JAPANESE", "ASIANLAN: KOREAN", "FRENCH", "SEMINAR"]
        );
        assert_eq!(summary.departments["FRENCH"].levels["200"].students, 35);
        assert_eq!(summary.departments["FRENCH"].levels["100"].students, 30);
        assert_eq!(summary.departments["SEMINAR"].levels[UNKNOWN_LEVEL].students, 5);
        assert_eq!(summary.total_students, 105);
        assert_eq!(summary.total_reservations, 9);
        assert!(summary.totals_consistent());
    }

    #[test]
    fn test_aggregate_skips_practice_and_blank_courses() {
        let table = term_table(vec![
            row("FRENCH 101 PRACTICE", "French", 99, 9),
            row("   ", "French", 99, 9),
            [Cell::Empty, Cell::Empty, Cell::Int(1), Cell::Int(1)],
            row("GERMAN 101", "German", 18, 1),
        ]);
        let summary = TermAggregator::aggregate_table(&table).unwrap();
        assert_eq!(summary.departments.len(), 1);
        assert_eq!(summary.total_students, 18);
    }

    #[test]
    fn test_aggregate_skipped_rows_are_not_parsed() {
        let table = term_table(vec![[
            Cell::from("Practice Room"),
            Cell::Empty,
            Cell::from("lots"),
            Cell::Empty,
        ]]);
        let summary = TermAggregator::aggregate_table(&table).unwrap();
        assert_eq!(summary, TermSummary::default());
    }

    #[test]
    fn test_aggregate_rejects_non_numeric_students() {
        let table = term_table(vec![
            row("FRENCH 220", "French", 25, 2),
            [
                Cell::from("GERMAN 101"),
                Cell::from("German"),
                Cell::from("lots"),
                Cell::Int(1),
            ],
        ]);
        let err = TermAggregator::aggregate_table(&table).unwrap_err();
        match err {
            StreamingError::InvalidNumber { field, value, row } => {
                assert_eq!(field, "Students Enrolled");
                assert_eq!(value, "lots");
                assert_eq!(row, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_aggregate_rejects_missing_reservations() {
        let table = term_table(vec![[
            Cell::from("GERMAN 101"),
            Cell::from("German"),
            Cell::Int(18),
            Cell::Empty,
        ]]);
        assert!(matches!(
            TermAggregator::aggregate_table(&table),
            Err(StreamingError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn test_aggregate_accepts_whole_floats_and_numeric_text() {
        let table = term_table(vec![[
            Cell::from("GERMAN 101"),
            Cell::from("German"),
            Cell::Float(18.0),
            Cell::from(" 2 "),
        ]]);
        let summary = TermAggregator::aggregate_table(&table).unwrap();
        assert_eq!(summary.total_students, 18);
        assert_eq!(summary.total_reservations, 2);
    }

    #[test]
    fn test_aggregate_truncates_fractional_floats() {
        let table = term_table(vec![
            [Cell::from("FRENCH 220"), Cell::Empty, Cell::Float(18.5), Cell::Int(1)],
            [Cell::from("FRENCH 231"), Cell::Empty, Cell::Float(2.99), Cell::Float(-0.5)],
        ]);
        let summary = TermAggregator::aggregate_table(&table).unwrap();
        assert_eq!(summary.departments["FRENCH"].levels["200"].students, 20);
        assert_eq!(summary.total_reservations, 1);
    }

    #[test]
    fn test_aggregate_rejects_negative_counts() {
        let table = term_table(vec![row("FRENCH 220", "French", -3, 1)]);
        match TermAggregator::aggregate_table(&table).unwrap_err() {
            StreamingError::InvalidNumber { field, value, row } => {
                assert_eq!(field, "Students Enrolled");
                assert_eq!(value, "-3");
                assert_eq!(row, 2);
            }
            other => panic!("unexpected error: {other}"),
        }

        let table = term_table(vec![[
            Cell::from("FRENCH 220"),
            Cell::Empty,
            Cell::Int(3),
            Cell::Float(-1.5),
        ]]);
        assert!(matches!(
            TermAggregator::aggregate_table(&table),
            Err(StreamingError::InvalidNumber { row: 2, .. })
        ));
    }

    #[test]
    fn test_aggregate_total_overflow_aborts_term() {
        let table = term_table(vec![
            [
                Cell::from("FRENCH 220"),
                Cell::Empty,
                Cell::from("18446744073709551615"),
                Cell::Int(1),
            ],
            [Cell::from("FRENCH 220"), Cell::Empty, Cell::Int(1), Cell::Int(1)],
        ]);
        match TermAggregator::aggregate_table(&table).unwrap_err() {
            StreamingError::InvalidNumber { field, value, row } => {
                assert_eq!(field, "students total");
                assert_eq!(value, "1");
                assert_eq!(row, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_aggregate_missing_columns() {
        let table = Table::new(vec!["Course".into(), "Language".into()], vec![]);
        let err = TermAggregator::aggregate_table(&table).unwrap_err();
        match err {
            StreamingError::MissingColumns { missing, .. } => {
                assert_eq!(missing, vec!["students enrolled", "reservations"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    // ── merge ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_reupload_replaces_term() {
        let mut store = MasterStore::default();

        let first = term_table(vec![row("FRENCH 220", "French", 25, 2)]);
        store.merge_term("Fall 2025", TermAggregator::aggregate_table(&first).unwrap());

        let second = term_table(vec![row("GERMAN 101", "German", 18, 1)]);
        let expected = TermAggregator::aggregate_table(&second).unwrap();
        store.merge_term("Fall 2025", expected.clone());

        let term = store.terms.get("Fall 2025").unwrap();
        assert_eq!(term, &expected);
        assert!(!term.departments.contains_key("FRENCH"));
        assert_eq!(term.total_students, 18);
    }

    #[test]
    fn test_sum_invariant_across_terms() {
        let mut store = MasterStore::default();
        let tables = [
            ("Fall 2024", vec![row("FRENCH 220", "French", 25, 2), row("FRENCH 101", "", 7, 4)]),
            ("Winter 2025", vec![row("ASIAN 300", "Mandarin", 40, 5), row("X", "", 1, 1)]),
        ];
        for (term, rows) in tables {
            let summary = TermAggregator::aggregate_table(&term_table(rows)).unwrap();
            store.merge_term(term, summary);
        }
        for (_, term) in store.terms.iter() {
            assert!(term.totals_consistent());
            let level_students: u64 = term
                .departments
                .values()
                .flat_map(|d| d.levels.values())
                .map(|l| l.students)
                .sum();
            assert_eq!(level_students, term.total_students);
        }
    }
}
