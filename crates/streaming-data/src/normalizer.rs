//! Raw export → [`CleanRecord`] normalization.
//!
//! A raw export has one row per streaming reservation. Rows are grouped by
//! (person, course, section) and each group collapses to a single record
//! carrying the reservation count, the distinct languages and one enrollment
//! figure.

use std::collections::HashMap;

use streaming_core::courses::{first_digit_run, is_test_course, normalize_course};
use streaming_core::models::{Cell, CleanRecord, UNKNOWN_SECTION};
use streaming_core::{Result, StreamingError};
use tracing::debug;

use crate::table::{Row, Table};

/// Required raw export headers, in (person, course, section, language,
/// enrollment) order. Matched case-insensitively.
pub const RAW_COLUMNS: [&str; 5] = [
    "Uniquename",
    "Course",
    "Section",
    "CIR_COL::LANGUAGE",
    "Enrollment",
];

/// Null-aware grouping key: missing person/section values form their own group.
type GroupKey = (Option<String>, String, Option<String>);

/// Rows belonging to one (person, course, section) group, in file order,
/// each paired with its 1-based sheet line (header is line 1).
struct Group<'a> {
    instructor: Cell,
    course: String,
    section: Cell,
    rows: Vec<(usize, Row<'a>)>,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Collapse a raw export into one [`CleanRecord`] per group.
///
/// Records are returned in the order each group was first seen.
pub fn normalize(table: &Table) -> Result<Vec<CleanRecord>> {
    let [person_col, course_col, section_col, language_col, enrollment_col] =
        table.resolve_columns(RAW_COLUMNS)?;

    let mut index: HashMap<GroupKey, usize> = HashMap::new();
    let mut groups: Vec<Group<'_>> = Vec::new();
    let mut dropped = 0usize;

    for (idx, row) in table.rows().enumerate() {
        let course_cell = row.get(course_col);
        if course_cell.is_blank() {
            dropped += 1;
            continue;
        }
        let course = normalize_course(&course_cell.to_string());
        if is_test_course(&course) {
            debug!("Dropping test-course row {:?}", course);
            dropped += 1;
            continue;
        }

        let instructor = row.get(person_col);
        let section = row.get(section_col);
        let key: GroupKey = (instructor.as_text(), course.clone(), section.as_text());

        let slot = *index.entry(key).or_insert_with(|| {
            groups.push(Group {
                instructor: instructor.clone(),
                course,
                section: section.clone(),
                rows: Vec::new(),
            });
            groups.len() - 1
        });
        groups[slot].rows.push((idx + 2, row));
    }

    debug!(
        "Normalizing {} rows into {} groups ({} dropped)",
        table.len(),
        groups.len(),
        dropped
    );

    groups
        .into_iter()
        .map(|group| {
            let language = join_languages(group.rows.iter().map(|(_, r)| r.get(language_col)));
            let students = first_enrollment(
                group
                    .rows
                    .iter()
                    .map(|(line, r)| (*line, r.get(enrollment_col))),
            )?;
            let section = if group.section.is_blank() {
                Cell::from(UNKNOWN_SECTION)
            } else {
                group.section
            };
            Ok(CleanRecord {
                instructor: group.instructor,
                course: group.course,
                section,
                language,
                reservations: group.rows.len() as u64,
                students,
            })
        })
        .collect()
}

/// Trim, drop empties, dedupe by first occurrence and join with `", "`.
pub fn join_languages<'a>(cells: impl Iterator<Item = &'a Cell>) -> String {
    let mut seen: Vec<String> = Vec::new();
    for cell in cells {
        let Some(text) = cell.as_text() else {
            continue;
        };
        let lang = text.trim();
        if !lang.is_empty() && !seen.iter().any(|s| s == lang) {
            seen.push(lang.to_string());
        }
    }
    seen.join(", ")
}

/// Digits of the first non-missing enrollment cell, or `0`.
///
/// `cells` yields `(line, cell)` pairs. Only the first non-missing value is
/// consulted; later rows are assumed to repeat it.
pub fn first_enrollment<'a>(mut cells: impl Iterator<Item = (usize, &'a Cell)>) -> Result<u64> {
    let Some((line, cell)) = cells.find(|(_, c)| !c.is_missing()) else {
        return Ok(0);
    };
    let raw = cell.to_string();
    match first_digit_run(&raw) {
        Some(digits) => digits
            .parse::<u64>()
            .map_err(|_| StreamingError::InvalidNumber {
                field: "Enrollment".to_string(),
                value: raw.clone(),
                row: line,
            }),
        None => Ok(0),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
