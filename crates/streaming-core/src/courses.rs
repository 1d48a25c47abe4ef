//! Derivations from course codes and language cells.
//!
//! Course codes are free text shaped like `"FRENCH 220"`: a subject token
//! followed by a course number. These helpers turn them into the department
//! keys and level buckets used by the term summary.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::UNKNOWN_LEVEL;

/// Marker substring for non-production rows in raw exports.
pub const TEST_COURSE_MARKER: &str = "testcourse";

/// Marker substring for non-credit practice sections.
pub const PRACTICE_MARKER: &str = "practice";

/// Subject families whose department key carries the first language.
pub const LANGUAGE_SUFFIXED_SUBJECTS: &[&str] = &["asianlan", "slavic", "asian"];

static DIGIT_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]+").expect("regex is valid"));

// ── Text helpers ──────────────────────────────────────────────────────────────

/// First maximal run of ASCII digits in `s`.
pub fn first_digit_run(s: &str) -> Option<&str> {
    DIGIT_RUN.find(s).map(|m| m.as_str())
}

/// Trim and uppercase a raw course cell.
pub fn normalize_course(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// `true` for rows exported from the sandbox test course.
pub fn is_test_course(course: &str) -> bool {
    course.to_lowercase().contains(TEST_COURSE_MARKER)
}

/// `true` for practice sections, which never count toward totals.
pub fn is_practice_course(course: &str) -> bool {
    course.to_lowercase().contains(PRACTICE_MARKER)
}

// ── Department key ────────────────────────────────────────────────────────────

/// First language named in a `"French, German"` style cell.
///
/// Takes the first comma-separated item, then its first word. Returns `None`
/// when nothing is left or the word is the literal `nan` in any case.
pub fn first_language(language: Option<&str>) -> Option<&str> {
    let first = language?.split(',').next()?.split_whitespace().next()?;
    if first.eq_ignore_ascii_case("nan") {
        None
    } else {
        Some(first)
    }
}

/// Department key for a course, e.g. `"FRENCH"` or `"ASIANLAN: JAPANESE"`.
///
/// Returns `None` for a blank course.
pub fn department_key(course: &str, language: Option<&str>) -> Option<String> {
    let raw = course.split_whitespace().next()?.to_lowercase();
    match first_language(language) {
        Some(lang) if LANGUAGE_SUFFIXED_SUBJECTS.contains(&raw.as_str()) => {
            Some(format!("{raw}: {lang}").to_uppercase())
        }
        _ => Some(raw.to_uppercase()),
    }
}

// ── Level ─────────────────────────────────────────────────────────────────────

/// Hundreds bucket for the first number in `course`: `"220"` → `"200"`.
///
/// Courses without digits, or with a number too large to represent, fall into
/// [`UNKNOWN_LEVEL`].
pub fn level_bucket(course: &str) -> String {
    match first_digit_run(course).map(str::parse::<u64>) {
        Some(Ok(n)) => ((n / 100) * 100).to_string(),
        Some(Err(_)) => {
            tracing::warn!("course number out of range in {:?}", course);
            UNKNOWN_LEVEL.to_string()
        }
        None => UNKNOWN_LEVEL.to_string(),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_digit_run() {
        assert_eq!(first_digit_run("25 students"), Some("25"));
        assert_eq!(first_digit_run("approx. 12-15"), Some("12"));
        assert_eq!(first_digit_run("none"), None);
    }

    #[test]
    fn test_normalize_course() {
        assert_eq!(normalize_course("  french 220 "), "FRENCH 220");
    }

    #[test]
    fn test_markers_are_case_insensitive() {
        assert!(is_test_course("SPANISH TESTCOURSE 1"));
        assert!(is_practice_course("FRENCH 101 Practice"));
        assert!(!is_practice_course("FRENCH 101"));
    }

    #[test]
    fn test_first_language() {
        assert_eq!(first_language(Some("Japanese, Korean")), Some("Japanese"));
        assert_eq!(first_language(Some("Brazilian Portuguese")), Some("Brazilian"));
        assert_eq!(first_language(Some("NaN")), None);
        assert_eq!(first_language(Some(" , Korean")), None);
        assert_eq!(first_language(Some("")), None);
        assert_eq!(first_language(None), None);
    }

    #[test]
    fn test_department_key_plain() {
        assert_eq!(department_key("FRENCH 220", Some("French")).unwrap(), "FRENCH");
        assert_eq!(department_key("french 220", None).unwrap(), "FRENCH");
    }

    #[test]
    fn test_department_key_language_suffixed() {
        assert_eq!(
            department_key("ASIANLAN 101", Some("Japanese, Korean")).unwrap(),
            "ASIANLAN: JAPANESE"
        );
        assert_eq!(
            department_key("SLAVIC 250", Some("Russian")).unwrap(),
            "SLAVIC: RUSSIAN"
        );
        assert_eq!(department_key("ASIAN 300", Some("nan")).unwrap(), "ASIAN");
        assert_eq!(department_key("ASIAN 300", None).unwrap(), "ASIAN");
    }

    #[test]
    fn test_department_key_blank_course() {
        assert_eq!(department_key("   ", Some("French")), None);
    }

    #[test]
    fn test_level_bucket() {
        assert_eq!(level_bucket("FRENCH 220"), "200");
        assert_eq!(level_bucket("GERMAN 101"), "100");
        assert_eq!(level_bucket("LATIN 99"), "0");
        assert_eq!(level_bucket("SEMINAR"), UNKNOWN_LEVEL);
        assert_eq!(level_bucket("X 99999999999999999999999"), UNKNOWN_LEVEL);
    }
}
