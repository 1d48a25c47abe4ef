use std::collections::BTreeMap;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Result, StreamingError};
use crate::terms::sort_terms;

/// Section value written when a group has no usable section identifier.
pub const UNKNOWN_SECTION: &str = "Unknown Section";

/// Level bucket used for course codes without any digits.
pub const UNKNOWN_LEVEL: &str = "Unknown";

// ── Cell ──────────────────────────────────────────────────────────────────────

/// A single value read from a spreadsheet or CSV table.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Cell {
    /// No value present (blank cell, empty CSV field).
    #[default]
    Empty,
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
}

impl Cell {
    /// `true` when the cell carries no value at all.
    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    /// `true` when the cell is missing or stringifies to whitespace only.
    pub fn is_blank(&self) -> bool {
        self.is_missing() || self.to_string().trim().is_empty()
    }

    /// Stringified value, or `None` for a missing cell.
    pub fn as_text(&self) -> Option<String> {
        if self.is_missing() {
            None
        } else {
            Some(self.to_string())
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Int(i) => write!(f, "{i}"),
            // Whole floats render like integers so `1.0` and `"1"` agree.
            Cell::Float(v) if v.is_finite() && v.fract() == 0.0 => write!(f, "{v:.0}"),
            Cell::Float(v) => write!(f, "{v}"),
            Cell::Text(s) => f.write_str(s),
            Cell::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Text(s)
    }
}

impl From<i64> for Cell {
    fn from(i: i64) -> Self {
        Cell::Int(i)
    }
}

// ── CleanRecord ───────────────────────────────────────────────────────────────

/// One deduplicated (person, course, section) group produced by the normalizer.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanRecord {
    /// Person identifier (`Uniquename`); `Empty` when the source had none.
    pub instructor: Cell,
    /// Trimmed, uppercased course code.
    pub course: String,
    /// Original section value, or [`UNKNOWN_SECTION`].
    pub section: Cell,
    /// Deduplicated languages joined with `", "`.
    pub language: String,
    /// Number of raw rows in the group.
    pub reservations: u64,
    /// First non-missing enrollment figure in the group.
    pub students: u64,
}

// ── Summary tree ──────────────────────────────────────────────────────────────

/// Student and reservation counts for one course level within a department.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelBucket {
    #[serde(default)]
    pub students: u64,
    #[serde(default)]
    pub reservations: u64,
}

/// Per-department totals plus a breakdown by level.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepartmentSummary {
    #[serde(default)]
    pub levels: BTreeMap<String, LevelBucket>,
    #[serde(default)]
    pub total_students: u64,
    #[serde(default)]
    pub total_reservations: u64,
}

/// Everything recorded for one academic term.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermSummary {
    #[serde(default)]
    pub total_students: u64,
    #[serde(default)]
    pub total_reservations: u64,
    #[serde(default)]
    pub departments: BTreeMap<String, DepartmentSummary>,
}

impl TermSummary {
    /// Add one record's counts at level, department and term granularity.
    ///
    /// Fails with [`StreamingError::InvalidNumber`] (row `0`, see
    /// [`StreamingError::at_row`]) when any running sum would overflow; the
    /// summary is left unchanged in that case.
    pub fn add(
        &mut self,
        department: &str,
        level: &str,
        students: u64,
        reservations: u64,
    ) -> Result<()> {
        let dept = self.departments.get(department);
        let bucket = dept
            .and_then(|d| d.levels.get(level))
            .copied()
            .unwrap_or_default();
        let (dept_students, dept_reservations) = dept
            .map(|d| (d.total_students, d.total_reservations))
            .unwrap_or_default();

        let (Some(level_students), Some(dept_students), Some(term_students)) = (
            bucket.students.checked_add(students),
            dept_students.checked_add(students),
            self.total_students.checked_add(students),
        ) else {
            return Err(overflow("students total", students));
        };
        let (Some(level_reservations), Some(dept_reservations), Some(term_reservations)) = (
            bucket.reservations.checked_add(reservations),
            dept_reservations.checked_add(reservations),
            self.total_reservations.checked_add(reservations),
        ) else {
            return Err(overflow("reservations total", reservations));
        };

        let dept = self.departments.entry(department.to_string()).or_default();
        let bucket = dept.levels.entry(level.to_string()).or_default();
        bucket.students = level_students;
        bucket.reservations = level_reservations;
        dept.total_students = dept_students;
        dept.total_reservations = dept_reservations;
        self.total_students = term_students;
        self.total_reservations = term_reservations;
        Ok(())
    }

    /// `true` when every total equals the sum of its children.
    ///
    /// A sum that overflows `u64` counts as inconsistent.
    pub fn totals_consistent(&self) -> bool {
        let mut students = Some(0u64);
        let mut reservations = Some(0u64);
        for dept in self.departments.values() {
            let lvl_students = checked_sum(dept.levels.values().map(|l| l.students));
            let lvl_reservations = checked_sum(dept.levels.values().map(|l| l.reservations));
            if lvl_students != Some(dept.total_students)
                || lvl_reservations != Some(dept.total_reservations)
            {
                return false;
            }
            students = students.and_then(|s| s.checked_add(dept.total_students));
            reservations = reservations.and_then(|r| r.checked_add(dept.total_reservations));
        }
        students == Some(self.total_students) && reservations == Some(self.total_reservations)
    }
}

fn checked_sum(mut values: impl Iterator<Item = u64>) -> Option<u64> {
    values.try_fold(0u64, u64::checked_add)
}

fn overflow(field: &str, value: u64) -> StreamingError {
    StreamingError::InvalidNumber {
        field: field.to_string(),
        value: value.to_string(),
        row: 0,
    }
}

// ── TermMap ───────────────────────────────────────────────────────────────────

/// Term label → summary, kept in chronological order.
///
/// Serialized as a JSON object whose key order is the chronological order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TermMap(Vec<(String, TermSummary)>);

impl TermMap {
    /// Replace (or insert) `label` and re-sort chronologically.
    pub fn insert(&mut self, label: impl Into<String>, summary: TermSummary) {
        let label = label.into();
        match self.0.iter_mut().find(|(l, _)| *l == label) {
            Some((_, existing)) => *existing = summary,
            None => self.0.push((label, summary)),
        }
        sort_terms(&mut self.0);
    }

    pub fn get(&self, label: &str) -> Option<&TermSummary> {
        self.0.iter().find(|(l, _)| l == label).map(|(_, s)| s)
    }

    /// Labels in stored order.
    pub fn labels(&self) -> Vec<&str> {
        self.0.iter().map(|(l, _)| l.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TermSummary)> {
        self.0.iter().map(|(l, s)| (l.as_str(), s))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for TermMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (label, summary) in &self.0 {
            map.serialize_entry(label, summary)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for TermMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct TermMapVisitor;

        impl<'de> Visitor<'de> for TermMapVisitor {
            type Value = TermMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of term labels to term summaries")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut access: A,
            ) -> std::result::Result<TermMap, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((label, summary)) = access.next_entry::<String, TermSummary>()? {
                    // Last occurrence wins, matching JSON object semantics.
                    entries.retain(|(l, _): &(String, TermSummary)| *l != label);
                    entries.push((label, summary));
                }
                Ok(TermMap(entries))
            }
        }

        deserializer.deserialize_map(TermMapVisitor)
    }
}

// ── MasterStore ───────────────────────────────────────────────────────────────

/// The persisted multi-term summary document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MasterStore {
    #[serde(default)]
    pub terms: TermMap,
    /// Top-level keys this tool does not manage, carried through untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl MasterStore {
    /// Parse a store document from UTF-8 JSON bytes.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Serialize as pretty-printed JSON (2-space indent).
    pub fn to_json_pretty(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Replace the summary for `term` wholesale and re-sort terms.
    pub fn merge_term(&mut self, term: &str, summary: TermSummary) {
        self.terms.insert(term, summary);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
