//! Academic term labels: normalization and chronological ordering.
//!
//! Labels look like `"Fall 2025"`. They are not strictly validated; anything
//! that does not match sorts with year `0` and/or after the known seasons.

use crate::error::{Result, StreamingError};

// ── Season ────────────────────────────────────────────────────────────────────

/// Academic seasons in calendar order within a year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Season {
    Winter,
    SpSu,
    Fall,
    /// Any unrecognised first token.
    Other,
}

impl Season {
    /// Match the exact season token used in term labels.
    pub fn from_token(token: &str) -> Self {
        match token {
            "Winter" => Season::Winter,
            "SpSu" => Season::SpSu,
            "Fall" => Season::Fall,
            _ => Season::Other,
        }
    }

    /// Sort rank: Winter=0, SpSu=1, Fall=2, anything else=3.
    pub fn rank(self) -> u8 {
        match self {
            Season::Winter => 0,
            Season::SpSu => 1,
            Season::Fall => 2,
            Season::Other => 3,
        }
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Collapse whitespace runs in a user-entered label and trim it.
///
/// Returns [`StreamingError::Config`] when nothing is left.
pub fn normalize_term_label(raw: &str) -> Result<String> {
    let label = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if label.is_empty() {
        return Err(StreamingError::Config("term label must not be empty".into()));
    }
    Ok(label)
}

/// Chronological sort key `(year, season rank)` for a term label.
///
/// The year is the second whitespace token when it is all ASCII digits,
/// otherwise `0`.
pub fn term_sort_key(label: &str) -> (u64, u8) {
    let mut parts = label.split_whitespace();
    let season = Season::from_token(parts.next().unwrap_or(""));
    let year = parts
        .next()
        .filter(|y| !y.is_empty() && y.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|y| y.parse::<u64>().ok())
        .unwrap_or(0);
    (year, season.rank())
}

/// Stable-sort `(label, value)` pairs by [`term_sort_key`].
pub fn sort_terms<T>(entries: &mut [(String, T)]) {
    entries.sort_by_key(|(label, _)| term_sort_key(label));
}

// ── Tests ─────────────────────────────────────────────────────────────────────
