//! In-memory tabular data with named-column lookup.
//!
//! Both the normalizer and the aggregator work against [`Table`]; the
//! readers in [`crate::reader`] build one from xlsx or CSV input.

use streaming_core::models::Cell;
use streaming_core::{Result, StreamingError};

static EMPTY: Cell = Cell::Empty;

/// A header row plus data rows of [`Cell`] values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Build a table. Header names are trimmed.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let headers = headers.into_iter().map(|h| h.trim().to_string()).collect();
        Self { headers, rows }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterate data rows in file order.
    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.rows.iter().map(|cells| Row { cells })
    }

    /// Index of `name`, compared case-insensitively.
    pub fn column(&self, name: &str) -> Option<usize> {
        let wanted = name.trim().to_lowercase();
        self.headers.iter().position(|h| h.to_lowercase() == wanted)
    }

    /// Resolve every name in `required` to a column index.
    ///
    /// Fails with [`StreamingError::MissingColumns`] listing each missing name
    /// (lowercased) and the headers that were found.
    pub fn resolve_columns<const N: usize>(&self, required: [&str; N]) -> Result<[usize; N]> {
        let mut indices = [0usize; N];
        let mut missing = Vec::new();
        for (slot, name) in indices.iter_mut().zip(required) {
            match self.column(name) {
                Some(idx) => *slot = idx,
                None => missing.push(name.to_lowercase()),
            }
        }
        if missing.is_empty() {
            Ok(indices)
        } else {
            Err(StreamingError::MissingColumns {
                missing,
                found: self.headers.clone(),
            })
        }
    }
}

/// A borrowed data row.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    cells: &'a [Cell],
}

impl<'a> Row<'a> {
    /// Cell at `idx`; short rows read as [`Cell::Empty`].
    pub fn get(&self, idx: usize) -> &'a Cell {
        self.cells.get(idx).unwrap_or(&EMPTY)
    }
}
