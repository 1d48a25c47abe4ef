use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the streaming aggregator.
#[derive(Error, Debug)]
pub enum StreamingError {
    /// One or more required columns are absent from the input table.
    #[error("Missing columns: {missing:?}. Found: {found:?}")]
    MissingColumns {
        missing: Vec<String>,
        found: Vec<String>,
    },

    /// The workbook does not contain a sheet with the requested name.
    #[error("Sheet '{sheet}' not found. Available sheets: {available:?}")]
    SheetNotFound {
        sheet: String,
        available: Vec<String>,
    },

    /// The input could not be decoded as a table at all.
    #[error("Unreadable table: {0}")]
    UnreadableTable(String),

    /// The term label cannot be used as a worksheet name.
    #[error("Invalid sheet name '{name}': {reason}")]
    InvalidSheetName { name: String, reason: String },

    /// A required numeric field did not hold an integer.
    #[error("Invalid {field} value {value:?} in row {row}")]
    InvalidNumber {
        field: String,
        value: String,
        row: usize,
    },

    /// The blob store has no persisted document yet.
    #[error("Blob not found: {0}")]
    BlobNotFound(PathBuf),

    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON document could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StreamingError {
    /// `true` for errors caused by the shape of the input rather than its values.
    pub fn is_input_format(&self) -> bool {
        matches!(
            self,
            StreamingError::MissingColumns { .. }
                | StreamingError::SheetNotFound { .. }
                | StreamingError::UnreadableTable(_)
                | StreamingError::InvalidSheetName { .. }
        )
    }

    /// Attach a source row to an [`InvalidNumber`](StreamingError::InvalidNumber)
    /// error. Other variants pass through unchanged.
    pub fn at_row(self, line: usize) -> Self {
        match self {
            StreamingError::InvalidNumber { field, value, .. } => StreamingError::InvalidNumber {
                field,
                value,
                row: line,
            },
            other => other,
        }
    }
}

/// Convenience alias used throughout the streaming crates.
pub type Result<T> = std::result::Result<T, StreamingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_missing_columns() {
        let err = StreamingError::MissingColumns {
            missing: vec!["enrollment".to_string()],
            found: vec!["Uniquename".to_string(), "Course".to_string()],
        };
        assert_eq!(
            err.to_string(),
            r#"Missing columns: ["enrollment"]. Found: ["Uniquename", "Course"]"#
        );
        assert!(err.is_input_format());
    }

    #[test]
    fn test_error_display_sheet_not_found() {
        let err = StreamingError::SheetNotFound {
            sheet: "Fall 2025".to_string(),
            available: vec!["Sheet1".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("'Fall 2025'"));
        assert!(msg.contains("Sheet1"));
    }

    #[test]
    fn test_error_display_invalid_number() {
        let err = StreamingError::InvalidNumber {
            field: "Students Enrolled".to_string(),
            value: "lots".to_string(),
            row: 4,
        };
        assert_eq!(
            err.to_string(),
            r#"Invalid Students Enrolled value "lots" in row 4"#
        );
        assert!(!err.is_input_format());
    }

    #[test]
    fn test_at_row_sets_invalid_number_row() {
        let err = StreamingError::InvalidNumber {
            field: "students total".to_string(),
            value: "1".to_string(),
            row: 0,
        }
        .at_row(7);
        assert!(matches!(err, StreamingError::InvalidNumber { row: 7, .. }));

        let err = StreamingError::Config("x".into()).at_row(7);
        assert!(matches!(err, StreamingError::Config(_)));
    }

    #[test]
    fn test_error_display_file_read() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = StreamingError::FileRead {
            path: PathBuf::from("/some/raw.xlsx"),
            source: io_err,
        };
        let msg = err.to_string();
        assert!(msg.contains("Failed to read file"));
        assert!(msg.contains("/some/raw.xlsx"));
        assert!(msg.contains("no such file"));
    }

    #[test]
    fn test_error_display_blob_not_found() {
        let err = StreamingError::BlobNotFound(PathBuf::from("/missing/store.json"));
        assert_eq!(err.to_string(), "Blob not found: /missing/store.json");
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{invalid}").unwrap_err();
        let err: StreamingError = json_err.into();
        assert!(err.to_string().contains("Failed to parse JSON"));
    }
}
