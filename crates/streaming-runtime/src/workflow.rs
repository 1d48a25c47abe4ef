//! Upload workflow: prepare, merge, backup and restore.
//!
//! Every step takes the term label and the store it operates on as explicit
//! arguments. The store is read in full, changed in memory and written back
//! in full; nothing is written unless the whole step succeeded.

use std::path::{Path, PathBuf};

use streaming_core::models::{MasterStore, TermSummary};
use streaming_core::terms::normalize_term_label;
use streaming_core::{Result, StreamingError};
use streaming_data::aggregator::TermAggregator;
use streaming_data::normalizer::normalize;
use streaming_data::reader::{read_table, SheetSelector};
use streaming_data::table::Table;
use streaming_data::writer::{processed_file_name, write_clean_workbook};
use tracing::info;

use crate::backups::BackupManager;
use crate::blob_store::BlobStore;

// ── Public types ──────────────────────────────────────────────────────────────

/// Result of the prepare step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrepareOutcome {
    /// Normalized term label.
    pub term: String,
    /// Where the processed workbook was written.
    pub output: PathBuf,
    /// Number of clean records written.
    pub records: usize,
}

/// Result of the merge step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Normalized term label.
    pub term: String,
    /// The summary now stored for the term.
    pub summary: TermSummary,
    /// Backup of the pre-merge store, when one was taken.
    pub backup: Option<PathBuf>,
    /// All term labels in the store after the merge, in order.
    pub terms: Vec<String>,
}

// ── Prepare ───────────────────────────────────────────────────────────────────

/// Step 1: normalize a raw export and write the processed workbook.
///
/// `output` defaults to `<Term>_processed.xlsx` next to the input.
pub fn prepare(input: &Path, term: &str, output: Option<&Path>) -> Result<PrepareOutcome> {
    let term = normalize_term_label(term)?;
    let table = read_table(input, SheetSelector::First)?;
    let records = normalize(&table)?;
    let bytes = write_clean_workbook(&term, &records)?;

    let output = match output {
        Some(p) => p.to_path_buf(),
        None => input
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(processed_file_name(&term)),
    };
    std::fs::write(&output, bytes)?;

    info!(
        "Prepared {} records for '{}' -> {}",
        records.len(),
        term,
        output.display()
    );
    Ok(PrepareOutcome {
        term,
        output,
        records: records.len(),
    })
}

// ── UploadWorkflow ────────────────────────────────────────────────────────────

/// The two-step upload process bound to one store.
pub struct UploadWorkflow<S: BlobStore> {
    store: S,
    backups: Option<BackupManager>,
}

impl<S: BlobStore> UploadWorkflow<S> {
    /// Create a workflow. Pass `None` for `backups` to never take backups.
    pub fn new(store: S, backups: Option<BackupManager>) -> Self {
        Self { store, backups }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Current store contents.
    pub fn load(&self) -> Result<MasterStore> {
        MasterStore::from_json(&self.store.get()?)
    }

    /// Step 2: aggregate a reviewed file and merge it into the store.
    ///
    /// Workbooks are read from the sheet named after the term.
    pub fn merge_file(&self, input: &Path, term: &str, backup: bool) -> Result<MergeOutcome> {
        let term = normalize_term_label(term)?;
        let table = read_table(input, SheetSelector::Named(&term))?;
        self.merge_table(&table, &term, backup)
    }

    /// Aggregate `table` as `term` and replace that term in the store.
    ///
    /// The store is left untouched when reading, aggregation or the backup
    /// fails.
    pub fn merge_table(&self, table: &Table, term: &str, backup: bool) -> Result<MergeOutcome> {
        let term = normalize_term_label(term)?;
        let current = self.store.get()?;
        let mut master = MasterStore::from_json(&current)?;

        let summary = TermAggregator::aggregate_table(table)?;

        let backup = match (&self.backups, backup) {
            (Some(mgr), true) => Some(mgr.write(&master.to_json_pretty()?)?),
            _ => None,
        };

        master.merge_term(&term, summary.clone());
        self.store.put(&master.to_json_pretty()?)?;

        info!(
            "Term '{}' uploaded to {}: {} students, {} reservations across {} departments",
            term,
            self.store.describe(),
            summary.total_students,
            summary.total_reservations,
            summary.departments.len()
        );
        Ok(MergeOutcome {
            term,
            summary,
            backup,
            terms: master.terms.labels().iter().map(|l| l.to_string()).collect(),
        })
    }

    /// Write a pretty-printed copy of the current store.
    ///
    /// Goes to `output` when given, otherwise to a new timestamped file in
    /// the backup directory.
    pub fn backup(&self, output: Option<&Path>) -> Result<PathBuf> {
        let bytes = self.load()?.to_json_pretty()?;
        match (output, &self.backups) {
            (Some(path), _) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(path, &bytes)?;
                info!("Backup written to {}", path.display());
                Ok(path.to_path_buf())
            }
            (None, Some(mgr)) => mgr.write(&bytes),
            (None, None) => Err(StreamingError::Config(
                "no backup output path or backup directory configured".into(),
            )),
        }
    }

    /// Overwrite the store with the contents of a backup file.
    ///
    /// The file must parse as a store document; its bytes are written as-is.
    pub fn restore(&self, backup: &Path) -> Result<MasterStore> {
        let bytes = std::fs::read(backup).map_err(|source| StreamingError::FileRead {
            path: backup.to_path_buf(),
            source,
        })?;
        let restored = MasterStore::from_json(&bytes)?;
        self.store.put(&bytes)?;
        info!(
            "Store {} overwritten with backup {} ({} terms)",
            self.store.describe(),
            backup.display(),
            restored.terms.len()
        );
        Ok(restored)
    }

    /// Write an empty store document unless one already exists.
    ///
    /// Returns `true` when a new document was created.
    pub fn init(&self) -> Result<bool> {
        match self.store.get() {
            Ok(_) => Ok(false),
            Err(StreamingError::BlobNotFound(_)) => {
                self.store.put(&MasterStore::default().to_json_pretty()?)?;
                info!("Initialized empty store at {}", self.store.describe());
                Ok(true)
            }
            Err(e) => Err(e),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
