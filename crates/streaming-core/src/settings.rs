use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the per-user application directory under `$HOME`.
pub const APP_DIR_NAME: &str = ".lrc-streaming";

/// File name of the default local master store.
pub const DEFAULT_STORE_FILE: &str = "master_streaming_terms.json";

/// Root of the per-user application directory (`~/.lrc-streaming`).
pub fn app_dir() -> PathBuf {
    app_dir_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
}

/// Application directory rooted at `base_dir` (used for testing).
pub fn app_dir_in(base_dir: &Path) -> PathBuf {
    base_dir.join(APP_DIR_NAME)
}

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Normalize course-streaming exports and merge them into the term summary
#[derive(Parser, Debug, Clone)]
#[command(
    name = "lrc-streaming",
    about = "Normalize course-streaming exports and merge them into the term summary",
    version
)]
pub struct Settings {
    #[command(subcommand)]
    pub command: Command,

    /// Path of the master store JSON file
    #[arg(long, global = true, env = "LRC_STREAMING_STORE")]
    pub store: Option<PathBuf>,

    /// Directory where store backups are written
    #[arg(long, global = true)]
    pub backup_dir: Option<PathBuf>,

    /// Logging level
    #[arg(long, global = true, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"])]
    pub log_level: String,

    /// Log file path
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Clear saved configuration
    #[arg(long, global = true)]
    pub clear: bool,
}

/// Workflow steps exposed on the command line.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Normalize a raw usage export into a processed workbook for review
    Prepare {
        /// Raw export (.xlsx or .csv)
        #[arg(long)]
        input: PathBuf,
        /// Term label, e.g. "Fall 2025"
        #[arg(long)]
        term: String,
        /// Output workbook path (defaults to <Term>_processed.xlsx)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Aggregate a checked workbook and merge it into the master store
    Merge {
        /// Checked workbook (.xlsx with a sheet named after the term, or .csv)
        #[arg(long)]
        input: PathBuf,
        /// Term label, e.g. "Fall 2025"
        #[arg(long)]
        term: String,
        /// Skip writing a backup of the current store before merging
        #[arg(long)]
        no_backup: bool,
    },
    /// Write a backup copy of the current master store
    Backup {
        /// Backup file path (defaults to a timestamped file in the backup dir)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Overwrite the master store with a backup file
    Restore {
        /// Backup JSON file
        #[arg(long)]
        input: PathBuf,
    },
    /// List available backups
    Backups,
    /// Create an empty master store if none exists
    Init,
}

// ── LastUsedParams ─────────────────────────────────────────────────────────────

/// Persisted last-used parameters saved to `~/.lrc-streaming/last_used.json`.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct LastUsedParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_dir: Option<PathBuf>,
}

impl LastUsedParams {
    /// Return the default path to the persisted config file.
    pub fn config_path() -> PathBuf {
        app_dir().join("last_used.json")
    }

    /// Load persisted params from an explicit path.
    /// Returns `Default` when the file is absent or cannot be parsed.
    pub fn load_from(path: &Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_default()
    }

    /// Atomically write params to an explicit path.
    pub fn save_to(&self, path: &Path) -> Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }

    /// Delete the config file at an explicit path if it exists.
    pub fn clear_at(path: &Path) -> Result<(), std::io::Error> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse CLI arguments, fill unset paths from last-used params or defaults,
    /// and persist the resolved paths.
    pub fn load_with_last_used() -> Self {
        Self::load_with_last_used_impl(
            std::env::args_os().collect(),
            &LastUsedParams::config_path(),
            &app_dir(),
        )
    }

    /// Full implementation – accepts args, an explicit config path and the
    /// application directory so that tests can redirect to a temp directory.
    pub fn load_with_last_used_impl(
        args: Vec<std::ffi::OsString>,
        config_path: &Path,
        app_dir: &Path,
    ) -> Self {
        let settings = Settings::parse_from(args);

        if settings.clear {
            let _ = LastUsedParams::clear_at(config_path);
            return settings.resolve_defaults(LastUsedParams::default(), app_dir);
        }

        // CLI (or env) always wins over persisted values.
        let last = LastUsedParams::load_from(config_path);
        let settings = settings.resolve_defaults(last, app_dir);

        let params = LastUsedParams::from(&settings);
        let _ = params.save_to(config_path);

        settings
    }

    /// Resolved master store path.
    pub fn store_path(&self) -> PathBuf {
        self.store
            .clone()
            .unwrap_or_else(|| app_dir().join(DEFAULT_STORE_FILE))
    }

    /// Resolved backup directory.
    pub fn backup_dir_path(&self) -> PathBuf {
        self.backup_dir
            .clone()
            .unwrap_or_else(|| app_dir().join("backups"))
    }

    fn resolve_defaults(mut self, last: LastUsedParams, app_dir: &Path) -> Self {
        if self.store.is_none() {
            self.store = Some(
                last.store
                    .unwrap_or_else(|| app_dir.join(DEFAULT_STORE_FILE)),
            );
        }
        if self.backup_dir.is_none() {
            self.backup_dir = Some(last.backup_dir.unwrap_or_else(|| app_dir.join("backups")));
        }
        if self.debug {
            self.log_level = "DEBUG".to_string();
        }
        self
    }
}

// ── Conversion ─────────────────────────────────────────────────────────────────

impl From<&Settings> for LastUsedParams {
    fn from(s: &Settings) -> Self {
        LastUsedParams {
            store: s.store.clone(),
            backup_dir: s.backup_dir.clone(),
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
