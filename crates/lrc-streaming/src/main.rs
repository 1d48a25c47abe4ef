mod bootstrap;

use anyhow::{Context, Result};
use streaming_core::models::TermSummary;
use streaming_core::settings::{Command, Settings};
use streaming_runtime::backups::BackupManager;
use streaming_runtime::blob_store::FileBlobStore;
use streaming_runtime::workflow::{prepare, UploadWorkflow};

fn main() -> Result<()> {
    let settings = Settings::load_with_last_used();

    bootstrap::ensure_directories()?;
    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_ref())?;

    tracing::info!("LRC Streaming v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::debug!(
        "Store: {}, backups: {}",
        settings.store_path().display(),
        settings.backup_dir_path().display()
    );

    if let Err(e) = run(&settings) {
        tracing::error!("{:#}", e);
        return Err(e);
    }
    Ok(())
}

fn run(settings: &Settings) -> Result<()> {
    let store = FileBlobStore::new(settings.store_path());
    let backups = BackupManager::new(settings.backup_dir_path());

    match &settings.command {
        Command::Prepare {
            input,
            term,
            output,
        } => {
            let outcome = prepare(input, term, output.as_deref())
                .with_context(|| format!("preparing {}", input.display()))?;
            println!(
                "Wrote {} records for {} to {}",
                outcome.records,
                outcome.term,
                outcome.output.display()
            );
            println!("Review the workbook, then run `merge` with the same term.");
        }

        Command::Merge {
            input,
            term,
            no_backup,
        } => {
            let workflow = UploadWorkflow::new(store, Some(backups));
            let outcome = workflow
                .merge_file(input, term, !no_backup)
                .with_context(|| format!("merging {} into the master store", input.display()))?;

            if let Some(path) = &outcome.backup {
                println!("Previous store backed up to {}", path.display());
            }
            println!("Merged {}:", outcome.term);
            print_summary(&outcome.summary);
            println!("Terms in store: {}", outcome.terms.join(", "));
        }

        Command::Backup { output } => {
            let workflow = UploadWorkflow::new(store, Some(backups));
            let path = workflow
                .backup(output.as_deref())
                .context("backing up the master store")?;
            println!("Backup written to {}", path.display());
        }

        Command::Restore { input } => {
            let workflow = UploadWorkflow::new(store, None);
            let restored = workflow
                .restore(input)
                .with_context(|| format!("restoring from {}", input.display()))?;
            println!(
                "Restored {} terms from {}",
                restored.terms.len(),
                input.display()
            );
        }

        Command::Backups => {
            let files = backups.list();
            if files.is_empty() {
                println!("No backups in {}", backups.dir().display());
            }
            for path in files {
                println!("{}", path.display());
            }
        }

        Command::Init => {
            let workflow = UploadWorkflow::new(store, None);
            let path = settings.store_path();
            if workflow.init().context("initializing the master store")? {
                println!("Created empty store at {}", path.display());
            } else {
                println!("Store already exists at {}", path.display());
            }
        }
    }

    Ok(())
}

fn print_summary(summary: &TermSummary) {
    println!(
        "  {} students, {} reservations",
        summary.total_students, summary.total_reservations
    );
    for (department, dept) in &summary.departments {
        println!(
            "  {:<28} {:>6} students {:>5} reservations",
            department, dept.total_students, dept.total_reservations
        );
    }
}
