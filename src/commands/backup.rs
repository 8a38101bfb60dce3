use clap::{Args, Subcommand};
use fitvault_core::backup::{
    self, DocumentError, RestoreError, RestoreSummary, Snapshot, BACKUP_FILE_NAME,
};
use fitvault_core::LocalStore;
use std::path::{Path, PathBuf};
use tracing::info;

use super::confirm;
use crate::config::Config;
use crate::shell::Shell;

#[derive(Args)]
pub struct BackupCommand {
    #[command(subcommand)]
    pub command: BackupSubcommand,
}

#[derive(Subcommand)]
pub enum BackupSubcommand {
    /// Write every workout and category to a portable backup file
    Export {
        /// Output file (default: <backup_dir>/fitvault-backup.cbor)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Replace all local data with the contents of a backup file
    Restore {
        /// Backup file to restore from
        path: PathBuf,

        /// Skip confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },
}

impl BackupCommand {
    pub async fn run<L: LocalStore + 'static>(
        &self,
        mut store: L,
        config: &Config,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            BackupSubcommand::Export { output } => {
                let path = output
                    .clone()
                    .unwrap_or_else(|| config.backup_dir.value.join(BACKUP_FILE_NAME));
                let bytes = export_to(&mut store, &path).await?;
                println!("Exported backup to {} ({} bytes)", path.display(), bytes);
                Ok(())
            }

            BackupSubcommand::Restore { path, yes } => {
                let bytes = tokio::fs::read(path)
                    .await
                    .map_err(|e| format!("Failed to read backup '{}': {}", path.display(), e))?;
                let incoming = check_document(&bytes)?;

                if !yes
                    && !confirm(&format!(
                        "Replace ALL local workouts and categories with '{}' ({} workout(s), {} category(ies))?",
                        path.display(),
                        incoming.workouts.len(),
                        incoming.categories.len()
                    ))?
                {
                    println!("Restore cancelled.");
                    return Ok(());
                }

                let (_, result) = restore_in_background(bytes, store).await?;
                let summary = result?;
                println!(
                    "Removed {} workout(s), {} category(ies), {} subcategory(ies)",
                    summary.removed_workouts,
                    summary.removed_categories,
                    summary.removed_subcategories
                );
                println!(
                    "Restored {} workout(s), {} category(ies), {} subcategory(ies)",
                    summary.restored_workouts,
                    summary.restored_categories,
                    summary.restored_subcategories
                );
                Ok(())
            }
        }
    }
}

/// Exports `store` to `path`, creating parent directories. Returns the size written.
async fn export_to<L: LocalStore>(
    store: &mut L,
    path: &Path,
) -> Result<usize, Box<dyn std::error::Error>> {
    let bytes = backup::export(store).await?;
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, &bytes).await?;
    info!(path = %path.display(), bytes = bytes.len(), "Wrote backup file");
    Ok(bytes.len())
}

/// Decodes and checks a backup up front so only restorable files reach the prompt.
fn check_document(bytes: &[u8]) -> Result<Snapshot, DocumentError> {
    let snapshot = backup::decode(bytes)?;
    snapshot.validate_references()?;
    Ok(snapshot)
}

/// Runs the restore on the background shell and hands the store back.
async fn restore_in_background<L: LocalStore + 'static>(
    document: Vec<u8>,
    store: L,
) -> Result<(L, Result<RestoreSummary, RestoreError>), Box<dyn std::error::Error>> {
    let mut shell = Shell::new();
    shell.spawn(move |_progress| async move {
        let mut store = store;
        let result = backup::restore(&document, &mut store).await;
        (store, result)
    })?;
    Ok(shell.wait(|_| {}).await?)
}
