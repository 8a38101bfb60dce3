use clap::{Args, Subcommand};
use fitvault_core::{HealthError, HealthImporter, HealthSource, ImportReport, LocalStore};
use std::path::PathBuf;

use crate::config::Config;
use crate::health::{Consent, FileHealthSource};
use crate::shell::Shell;

#[derive(Args)]
pub struct HealthCommand {
    /// Health export file (overrides health.export_path)
    #[arg(long, global = true)]
    pub file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: HealthSubcommand,
}

#[derive(Subcommand)]
pub enum HealthSubcommand {
    /// Show whether health data access is granted
    Status,

    /// Ask for access to health data
    Authorize {
        /// Grant access without prompting
        #[arg(long, short)]
        yes: bool,
    },

    /// Import workouts from the health export
    Import {
        /// Only add workouts not imported before; leave existing ones untouched
        #[arg(long)]
        only_new: bool,

        /// Grant access without prompting if not yet authorized
        #[arg(long, short)]
        yes: bool,
    },
}

impl HealthCommand {
    pub async fn run<L: LocalStore + 'static>(
        &self,
        store: L,
        config: &Config,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let export = self
            .file
            .clone()
            .or_else(|| config.health_export.as_ref().map(|v| v.value.clone()));
        let mut source = FileHealthSource::new(config.health_grant_path());
        if let Some(export) = export {
            source = source.with_export(export);
        }

        match &self.command {
            HealthSubcommand::Status => {
                let importer = HealthImporter::new(source);
                let granted = importer.check_authorization().await?;
                println!(
                    "Health data access: {}",
                    if granted { "granted" } else { "not granted" }
                );
                match importer.source().export_path() {
                    Some(path) => println!("Export file: {}", path.display()),
                    None => println!("Export file: (not configured)"),
                }
                Ok(())
            }

            HealthSubcommand::Authorize { yes } => {
                let importer = HealthImporter::new(source.with_consent(consent(*yes)));
                if importer.request_authorization().await? {
                    println!("Health data access granted.");
                } else {
                    println!("Health data access denied.");
                }
                Ok(())
            }

            HealthSubcommand::Import { only_new, yes } => {
                let importer = HealthImporter::new(source.with_consent(consent(*yes)));
                if !importer.check_authorization().await?
                    && !importer.request_authorization().await?
                {
                    return Err(HealthError::AuthorizationDenied.into());
                }

                let (_, result) = import_in_background(importer, store, *only_new, |p| {
                    eprint!("\rImporting... {:>3.0}%", p * 100.0);
                })
                .await?;
                eprintln!();

                let report = result?;
                println!(
                    "Fetched {} workout(s): {} new, {} updated, {} unchanged, {} skipped",
                    report.fetched, report.inserted, report.updated, report.unchanged, report.skipped
                );
                Ok(())
            }
        }
    }
}

fn consent(yes: bool) -> Consent {
    if yes {
        Consent::AssumeYes
    } else {
        Consent::Interactive
    }
}

/// Runs an import on the background shell, forwarding progress to `on_progress`.
async fn import_in_background<S, L>(
    importer: HealthImporter<S>,
    store: L,
    only_new: bool,
    on_progress: impl FnMut(f64),
) -> Result<(L, Result<ImportReport, HealthError>), Box<dyn std::error::Error>>
where
    S: HealthSource + 'static,
    L: LocalStore + 'static,
{
    let mut shell = Shell::new();
    shell.spawn(move |progress| async move {
        let importer = importer.with_progress(progress);
        let mut store = store;
        let result = if only_new {
            importer.import_unimported(&mut store).await
        } else {
            importer.import_all(&mut store).await
        };
        (store, result)
    })?;
    Ok(shell.wait(on_progress).await?)
}
