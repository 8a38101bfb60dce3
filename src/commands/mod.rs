mod backup;
mod category;
mod config_cmd;
mod health;
mod workout;

use clap::ValueEnum;
use fitvault_core::{LocalStore, StoreError};
use std::io::{self, Write};
use tracing::warn;

pub use backup::BackupCommand;
pub use category::CategoryCommand;
pub use config_cmd::ConfigCommand;
pub use health::HealthCommand;
pub use workout::WorkoutCommand;

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Asks a yes/no question on the terminal; anything but `y` is a no.
pub(crate) fn confirm(question: &str) -> io::Result<bool> {
    print!("{} [y/N] ", question);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}

/// Commits a staged write, or rolls it back if staging or commit failed.
pub(crate) async fn finish_write<L: LocalStore>(
    store: &mut L,
    staged: Result<(), StoreError>,
) -> Result<(), StoreError> {
    let result = match staged {
        Ok(()) => store.commit().await,
        Err(e) => Err(e),
    };
    if result.is_err() {
        if let Err(e) = store.rollback().await {
            warn!("Rollback failed: {}", e);
        }
    }
    result
}
