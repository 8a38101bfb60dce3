use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use fitvault_core::{ExternalWorkout, HealthError, HealthSource};
use tracing::{debug, info};

const GRANTED: &str = "granted";
const DENIED: &str = "denied";

/// How an authorization request is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Consent {
    /// Ask on the terminal.
    Interactive,
    /// Grant without asking (`--yes`).
    AssumeYes,
}

/// Health store backed by a JSON export file.
///
/// The export holds an array of workouts as produced by the device-side
/// exporter. Read access is modelled as a grant file next to the database
/// holding either `granted` or `denied`.
pub struct FileHealthSource {
    grant_path: PathBuf,
    export_path: Option<PathBuf>,
    consent: Consent,
}

impl FileHealthSource {
    pub fn new(grant_path: impl Into<PathBuf>) -> Self {
        Self {
            grant_path: grant_path.into(),
            export_path: None,
            consent: Consent::Interactive,
        }
    }

    pub fn with_export(mut self, export_path: impl Into<PathBuf>) -> Self {
        self.export_path = Some(export_path.into());
        self
    }

    pub fn with_consent(mut self, consent: Consent) -> Self {
        self.consent = consent;
        self
    }

    pub fn export_path(&self) -> Option<&Path> {
        self.export_path.as_deref()
    }

    async fn store_decision(&self, granted: bool) -> Result<(), HealthError> {
        if let Some(parent) = self.grant_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| unreachable_at(&self.grant_path, e))?;
        }
        let value = if granted { GRANTED } else { DENIED };
        tokio::fs::write(&self.grant_path, value)
            .await
            .map_err(|e| unreachable_at(&self.grant_path, e))?;
        debug!(path = %self.grant_path.display(), decision = value, "Stored health authorization");
        Ok(())
    }

    async fn ask(&self) -> Result<bool, HealthError> {
        tokio::task::spawn_blocking(|| {
            prompt_yes_no("Allow fitvault to read your workout history? [y/N] ")
        })
        .await
        .map_err(|e| HealthError::SourceUnreachable(format!("prompt failed: {}", e)))?
        .map_err(|e| HealthError::SourceUnreachable(format!("prompt failed: {}", e)))
    }
}

fn unreachable_at(path: &Path, e: std::io::Error) -> HealthError {
    HealthError::SourceUnreachable(format!("{}: {}", path.display(), e))
}

fn prompt_yes_no(question: &str) -> std::io::Result<bool> {
    let mut stderr = std::io::stderr();
    write!(stderr, "{}", question)?;
    stderr.flush()?;

    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(parse_answer(&answer))
}

fn parse_answer(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

impl HealthSource for FileHealthSource {
    async fn authorization_status(&self) -> Result<bool, HealthError> {
        match tokio::fs::read_to_string(&self.grant_path).await {
            Ok(contents) => Ok(contents.trim() == GRANTED),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(unreachable_at(&self.grant_path, e)),
        }
    }

    async fn request_authorization(&self) -> Result<bool, HealthError> {
        let granted = match self.consent {
            Consent::AssumeYes => true,
            Consent::Interactive => self.ask().await?,
        };
        self.store_decision(granted).await?;
        Ok(granted)
    }

    async fn fetch_workouts(&self) -> Result<Vec<ExternalWorkout>, HealthError> {
        let path = self.export_path.as_deref().ok_or_else(|| {
            HealthError::SourceUnreachable("no health export configured".to_string())
        })?;
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| unreachable_at(path, e))?;
        let workouts: Vec<ExternalWorkout> = serde_json::from_str(&contents).map_err(|e| {
            HealthError::SourceUnreachable(format!(
                "{} is not a workout export: {}",
                path.display(),
                e
            ))
        })?;
        info!(count = workouts.len(), path = %path.display(), "Read health export");
        Ok(workouts)
    }
}
