use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use clap::{Args, Subcommand};
use fitvault_core::models::timestamp;
use fitvault_core::{ActivityType, LocalStore, Subcategory, WorkoutRecord};
use std::collections::HashMap;
use uuid::Uuid;

use super::category::find_category;
use super::{confirm, finish_write, OutputFormat};

#[derive(Args)]
pub struct WorkoutCommand {
    #[command(subcommand)]
    pub command: WorkoutSubcommand,
}

#[derive(Subcommand)]
pub enum WorkoutSubcommand {
    /// Log a workout
    Add {
        /// Activity type (strength, running, cycling, swimming, yoga, cardio, other)
        #[arg(long = "type", value_name = "TYPE")]
        activity_type: ActivityType,

        /// Duration in minutes
        #[arg(long)]
        duration: u32,

        /// When it happened: RFC 3339 timestamp or YYYY-MM-DD (default: now)
        #[arg(long)]
        date: Option<String>,

        /// Category ID (UUID) or name
        #[arg(long)]
        category: Option<String>,

        /// Subcategory name
        #[arg(long)]
        subcategory: Option<String>,

        /// Free-form notes
        #[arg(long)]
        notes: Option<String>,
    },

    /// List workouts, newest first
    List {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Only show workouts of this type
        #[arg(long = "type", value_name = "TYPE")]
        activity_type: Option<ActivityType>,
    },

    /// Delete a workout
    Delete {
        /// Workout ID (UUID)
        id: Uuid,

        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
}

impl WorkoutCommand {
    pub async fn run<L: LocalStore>(&self, store: &mut L) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            WorkoutSubcommand::Add {
                activity_type,
                duration,
                date,
                category,
                subcategory,
                notes,
            } => {
                let date = match date {
                    Some(raw) => parse_date(raw)?,
                    None => Utc::now(),
                };
                let mut workout = WorkoutRecord::new(*activity_type, *duration, date);

                let category = match category {
                    Some(identifier) => Some(find_category(store, identifier).await?),
                    None => None,
                };
                if let Some(category) = &category {
                    workout = workout.with_category(category.id);
                }
                if let Some(name) = subcategory {
                    let sub = find_subcategory(store, name, category.as_ref().map(|c| c.id)).await?;
                    workout = workout.with_category(sub.category_id).with_subcategory(sub.id);
                }
                if let Some(notes) = notes {
                    workout = workout.with_notes(notes.clone());
                }

                let staged = store.insert_workout(&workout).await;
                finish_write(store, staged).await?;
                println!("Logged workout:");
                println!("{}", workout);
                println!("ID: {}", workout.id);
                Ok(())
            }

            WorkoutSubcommand::List {
                format,
                activity_type,
            } => {
                let mut workouts = store.workouts().await?;
                if let Some(activity_type) = activity_type {
                    workouts.retain(|w| w.activity_type == *activity_type);
                }
                workouts.sort_by(|a, b| b.date.cmp(&a.date));

                if workouts.is_empty() {
                    println!("No workouts found");
                    return Ok(());
                }

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&workouts)?);
                    }
                    OutputFormat::Text => {
                        let categories: HashMap<Uuid, String> = store
                            .categories()
                            .await?
                            .into_iter()
                            .map(|c| (c.id, c.name))
                            .collect();

                        println!(
                            "{:<36}  {:<16}  {:<9}  {:>5}  CATEGORY",
                            "ID", "DATE", "TYPE", "MIN"
                        );
                        println!("{}", "-".repeat(90));
                        for workout in &workouts {
                            let category = workout
                                .category_id
                                .and_then(|id| categories.get(&id))
                                .map(String::as_str)
                                .unwrap_or("-");
                            println!(
                                "{:<36}  {:<16}  {:<9}  {:>5}  {}",
                                workout.id,
                                workout.date.format("%Y-%m-%d %H:%M"),
                                workout.activity_type,
                                workout.duration,
                                category
                            );
                        }
                        let minutes: u64 = workouts.iter().map(|w| u64::from(w.duration)).sum();
                        println!(
                            "\nTotal: {} workout(s), {} minute(s)",
                            workouts.len(),
                            minutes
                        );
                    }
                }
                Ok(())
            }

            WorkoutSubcommand::Delete { id, force } => {
                let workout = store
                    .workouts()
                    .await?
                    .into_iter()
                    .find(|w| w.id == *id)
                    .ok_or_else(|| format!("Workout not found: {}", id))?;

                if workout.is_imported() {
                    println!(
                        "Note: this workout was imported and will return on a full health import."
                    );
                }
                if !force && !confirm(&format!("Delete workout '{}'?", workout))? {
                    println!("Deletion cancelled.");
                    return Ok(());
                }

                let staged = store.delete_workout(workout.id).await;
                finish_write(store, staged).await?;
                println!("Deleted workout: {}", workout.id);
                Ok(())
            }
        }
    }
}

/// Accepts an RFC 3339 timestamp or a bare date (midnight UTC).
fn parse_date(raw: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(date) = timestamp::parse(raw) {
        return Ok(date);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
        .ok_or_else(|| {
            format!(
                "Invalid date '{}'. Use YYYY-MM-DD or an RFC 3339 timestamp.",
                raw
            )
        })
}

/// Finds a subcategory by name, within `category_id` when one is given.
async fn find_subcategory<L: LocalStore>(
    store: &mut L,
    name: &str,
    category_id: Option<Uuid>,
) -> Result<Subcategory, Box<dyn std::error::Error>> {
    let mut matches: Vec<Subcategory> = store
        .subcategories()
        .await?
        .into_iter()
        .filter(|s| s.name.eq_ignore_ascii_case(name.trim()))
        .filter(|s| category_id.map_or(true, |id| s.category_id == id))
        .collect();

    match matches.len() {
        0 => Err(format!("Subcategory not found: {}", name).into()),
        1 => Ok(matches.remove(0)),
        _ => Err(format!(
            "Subcategory '{}' exists in several categories; pass --category",
            name
        )
        .into()),
    }
}
