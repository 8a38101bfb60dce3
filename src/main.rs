use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod config;
mod db;
mod health;
mod shell;

use commands::{BackupCommand, CategoryCommand, ConfigCommand, HealthCommand, WorkoutCommand};
use config::Config;
use db::{init_db, SqliteStore};

#[derive(Parser)]
#[command(name = "fitvault")]
#[command(version)]
#[command(about = "Workout log with portable backups and health-store import", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Log, list and delete workouts
    Workout(WorkoutCommand),

    /// Manage categories and subcategories
    Category(CategoryCommand),

    /// Export or restore a portable backup
    Backup(BackupCommand),

    /// Import workouts from the health store
    Health(HealthCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing(config: &Config) {
    let default_filter = format!(
        "fitvault={level},fitvault_core={level}",
        level = config.log_level.value
    );
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn open_store(config: &Config) -> Result<SqliteStore, sqlx::Error> {
    let pool = init_db(&config.database_path.value).await?;
    Ok(SqliteStore::new(pool))
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config.clone())?;
    init_tracing(&config);

    match cli.command {
        Some(Commands::Workout(cmd)) => {
            let mut store = open_store(&config).await?;
            cmd.run(&mut store).await?;
        }
        Some(Commands::Category(cmd)) => {
            let mut store = open_store(&config).await?;
            cmd.run(&mut store).await?;
        }
        Some(Commands::Backup(cmd)) => {
            let store = open_store(&config).await?;
            cmd.run(store, &config).await?;
        }
        Some(Commands::Health(cmd)) => {
            let store = open_store(&config).await?;
            cmd.run(store, &config).await?;
        }
        Some(Commands::Config(cmd)) => {
            cmd.run(&config, cli.config.as_deref())?;
        }
        None => {
            println!("Use --help to see available commands");
        }
    }

    Ok(())
}
