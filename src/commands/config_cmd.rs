use clap::{Args, Subcommand};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::OutputFormat;
use crate::config::{Config, ConfigValue};

const DEFAULT_CONFIG: &str = r#"# fitvault configuration

# Path to SQLite database (default: <data dir>/fitvault/fitvault.db)
# database_path: fitvault.db

# Directory backups are exported to (default: <data dir>/fitvault/backups)
# backup_dir: backups

# Health-store export to import workouts from
# health:
#   export_path: health-export.json

# Log level for fitvault (overridden by RUST_LOG)
log_level: warn
"#;

#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show current configuration values
    Show {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Initialize configuration file
    Init,
}

impl ConfigCommand {
    /// `config_path` is the `--config` override, if one was given.
    pub fn run(
        &self,
        config: &Config,
        config_path: Option<&Path>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ConfigSubcommand::Show { format } => {
                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(config)?);
                    }
                    OutputFormat::Text => {
                        println!("Configuration");
                        println!("=============\n");

                        if let Some(path) = &config.config_file {
                            println!("Config file: {}", path.display());
                        } else {
                            println!(
                                "Config file: {} (not found)",
                                Config::default_config_path().display()
                            );
                        }
                        println!();

                        print_path("database_path", &config.database_path);
                        print_path("backup_dir", &config.backup_dir);
                        match &config.health_export {
                            Some(export) => print_path("health.export_path", export),
                            None => {
                                println!("health.export_path: (not set)");
                                println!();
                            }
                        }

                        println!("log_level: {}", config.log_level.value);
                        println!("  source: {}", config.log_level.source);
                    }
                }
                Ok(())
            }

            ConfigSubcommand::Init => {
                let path = config_path
                    .map(Path::to_path_buf)
                    .unwrap_or_else(Config::default_config_path);

                if !write_default_config(&path)? {
                    println!("Config file already exists: {}", path.display());
                    println!("Use 'fitvault config show' to view current configuration.");
                    return Ok(());
                }

                println!("Created config file: {}", path.display());
                println!("\nEdit this file to customize your settings.");
                Ok(())
            }
        }
    }
}

fn print_path(key: &str, value: &ConfigValue<PathBuf>) {
    println!("{}: {}", key, value.value.display());
    println!("  source: {}", value.source);
    println!();
}

/// Writes the commented default config. Returns false if `path` already exists.
fn write_default_config(path: &Path) -> std::io::Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = fs::File::create(path)?;
    file.write_all(DEFAULT_CONFIG.as_bytes())?;
    Ok(true)
}
