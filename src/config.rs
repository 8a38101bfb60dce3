use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Source of a configuration value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::File => write!(f, "file"),
            ConfigSource::Environment => write!(f, "environment"),
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }
}

/// Health-store import settings as written in the config file
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HealthConfig {
    /// JSON export of the health store to import from
    pub export_path: Option<PathBuf>,
}

/// Application configuration with source tracking
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Path to the SQLite database
    pub database_path: ConfigValue<PathBuf>,
    /// Directory backups are exported to
    pub backup_dir: ConfigValue<PathBuf>,
    /// Health-store export to import from (if configured)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_export: Option<ConfigValue<PathBuf>>,
    /// Log filter level for fitvault crates
    pub log_level: ConfigValue<String>,
    /// Config file path used (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
}

/// Internal struct for deserializing config file
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    database_path: Option<PathBuf>,
    backup_dir: Option<PathBuf>,
    health: Option<HealthConfig>,
    log_level: Option<String>,
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let data_dir = Self::default_data_dir();

        // Start with defaults
        let mut database_path =
            ConfigValue::new(data_dir.join("fitvault.db"), ConfigSource::Default);
        let mut backup_dir = ConfigValue::new(data_dir.join("backups"), ConfigSource::Default);
        let mut health_export = None;
        let mut log_level = ConfigValue::new("warn".to_string(), ConfigSource::Default);
        let mut config_file = None;

        // Try to load from config file
        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            let file_config: ConfigFile = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;

            config_file = Some(path.clone());

            if let Some(db_path) = file_config.database_path {
                database_path = ConfigValue::new(resolve(&path, db_path), ConfigSource::File);
            }
            if let Some(dir) = file_config.backup_dir {
                backup_dir = ConfigValue::new(resolve(&path, dir), ConfigSource::File);
            }
            if let Some(export_path) = file_config.health.and_then(|h| h.export_path) {
                health_export = Some(ConfigValue::new(
                    resolve(&path, export_path),
                    ConfigSource::File,
                ));
            }
            if let Some(level) = file_config.log_level {
                log_level = ConfigValue::new(level, ConfigSource::File);
            }
        }

        // Apply environment variable overrides
        if let Ok(db_path) = std::env::var("FITVAULT_DATABASE_PATH") {
            database_path = ConfigValue::new(PathBuf::from(db_path), ConfigSource::Environment);
        }
        if let Ok(dir) = std::env::var("FITVAULT_BACKUP_DIR") {
            backup_dir = ConfigValue::new(PathBuf::from(dir), ConfigSource::Environment);
        }
        if let Ok(export_path) = std::env::var("FITVAULT_HEALTH_EXPORT") {
            health_export = Some(ConfigValue::new(
                PathBuf::from(export_path),
                ConfigSource::Environment,
            ));
        }
        if let Ok(level) = std::env::var("FITVAULT_LOG") {
            log_level = ConfigValue::new(level, ConfigSource::Environment);
        }

        Ok(Self {
            database_path,
            backup_dir,
            health_export,
            log_level,
            config_file,
        })
    }

    /// Where the health-store authorization decision is persisted.
    pub fn health_grant_path(&self) -> PathBuf {
        self.database_path
            .value
            .with_file_name("health-authorization")
    }

    /// Default config directory (platform-specific):
    /// - Linux: ~/.config/fitvault/
    /// - macOS: ~/Library/Application Support/fitvault/
    /// - Windows: %APPDATA%/fitvault/
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("fitvault")
    }

    /// Default data directory (platform-specific):
    /// - Linux: ~/.local/share/fitvault/
    /// - macOS: ~/Library/Application Support/fitvault/
    /// - Windows: %APPDATA%/fitvault/
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("fitvault")
    }

    /// Default config file path (platform-specific config dir + config.yaml)
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }
}

/// Resolve relative paths against the config file's directory
fn resolve(config_path: &Path, value: PathBuf) -> PathBuf {
    if value.is_relative() {
        config_path
            .parent()
            .map(|p| p.join(&value))
            .unwrap_or(value)
    } else {
        value
    }
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("nonexistent.yaml");

        let config = Config::load(Some(config_path)).unwrap();
        assert!(config
            .database_path
            .value
            .to_string_lossy()
            .contains("fitvault.db"));
        assert_eq!(config.database_path.source, ConfigSource::Default);
        assert!(config.backup_dir.value.ends_with("backups"));
        assert!(config.health_export.is_none());
        assert_eq!(config.log_level.value, "warn");
        assert!(config.config_file.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "database_path: /custom/path/db.sqlite").unwrap();
        writeln!(file, "backup_dir: /custom/backups").unwrap();
        writeln!(file, "log_level: debug").unwrap();
        writeln!(file, "health:").unwrap();
        writeln!(file, "  export_path: /exports/health.json").unwrap();

        let config = Config::load(Some(config_path.clone())).unwrap();
        assert_eq!(
            config.database_path.value,
            PathBuf::from("/custom/path/db.sqlite")
        );
        assert_eq!(config.database_path.source, ConfigSource::File);
        assert_eq!(config.backup_dir.value, PathBuf::from("/custom/backups"));
        assert_eq!(config.log_level.value, "debug");
        let export = config.health_export.unwrap();
        assert_eq!(export.value, PathBuf::from("/exports/health.json"));
        assert_eq!(export.source, ConfigSource::File);
        assert_eq!(config.config_file, Some(config_path));
    }

    #[test]
    fn test_relative_paths_resolve_against_config_dir() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "database_path: data/fitvault.db").unwrap();

        let config = Config::load(Some(config_path)).unwrap();
        assert_eq!(
            config.database_path.value,
            temp_dir.path().join("data/fitvault.db")
        );
    }

    #[test]
    fn test_health_grant_lives_next_to_database() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "database_path: /var/lib/fitvault/fitvault.db").unwrap();

        let config = Config::load(Some(config_path)).unwrap();
        assert_eq!(
            config.health_grant_path(),
            PathBuf::from("/var/lib/fitvault/health-authorization")
        );
    }

    #[test]
    #[ignore] // Run with --ignored; env vars can pollute parallel tests
    fn test_env_var_overrides_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "backup_dir: /from/file").unwrap();

        std::env::set_var("FITVAULT_BACKUP_DIR", "/from/env");

        let config = Config::load(Some(config_path)).unwrap();
        assert_eq!(config.backup_dir.value, PathBuf::from("/from/env"));
        assert_eq!(config.backup_dir.source, ConfigSource::Environment);

        std::env::remove_var("FITVAULT_BACKUP_DIR");
    }

    #[test]
    fn test_invalid_yaml_error() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "invalid: yaml: content: [").unwrap();

        let result = Config::load(Some(config_path));
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
