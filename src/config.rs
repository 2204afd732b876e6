//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use crate::query::{QueryDefaults, TimePrefs, MGDL_UNITS, MMOLL_UNITS};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub query: QueryConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Defaults for queries that omit their preferences
#[derive(Debug, Clone, Deserialize)]
pub struct QueryConfig {
    #[serde(default = "default_bg_units")]
    pub bg_units: String,

    #[serde(default)]
    pub timezone_aware: bool,

    #[serde(default)]
    pub timezone_name: Option<String>,
}

fn default_bg_units() -> String {
    MGDL_UNITS.to_string()
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            bg_units: default_bg_units(),
            timezone_aware: false,
            timezone_name: None,
        }
    }
}

impl QueryConfig {
    /// Query executor defaults for this section
    pub fn to_defaults(&self) -> QueryDefaults {
        QueryDefaults {
            bg_units: self.bg_units.clone(),
            time_prefs: TimePrefs {
                timezone_aware: self.timezone_aware,
                timezone_name: self.timezone_name.clone(),
            },
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl LoggingConfig {
    /// Whether JSON log output is selected
    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        Self::load_with_overrides(path, |key| std::env::var(key).ok())
    }

    // Overrides are checked with the same rules as the file
    fn load_with_overrides<F>(path: &Path, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::load(path)?;
        config.apply_overrides(lookup);
        config.validate()?;
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("glucolens").join("config.toml")),
            Some(PathBuf::from("/etc/glucolens/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path_opt in config_paths.iter().flatten() {
            if path_opt.exists() {
                match Self::load_with_env(path_opt) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path_opt);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path_opt, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Check values that deserialize fine but make no sense
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.query.bg_units != MGDL_UNITS && self.query.bg_units != MMOLL_UNITS {
            return Err(ConfigError::Invalid(format!(
                "query.bg_units must be \"{}\" or \"{}\", got \"{}\"",
                MGDL_UNITS, MMOLL_UNITS, self.query.bg_units
            )));
        }
        if !matches!(self.logging.format.to_ascii_lowercase().as_str(), "pretty" | "json") {
            return Err(ConfigError::Invalid(format!(
                "logging.format must be \"pretty\" or \"json\", got \"{}\"",
                self.logging.format
            )));
        }
        Ok(())
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // Query overrides
        if let Some(units) = lookup("GLUCOLENS_BG_UNITS") {
            self.query.bg_units = units;
        }
        if let Some(timezone) = lookup("GLUCOLENS_TIMEZONE") {
            self.query.timezone_aware = !timezone.is_empty();
            self.query.timezone_name = Some(timezone).filter(|tz| !tz.is_empty());
        }

        // Logging overrides
        if let Some(level) = lookup("GLUCOLENS_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("GLUCOLENS_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# glucolens Configuration
#
# Environment variables override these settings:
# - GLUCOLENS_BG_UNITS
# - GLUCOLENS_TIMEZONE
# - GLUCOLENS_LOG_LEVEL
# - GLUCOLENS_LOG_FORMAT

[query]
# Blood glucose units when a query has no bgPrefs: "mg/dL" or "mmol/L"
bg_units = "mg/dL"

# Normalize in a display timezone when a query has no timePrefs
timezone_aware = false

# IANA timezone name (UTC when timezone_aware is set without one)
# timezone_name = "America/New_York"

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();

        assert_eq!(config.query.bg_units, MGDL_UNITS);
        assert!(!config.query.timezone_aware);
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.is_json());
    }

    #[test]
    fn test_default_template_parses() {
        let config: Config = toml::from_str(&generate_default_config()).unwrap();

        config.validate().unwrap();
        assert_eq!(config.query.bg_units, MGDL_UNITS);
        assert_eq!(config.query.timezone_name, None);
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[query]
bg_units = "mmol/L"
timezone_aware = true
timezone_name = "Europe/Berlin"

[logging]
format = "json"
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.query.bg_units, MMOLL_UNITS);
        assert!(config.logging.is_json());
        assert_eq!(config.logging.level, "info");

        let defaults = config.query.to_defaults();
        assert_eq!(defaults.time_prefs.display_zone(), Some("Europe/Berlin"));
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();

        let missing = Config::load(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(missing, ConfigError::Io { .. }));

        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[query\nbg_units = ").unwrap();
        assert!(matches!(Config::load(&path).unwrap_err(), ConfigError::Parse { .. }));

        std::fs::write(&path, "[query]\nbg_units = \"mg/L\"\n").unwrap();
        assert!(matches!(Config::load(&path).unwrap_err(), ConfigError::Invalid(_)));
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("GLUCOLENS_BG_UNITS", "mmol/L"),
            ("GLUCOLENS_TIMEZONE", "Pacific/Auckland"),
            ("GLUCOLENS_LOG_LEVEL", "debug"),
            ("GLUCOLENS_LOG_FORMAT", "json"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.query.bg_units, MMOLL_UNITS);
        assert!(config.query.timezone_aware);
        assert_eq!(config.query.timezone_name.as_deref(), Some("Pacific/Auckland"));
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.is_json());
    }

    #[test]
    fn test_empty_timezone_override_disables_zone() {
        let mut config = Config::default();
        config.query.timezone_aware = true;
        config.query.timezone_name = Some("UTC".to_string());

        config.apply_overrides(|key| (key == "GLUCOLENS_TIMEZONE").then(String::new));

        assert!(!config.query.timezone_aware);
        assert_eq!(config.query.timezone_name, None);
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, generate_default_config()).unwrap();

        let err = Config::load_with_overrides(&path, |key| {
            (key == "GLUCOLENS_BG_UNITS").then(|| "mg/L".to_string())
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let config = Config::load_with_overrides(&path, |key| {
            (key == "GLUCOLENS_BG_UNITS").then(|| MMOLL_UNITS.to_string())
        })
        .unwrap();
        assert_eq!(config.query.bg_units, MMOLL_UNITS);
    }
}
