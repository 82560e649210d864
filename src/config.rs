//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub influxdb: InfluxConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// InfluxDB connection and write dispatch settings
#[derive(Debug, Clone, Deserialize)]
pub struct InfluxConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    #[serde(default = "default_database")]
    pub database: String,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub ssl: bool,

    #[serde(default)]
    pub verify_ssl: bool,

    /// Drop every write without contacting the server
    #[serde(default)]
    pub disabled: bool,

    /// Run writes on a background task
    #[serde(default)]
    pub use_threading: bool,

    /// Log write failures instead of returning them
    #[serde(default = "default_fail_silently")]
    pub fail_silently: bool,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    8086
}

fn default_database() -> String {
    "default".to_string()
}

fn default_timeout() -> u64 {
    10
}

fn default_fail_silently() -> bool {
    true
}

impl Default for InfluxConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            username: String::new(),
            password: String::new(),
            database: default_database(),
            timeout_secs: default_timeout(),
            ssl: false,
            verify_ssl: false,
            disabled: false,
            use_threading: false,
            fail_silently: default_fail_silently(),
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

    pub file: Option<String>,
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
            file: None,
        }
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
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("influx-orm").join("config.toml")),
            Some(PathBuf::from("/etc/influx-orm/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        let influx = &mut self.influxdb;

        if let Some(host) = var("INFLUXDB_HOST") {
            influx.host = host;
        }
        if let Some(port) = var("INFLUXDB_PORT").and_then(|p| p.parse().ok()) {
            influx.port = port;
        }
        if let Some(user) = var("INFLUXDB_USER") {
            influx.username = user;
        }
        if let Some(password) = var("INFLUXDB_PASSWORD") {
            influx.password = password;
        }
        if let Some(database) = var("INFLUXDB_DATABASE") {
            influx.database = database;
        }
        if let Some(timeout) = var("INFLUXDB_TIMEOUT").and_then(|t| t.parse().ok()) {
            influx.timeout_secs = timeout;
        }

        let flags = [
            ("INFLUXDB_SSL", &mut influx.ssl),
            ("INFLUXDB_VERIFY_SSL", &mut influx.verify_ssl),
            ("INFLUXDB_DISABLED", &mut influx.disabled),
            ("INFLUXDB_USE_THREADING", &mut influx.use_threading),
            ("INFLUXDB_FAIL_SILENTLY", &mut influx.fail_silently),
        ];
        for (name, flag) in flags {
            if let Some(value) = var(name).and_then(|v| parse_flag(&v)) {
                *flag = value;
            }
        }

        // Logging overrides
        if let Some(level) = var("INFLUX_ORM_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("INFLUX_ORM_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# influx-orm Configuration
#
# Environment variables override these settings:
# - INFLUXDB_HOST, INFLUXDB_PORT
# - INFLUXDB_USER, INFLUXDB_PASSWORD, INFLUXDB_DATABASE
# - INFLUXDB_TIMEOUT
# - INFLUXDB_SSL, INFLUXDB_VERIFY_SSL
# - INFLUXDB_DISABLED, INFLUXDB_USE_THREADING, INFLUXDB_FAIL_SILENTLY
# - INFLUX_ORM_LOG_LEVEL
# - INFLUX_ORM_LOG_FORMAT

[influxdb]
# Server host and port
host = "localhost"
port = 8086

# Credentials (leave empty to disable authentication)
username = ""
password = ""

# Database every query and write goes to
database = "default"

# Request timeout in seconds
timeout_secs = 10

# Use HTTPS, and whether to verify the server certificate
ssl = false
verify_ssl = false

# Drop writes without contacting the server
disabled = false

# Send writes from a background task (fire-and-forget)
use_threading = false

# Log write failures instead of returning them
fail_silently = true

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"

# Optional log file path
# file = "/var/log/influx-orm/influx-orm.log"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.influxdb.host, "localhost");
        assert_eq!(config.influxdb.port, 8086);
        assert!(config.influxdb.fail_silently);
        assert!(!config.influxdb.use_threading);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[influxdb]
host = "influx.internal"
database = "telemetry"
use_threading = true
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.influxdb.host, "influx.internal");
        assert_eq!(config.influxdb.database, "telemetry");
        assert!(config.influxdb.use_threading);
        assert_eq!(config.influxdb.port, 8086);
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_default_template_parses() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(generate_default_config().as_bytes()).unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.influxdb.port, 8086);
        assert!(config.influxdb.fail_silently);
        assert!(config.logging.file.is_none());
    }

    #[test]
    fn test_load_errors() {
        let err = Config::load(Path::new("/nonexistent/influx-orm.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[influxdb\nport = ").unwrap();
        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("INFLUXDB_HOST", "db.example"),
            ("INFLUXDB_PORT", "9999"),
            ("INFLUXDB_USER", "admin"),
            ("INFLUXDB_TIMEOUT", "not-a-number"),
            ("INFLUXDB_SSL", "true"),
            ("INFLUXDB_FAIL_SILENTLY", "0"),
            ("INFLUXDB_DISABLED", "maybe"),
            ("INFLUX_ORM_LOG_FORMAT", "json"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(config.influxdb.host, "db.example");
        assert_eq!(config.influxdb.port, 9999);
        assert_eq!(config.influxdb.username, "admin");
        assert_eq!(config.influxdb.timeout_secs, 10);
        assert!(config.influxdb.ssl);
        assert!(!config.influxdb.fail_silently);
        assert!(!config.influxdb.disabled);
        assert_eq!(config.logging.format, "json");
    }
}
