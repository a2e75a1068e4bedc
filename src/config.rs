//! Configuration management for script-glue.
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file (JSON)
//! 4. Default values

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cli::Args;
use crate::observer::Mode;
use crate::requests::RequestSettings;

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Observer configuration.
    pub observer: ObserverSection,
    /// Request shim configuration.
    pub requests: RequestsSection,
    /// Logging configuration.
    pub logging: LoggingSection,
}

/// Observer configuration section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObserverSection {
    /// Stream output as it arrives instead of running to completion.
    pub realtime: bool,
    /// Timeout for each `get` poll, in milliseconds.
    pub poll_timeout_ms: u64,
    /// How long to wait for a killed process, in milliseconds.
    pub kill_timeout_ms: u64,
}

impl Default for ObserverSection {
    fn default() -> Self {
        Self {
            realtime: false,
            poll_timeout_ms: 1000,
            kill_timeout_ms: 5000,
        }
    }
}

/// Request shim configuration section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestsSection {
    /// PowerShell executable.
    pub powershell: String,
    /// Helper script path.
    pub script: PathBuf,
    /// Response cache directory.
    pub cache_dir: PathBuf,
}

impl Default for RequestsSection {
    fn default() -> Self {
        let defaults = RequestSettings::default();
        Self {
            powershell: defaults.powershell,
            script: defaults.script,
            cache_dir: defaults.cache_dir,
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level (error, warn, info, debug, trace) or a full filter.
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        serde_json::from_str(&content).map_err(ConfigError::Json)
    }

    /// Apply environment variable overrides.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_vars(|key| std::env::var(key).ok())
    }

    /// Apply overrides from a variable lookup.
    pub fn apply_vars<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("SCRIPT_GLUE_REALTIME") {
            self.observer.realtime = parse_bool("SCRIPT_GLUE_REALTIME", &value)?;
        }

        if let Some(value) = lookup("SCRIPT_GLUE_POLL_TIMEOUT_MS") {
            self.observer.poll_timeout_ms = value
                .parse()
                .map_err(|_| ConfigError::InvalidValue("SCRIPT_GLUE_POLL_TIMEOUT_MS", value))?;
        }

        if let Some(value) = lookup("SCRIPT_GLUE_KILL_TIMEOUT_MS") {
            self.observer.kill_timeout_ms = value
                .parse()
                .map_err(|_| ConfigError::InvalidValue("SCRIPT_GLUE_KILL_TIMEOUT_MS", value))?;
        }

        if let Some(dir) = lookup("SCRIPT_GLUE_CACHE_DIR") {
            self.requests.cache_dir = PathBuf::from(dir);
        }

        if let Some(level) = lookup("SCRIPT_GLUE_LOG_LEVEL") {
            self.logging.level = level;
        } else if let Some(level) = lookup("RUST_LOG") {
            self.logging.level = level;
        }

        Ok(())
    }

    /// Apply CLI argument overrides.
    pub fn apply_args(&mut self, args: &Args) {
        if args.realtime {
            self.observer.realtime = true;
        }

        if let Some(ms) = args.timeout_ms {
            self.observer.poll_timeout_ms = ms;
        }

        if let Some(ms) = args.kill_timeout_ms {
            self.observer.kill_timeout_ms = ms;
        }

        if let Some(ref level) = args.log_level {
            self.logging.level = level.clone();
        }
    }

    /// Load configuration with full priority chain.
    ///
    /// Priority: CLI args > env vars > config file > defaults
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let mut config = match args.config {
            Some(ref path) => Config::from_file(path)?,
            None => Config::default(),
        };

        config.apply_env()?;
        config.apply_args(args);

        Ok(config)
    }

    /// Observer mode.
    pub fn mode(&self) -> Mode {
        if self.observer.realtime {
            Mode::Realtime
        } else {
            Mode::Batch
        }
    }

    /// Poll timeout for `get`.
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.observer.poll_timeout_ms)
    }

    /// Kill timeout for `stop`.
    pub fn kill_timeout(&self) -> Duration {
        Duration::from_millis(self.observer.kill_timeout_ms)
    }

    /// Convert to settings for the request shim.
    pub fn to_request_settings(&self) -> RequestSettings {
        RequestSettings {
            powershell: self.requests.powershell.clone(),
            script: self.requests.script.clone(),
            cache_dir: self.requests.cache_dir.clone(),
            ..RequestSettings::default()
        }
    }

    /// Get the log level filter string.
    pub fn log_filter(&self) -> &str {
        &self.logging.level
    }
}

fn parse_bool(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue(name, value.to_string())),
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading config file.
    Io(std::io::Error),
    /// JSON parsing error.
    Json(serde_json::Error),
    /// Environment variable with an unusable value.
    InvalidValue(&'static str, String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "failed to read config file: {}", e),
            Self::Json(e) => write!(f, "failed to parse config file: {}", e),
            Self::InvalidValue(name, value) => write!(f, "invalid value for {}: '{}'", name, value),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(!config.observer.realtime);
        assert_eq!(config.poll_timeout(), Duration::from_secs(1));
        assert_eq!(config.kill_timeout(), Duration::from_secs(5));
        assert_eq!(config.mode(), Mode::Batch);
        assert_eq!(config.requests.powershell, "powershell");
        assert_eq!(config.log_filter(), "info");
    }

    #[test]
    fn test_config_from_json() {
        let json = r#"{
            "observer": {
                "realtime": true,
                "poll_timeout_ms": 250
            },
            "requests": {
                "cache_dir": "/tmp/glue-cache"
            }
        }"#;

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.mode(), Mode::Realtime);
        assert_eq!(config.observer.poll_timeout_ms, 250);
        assert_eq!(config.observer.kill_timeout_ms, 5000); // Default
        assert_eq!(config.requests.cache_dir, PathBuf::from("/tmp/glue-cache"));
        assert_eq!(config.requests.script, PathBuf::from("REQUESTS.PS1"));
    }

    #[test]
    fn test_config_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"{ not json").unwrap();

        let result = Config::from_file(file.path());
        assert!(matches!(result, Err(ConfigError::Json(_))));
    }

    #[test]
    fn test_apply_vars() {
        let mut config = Config::default();
        config
            .apply_vars(vars(&[
                ("SCRIPT_GLUE_REALTIME", "yes"),
                ("SCRIPT_GLUE_KILL_TIMEOUT_MS", "1500"),
                ("SCRIPT_GLUE_CACHE_DIR", "/var/cache/glue"),
                ("RUST_LOG", "trace"),
            ]))
            .unwrap();

        assert!(config.observer.realtime);
        assert_eq!(config.kill_timeout(), Duration::from_millis(1500));
        assert_eq!(config.requests.cache_dir, PathBuf::from("/var/cache/glue"));
        assert_eq!(config.logging.level, "trace");
    }

    #[test]
    fn test_log_level_var_wins_over_rust_log() {
        let mut config = Config::default();
        config
            .apply_vars(vars(&[
                ("SCRIPT_GLUE_LOG_LEVEL", "warn"),
                ("RUST_LOG", "trace"),
            ]))
            .unwrap();
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_apply_vars_invalid() {
        let mut config = Config::default();
        let result = config.apply_vars(vars(&[("SCRIPT_GLUE_POLL_TIMEOUT_MS", "soon")]));
        assert!(matches!(result, Err(ConfigError::InvalidValue(_, _))));

        let result = config.apply_vars(vars(&[("SCRIPT_GLUE_REALTIME", "maybe")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_apply_args() {
        let mut config = Config::default();
        let args = Args {
            realtime: true,
            timeout_ms: Some(100),
            log_level: Some("debug".to_string()),
            ..Args::default()
        };

        config.apply_args(&args);

        assert_eq!(config.mode(), Mode::Realtime);
        assert_eq!(config.poll_timeout(), Duration::from_millis(100));
        assert_eq!(config.kill_timeout(), Duration::from_secs(5));
        assert_eq!(config.log_filter(), "debug");
    }

    #[test]
    fn test_to_request_settings() {
        let mut config = Config::default();
        config.requests.powershell = "pwsh".to_string();

        let settings = config.to_request_settings();
        assert_eq!(settings.powershell, "pwsh");
        assert_eq!(settings.powershell_args, RequestSettings::default().powershell_args);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        assert!(json.contains("\"poll_timeout_ms\""));
        assert!(json.contains("\"cache_dir\""));

        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
