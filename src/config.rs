//! Configuration module for filedrop.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::file::DEFAULT_FOLDER_MARKER;
use crate::{FiledropError, Result};

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// First port to try. Ports in use are skipped upwards.
    #[serde(default = "default_port")]
    pub port: u16,
    /// How many consecutive ports to try before giving up.
    #[serde(default = "default_port_attempts")]
    pub port_attempts: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_port_attempts() -> u16 {
    100
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            port_attempts: default_port_attempts(),
        }
    }
}

/// File serving configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FilesConfig {
    /// Directory served and written to. Created at startup if missing.
    #[serde(default = "default_root")]
    pub root: String,
    /// Extension (without dot) marking an upload as a zipped folder.
    #[serde(default = "default_folder_marker")]
    pub folder_marker: String,
    /// Maximum upload size in megabytes.
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size_mb: u64,
    /// Directory for buffering folder uploads (defaults to the OS temp dir).
    #[serde(default)]
    pub temp_dir: Option<String>,
}

fn default_root() -> String {
    ".".to_string()
}

fn default_folder_marker() -> String {
    DEFAULT_FOLDER_MARKER.to_string()
}

fn default_max_upload_size() -> u64 {
    1024
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            folder_marker: default_folder_marker(),
            max_upload_size_mb: default_max_upload_size(),
            temp_dir: None,
        }
    }
}

impl FilesConfig {
    /// Maximum upload size in bytes.
    pub fn max_upload_size_bytes(&self) -> u64 {
        self.max_upload_size_mb.saturating_mul(1024 * 1024)
    }

    /// Temp directory, if configured.
    pub fn temp_dir_path(&self) -> Option<PathBuf> {
        self.temp_dir.as_ref().map(PathBuf::from)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Optional log file; console only when unset.
    #[serde(default)]
    pub file: Option<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// File serving configuration.
    #[serde(default)]
    pub files: FilesConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(FiledropError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| FiledropError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `FILEDROP_ROOT`: Override the served directory
    /// - `FILEDROP_PORT`: Override the base port (ignored if not a number)
    pub fn apply_env_overrides(&mut self) {
        let rejected = self.apply_overrides(
            std::env::var("FILEDROP_ROOT").ok(),
            std::env::var("FILEDROP_PORT").ok(),
        );
        // Runs before logging is set up.
        if let Some(port) = rejected {
            eprintln!("Ignoring invalid FILEDROP_PORT: {port:?}");
        }
    }

    /// Returns the port value when it is not a valid port number.
    fn apply_overrides(&mut self, root: Option<String>, port: Option<String>) -> Option<String> {
        if let Some(root) = root.filter(|r| !r.is_empty()) {
            self.files.root = root;
        }
        let port = port?;
        match port.parse() {
            Ok(parsed) => {
                self.server.port = parsed;
                None
            }
            Err(_) => Some(port),
        }
    }

    /// Validate the configuration.
    ///
    /// Returns an error if:
    /// - The folder marker is empty or contains a dot or path separator
    /// - `port_attempts` is zero
    pub fn validate(&self) -> Result<()> {
        let marker = &self.files.folder_marker;
        if marker.is_empty() || marker.contains(['.', '/', '\\']) || !marker.is_ascii() {
            return Err(FiledropError::Config(format!(
                "folder_marker must be a non-empty ASCII extension without dots or separators, got {marker:?}"
            )));
        }
        if self.server.port_attempts == 0 {
            return Err(FiledropError::Config(
                "port_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
