//! Configuration management for VaultGate.
//!
//! TOML-based configuration with defaulted sections. The default
//! configuration path is `~/.config/vaultgate/config.toml`.

use std::collections::BTreeMap;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::authz::{default_role_folders, RoleFolderMap};
use crate::policy::default_mime_types;

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("max_file_size must be greater than 0")]
    InvalidMaxFileSize,

    #[error("direct_download_threshold {threshold} exceeds max_file_size {max}")]
    InvalidThreshold { threshold: u64, max: u64 },

    #[error("chunk_size must be greater than 0")]
    InvalidChunkSize,

    #[error("audit max_size must be greater than 0")]
    InvalidAuditMaxSize,

    #[error("audit max_files must be at least 1, got {0}")]
    InvalidAuditMaxFiles(usize),

    #[error("bind_addr is not a valid socket address: {0}")]
    InvalidBindAddr(String),

    #[error("log_level must be one of: trace, debug, info, warn, error; got {0}")]
    InvalidLogLevel(String),
}

/// Valid log level values for tracing configuration.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Main configuration structure for VaultGate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    /// Vault root, size limits, and role/MIME maps.
    pub vault: VaultConfig,

    /// Access audit log settings.
    pub audit: AuditConfig,

    /// Identity provider settings.
    pub identity: IdentityConfig,

    /// HTTP server settings.
    pub server: ServerConfig,
}

/// Vault directory and delivery limits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VaultConfig {
    /// Directory holding the protected files, outside any public web root.
    pub root: PathBuf,

    /// Hard cap on deliverable file size in bytes (default: 1GB).
    pub max_file_size: u64,

    /// Files at or below this size are sent in one read (default: 1MB).
    pub direct_download_threshold: u64,

    /// Read size per chunk for streamed files (default: 4MB).
    pub chunk_size: usize,

    /// Role name to top-level folder grants.
    pub role_folders: RoleFolderMap,

    /// Extension to MIME type labeling table.
    pub mime_types: BTreeMap<String, String>,
}

/// Access audit log settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AuditConfig {
    /// Whether access decisions are written to the audit log.
    pub enabled: bool,

    /// Directory for `access.log` and its rotated files.
    pub log_dir: PathBuf,

    /// Rotate the active log once it grows past this size (default: 5MB).
    pub max_size: u64,

    /// Keep at most this many rotated files (default: 5).
    pub max_files: usize,
}

/// Identity provider settings for the bundled token provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IdentityConfig {
    /// Where unauthenticated requests are redirected.
    pub login_url: String,

    /// Token value to granted roles.
    pub tokens: BTreeMap<String, Vec<String>>,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address, e.g. `127.0.0.1:8080`.
    pub bind_addr: String,

    /// Logging level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            root: default_data_dir().join("vault"),
            max_file_size: 1024 * 1024 * 1024, // 1GB
            direct_download_threshold: 1024 * 1024, // 1MB
            chunk_size: 4 * 1024 * 1024, // 4MB
            role_folders: default_role_folders(),
            mime_types: default_mime_types(),
        }
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_dir: default_data_dir().join("logs"),
            max_size: 5 * 1024 * 1024, // 5MB
            max_files: 5,
        }
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            login_url: "/login".to_string(),
            tokens: BTreeMap::new(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Returns the default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vaultgate")
        .join("config.toml")
}

/// Returns the default data directory path.
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("vaultgate")
}

impl Config {
    /// Apply environment variable overrides to the configuration.
    ///
    /// Environment variables take precedence over config file values.
    /// Supported variables:
    /// - VAULTGATE_BIND_ADDR: Override listen address
    /// - VAULTGATE_LOG_LEVEL: Override log level (trace, debug, info, warn, error)
    pub fn apply_env_overrides(&mut self) {
        if let Ok(addr) = std::env::var("VAULTGATE_BIND_ADDR") {
            if !addr.is_empty() {
                tracing::info!("Overriding bind_addr from environment: {}", addr);
                self.server.bind_addr = addr;
            }
        }

        if let Ok(level) = std::env::var("VAULTGATE_LOG_LEVEL") {
            if !level.is_empty() {
                tracing::info!("Overriding log_level from environment: {}", level);
                self.server.log_level = level;
            }
        }
    }

    /// Validate the configuration values.
    ///
    /// Returns an error if any configuration value is outside the valid range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.vault.max_file_size == 0 {
            return Err(ConfigError::InvalidMaxFileSize);
        }

        if self.vault.direct_download_threshold > self.vault.max_file_size {
            return Err(ConfigError::InvalidThreshold {
                threshold: self.vault.direct_download_threshold,
                max: self.vault.max_file_size,
            });
        }

        if self.vault.chunk_size == 0 {
            return Err(ConfigError::InvalidChunkSize);
        }

        if self.audit.max_size == 0 {
            return Err(ConfigError::InvalidAuditMaxSize);
        }

        if self.audit.max_files < 1 {
            return Err(ConfigError::InvalidAuditMaxFiles(self.audit.max_files));
        }

        if self.server.bind_addr.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::InvalidBindAddr(self.server.bind_addr.clone()));
        }

        let level = self.server.log_level.to_lowercase();
        if !VALID_LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(self.server.log_level.clone()));
        }

        Ok(())
    }

    /// Load configuration from a file.
    ///
    /// If the file does not exist, returns the default configuration.
    /// If the file exists but is invalid TOML, returns an error with
    /// a helpful message.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Load configuration from the default path.
    ///
    /// The default path is `~/.config/vaultgate/config.toml`.
    pub fn load_default() -> Result<Self> {
        Self::load(default_config_path())
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| anyhow::anyhow!("Invalid TOML configuration: {}", format_toml_error(&e)))
    }

    /// Save configuration to a file.
    ///
    /// Creates parent directories if they don't exist.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let contents = self.to_toml()?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::debug!("Configuration saved to {:?}", path);
        Ok(())
    }

    /// Serialize configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")
    }
}

/// Format a TOML deserialization error for user-friendly display.
fn format_toml_error(error: &toml::de::Error) -> String {
    let mut msg = error.message().to_string();

    if let Some(span) = error.span() {
        msg.push_str(&format!(" (at position {}..{})", span.start, span.end));
    }

    msg
}
