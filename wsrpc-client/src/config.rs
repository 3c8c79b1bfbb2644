//! Session configuration.
//!
//! Configuration is loaded in the following order (later overrides earlier):
//! 1. Default values
//! 2. YAML config file (if specified via WSRPC_CONFIG)
//! 3. Environment variables

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use wsrpc_protocol::codec::MAX_DEPTH;
use wsrpc_protocol::CodecLimits;

/// Highest id base a config may set, leaving at least half of the id
/// space for allocation.
pub const MAX_ID_BASE: u64 = u64::MAX / 2;

/// Session configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Codec limits.
    pub codec: CodecLimits,
    /// Pending table configuration.
    pub pending: PendingConfig,
}

impl Config {
    /// Loads configuration from file, then applies environment variable overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("WSRPC_CONFIG") {
            config = Self::from_file(&path)?;
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        let config: Config = serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from environment variables only.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// Saves configuration to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = serde_yaml::to_string(self)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
        std::fs::write(path, content).map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        Ok(())
    }

    /// Checks that the limits can be honoured.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.codec.max_depth == 0 || self.codec.max_depth > MAX_DEPTH {
            return Err(ConfigError::ValidationError(format!(
                "codec.max_depth must be between 1 and {}, got {}",
                MAX_DEPTH, self.codec.max_depth
            )));
        }
        if self.codec.max_binaries == 0 {
            return Err(ConfigError::ValidationError(
                "codec.max_binaries must be at least 1".to_string(),
            ));
        }
        if self.pending.id_base > MAX_ID_BASE {
            return Err(ConfigError::ValidationError(format!(
                "pending.id_base must be at most {}, got {}",
                MAX_ID_BASE, self.pending.id_base
            )));
        }
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        override_from_env("WSRPC_MAX_DEPTH", &mut self.codec.max_depth);
        override_from_env("WSRPC_MAX_BINARIES", &mut self.codec.max_binaries);
        self.pending.apply_env_overrides();
    }
}

/// Pending table configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PendingConfig {
    /// Identifiers start at `id_base + 1`. Give tables that must never
    /// collide disjoint bases.
    pub id_base: u64,
    /// Live entries to preallocate room for.
    pub initial_capacity: usize,
}

impl PendingConfig {
    fn apply_env_overrides(&mut self) {
        override_from_env("WSRPC_ID_BASE", &mut self.id_base);
        override_from_env("WSRPC_INITIAL_CAPACITY", &mut self.initial_capacity);
    }
}

fn override_from_env<T: std::str::FromStr>(var: &str, target: &mut T) {
    if let Ok(raw) = std::env::var(var) {
        match raw.parse() {
            Ok(parsed) => *target = parsed,
            Err(_) => tracing::warn!("ignoring {}={:?}: not a valid number", var, raw),
        }
    }
}

/// Configuration error.
#[derive(Debug)]
pub enum ConfigError {
    IoError(PathBuf, std::io::Error),
    ParseError(PathBuf, String),
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(path, e) => {
                write!(f, "failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::ValidationError(msg) => {
                write!(f, "configuration validation failed: {}", msg)
            }
        }
    }
}

impl std::error::Error for ConfigError {}
