//! Client configuration.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Tunables for request fan-out and correlation.
///
/// ```toml
/// group_size = 4
/// response_multiplier = 2
/// get_timeout_ms = 10000
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// Number of holders a request is replicated to.
    pub group_size: usize,
    /// Responses expected per holder before a task stops listening.
    pub response_multiplier: usize,
    /// Default deadline for a get.
    pub get_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            group_size: 4,
            response_multiplier: 2,
            get_timeout_ms: 10_000,
        }
    }
}

impl ClientConfig {
    /// Parse and validate a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Reject settings that would make every get fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.group_size == 0 {
            return Err(ConfigError::Zero("group_size"));
        }
        if self.response_multiplier == 0 {
            return Err(ConfigError::Zero("response_multiplier"));
        }
        Ok(())
    }

    /// How many responses a task waits for before giving up on the group.
    pub fn expected_response_count(&self) -> usize {
        self.group_size * self.response_multiplier
    }

    pub fn get_timeout(&self) -> Duration {
        Duration::from_millis(self.get_timeout_ms)
    }
}

/// Failure loading a [`ClientConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}
