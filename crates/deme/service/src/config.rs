//! Configuration for deme-service

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Service configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Per (option, judge) call timeout in milliseconds
    #[serde(default = "default_judge_timeout")]
    pub judge_timeout_ms: u64,

    /// Maximum judge calls in flight
    #[serde(default = "default_max_parallel")]
    pub max_parallel_judges: usize,

    /// Directories scanned for profile documents, in order
    #[serde(default)]
    pub profile_dirs: Vec<PathBuf>,

    /// Register the built-in profiles before loading documents
    #[serde(default = "default_true")]
    pub include_builtin_profiles: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            judge_timeout_ms: default_judge_timeout(),
            max_parallel_judges: default_max_parallel(),
            profile_dirs: Vec::new(),
            include_builtin_profiles: true,
        }
    }
}

// Default value helpers
fn default_true() -> bool {
    true
}

fn default_judge_timeout() -> u64 {
    2000
}

fn default_max_parallel() -> usize {
    8
}

impl ServiceConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: ServiceConfig =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file. Relative profile directories are
    /// resolved against the file's directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let mut config = Self::from_toml(&content)?;
        if let Some(base) = path.parent() {
            for dir in &mut config.profile_dirs {
                if dir.is_relative() {
                    *dir = base.join(&*dir);
                }
            }
        }
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.judge_timeout_ms == 0 {
            return Err(ConfigError::Invalid("judge_timeout_ms must be positive".into()));
        }
        if self.max_parallel_judges == 0 {
            return Err(ConfigError::Invalid(
                "max_parallel_judges must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Serialize to TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}
