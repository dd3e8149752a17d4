//! Ghost-text session configuration
//!
//! Loaded from YAML or JSON and validated before use.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{GhostTextError, GhostTextResult};
use crate::invalidation::CursorPolicy;

/// Upper bound on the debounce delay
pub const MAX_DEBOUNCE_MS: u64 = 10_000;

/// Configuration file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Json,
}

impl ConfigFormat {
    /// Guess the format from a file extension; defaults to YAML
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => ConfigFormat::Json,
            _ => ConfigFormat::Yaml,
        }
    }
}

/// Per-session ghost-text settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GhostTextConfig {
    /// Request suggestions automatically after the debounce delay
    pub auto_trigger: bool,
    /// Idle time after an edit before an automatic request
    pub debounce_ms: u64,
    /// Treatment of cursor events on the anchor line
    pub cursor_policy: CursorPolicy,
}

impl Default for GhostTextConfig {
    fn default() -> Self {
        Self {
            auto_trigger: true,
            debounce_ms: 300,
            cursor_policy: CursorPolicy::AnyMovement,
        }
    }
}

impl GhostTextConfig {
    /// Debounce delay as a `Duration`
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Parse and validate configuration text
    pub fn load_from_string(content: &str, format: ConfigFormat) -> GhostTextResult<Self> {
        let config: GhostTextConfig = match format {
            ConfigFormat::Yaml => serde_yaml::from_str(content)?,
            ConfigFormat::Json => serde_json::from_str(content)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration file
    pub fn load(path: &Path) -> GhostTextResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::load_from_string(&content, ConfigFormat::from_path(path))
    }

    /// Check value ranges
    pub fn validate(&self) -> GhostTextResult<()> {
        if self.debounce_ms == 0 || self.debounce_ms > MAX_DEBOUNCE_MS {
            return Err(GhostTextError::Config(format!(
                "debounce_ms must be between 1 and {}, got {}",
                MAX_DEBOUNCE_MS, self.debounce_ms
            )));
        }
        Ok(())
    }
}
