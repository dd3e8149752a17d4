//! Server configuration
//!
//! Defaults, then an optional YAML file, then `GHOSTLINE_*` environment
//! variables. Command-line flags are applied on top by the binary.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{LspError, LspResult};

/// Completion endpoint override
pub const ENV_ENDPOINT: &str = "GHOSTLINE_ENDPOINT";
/// Log level override
pub const ENV_LOG_LEVEL: &str = "GHOSTLINE_LOG_LEVEL";

pub const DEFAULT_ENDPOINT: &str = "http://main:8000/generate";

/// Ghost-text server settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// URL the completion context is posted to
    pub endpoint: String,
    /// Per-request timeout for the completion endpoint
    pub request_timeout_ms: u64,
    /// Lines above the cursor sent as context
    pub prefix_lines: usize,
    /// Lines below the cursor sent as context
    pub suffix_lines: usize,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            request_timeout_ms: 15_000,
            prefix_lines: 30,
            suffix_lines: 30,
            log_level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// `<config dir>/ghostline/server.yaml`, if the platform has a config dir
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("ghostline").join("server.yaml"))
    }

    /// Parse YAML and validate
    pub fn load_from_string(content: &str) -> LspResult<Self> {
        let config: ServerConfig = serde_yaml::from_str(content)
            .map_err(|e| LspError::ParseError(format!("Invalid server config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a YAML file
    pub fn load(path: &Path) -> LspResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            LspError::IoError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::load_from_string(&content)
    }

    /// Resolve the effective configuration
    ///
    /// An explicit `path` must exist. Without one, the default path is used
    /// when present. Environment overrides are applied last.
    pub fn resolve(path: Option<&Path>) -> LspResult<Self> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(path) => {
                    debug!(path = %path.display(), "Loading server config");
                    Self::load(&path)?
                }
                None => Self::default(),
            },
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply `GHOSTLINE_*` overrides through `lookup`
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(endpoint) = lookup(ENV_ENDPOINT).filter(|v| !v.is_empty()) {
            self.endpoint = endpoint;
        }
        if let Some(level) = lookup(ENV_LOG_LEVEL).filter(|v| !v.is_empty()) {
            self.log_level = level;
        }
    }

    pub fn validate(&self) -> LspResult<()> {
        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            return Err(LspError::InvalidParams(format!(
                "endpoint must be an http(s) URL, got {:?}",
                self.endpoint
            )));
        }
        if self.request_timeout_ms == 0 {
            return Err(LspError::InvalidParams(
                "request_timeout_ms must be positive".to_string(),
            ));
        }
        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
            other => Err(LspError::InvalidParams(format!("Unknown log level: {}", other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.endpoint, "http://main:8000/generate");
        assert_eq!(config.request_timeout(), Duration::from_secs(15));
        assert_eq!((config.prefix_lines, config.suffix_lines), (30, 30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = ServerConfig::default();
        config.apply_env(|key| match key {
            ENV_ENDPOINT => Some("http://localhost:9000/v1".to_string()),
            ENV_LOG_LEVEL => Some(String::new()),
            _ => None,
        });
        assert_eq!(config.endpoint, "http://localhost:9000/v1");
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_load_yaml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "prefix_lines: 5\nlog_level: debug").unwrap();

        let config = ServerConfig::load(file.path()).unwrap();
        assert_eq!(config.prefix_lines, 5);
        assert_eq!(config.suffix_lines, 30);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(ServerConfig::load_from_string("endpoint: ftp://x").is_err());
        assert!(ServerConfig::load_from_string("request_timeout_ms: 0").is_err());
        assert!(ServerConfig::load_from_string("log_level: loud").is_err());
        assert!(ServerConfig::load_from_string("prefix_lines: [").is_err());
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.yaml");
        assert!(matches!(
            ServerConfig::resolve(Some(&missing)),
            Err(LspError::IoError(_))
        ));
    }
}
