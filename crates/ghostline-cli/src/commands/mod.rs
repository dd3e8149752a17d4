// Command handlers for the ghostline CLI

pub mod config;
pub mod serve;

pub use config::ConfigCommand;
pub use serve::ServeCommand;

use std::path::PathBuf;

use clap::Args;
use ghostline_lsp::ServerConfig;

use crate::error::CliResult;

/// Trait for command handlers
#[async_trait::async_trait]
pub trait Command: Send + Sync {
    /// Execute the command
    async fn execute(&self) -> CliResult<()>;
}

/// Options shared by every command that needs a server configuration
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerArgs {
    /// Server config file (default: <config dir>/ghostline/server.yaml)
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Completion endpoint URL
    #[arg(long, value_name = "URL")]
    pub endpoint: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,
}

impl ServerArgs {
    /// Config file and environment, then these flags on top
    pub fn resolve(&self) -> CliResult<ServerConfig> {
        let mut config = ServerConfig::resolve(self.config.as_deref())?;
        self.apply(&mut config);
        config.validate()?;
        Ok(config)
    }

    fn apply(&self, config: &mut ServerConfig) {
        if let Some(endpoint) = &self.endpoint {
            config.endpoint = endpoint.clone();
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
    }
}
