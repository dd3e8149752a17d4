//! Serve command - run the ghost-text language server on stdio

use std::sync::Arc;

use async_trait::async_trait;
use ghostline_lsp::{GhostTextServer, HttpCompletionProvider, ServerConfig};
use tracing::{error, info};

use crate::commands::{Command, ServerArgs};
use crate::error::{CliError, CliResult};
use crate::logging::init_logging;

pub struct ServeCommand {
    args: ServerArgs,
    debug: bool,
}

impl ServeCommand {
    pub fn new(args: ServerArgs, debug: bool) -> Self {
        Self { args, debug }
    }

    /// Level to log at: `--log-level`, then `--debug`, then the config
    pub fn log_level(&self, config: &ServerConfig) -> String {
        match (&self.args.log_level, self.debug) {
            (Some(level), _) => level.clone(),
            (None, true) => "debug".to_string(),
            (None, false) => config.log_level.clone(),
        }
    }
}

#[async_trait]
impl Command for ServeCommand {
    async fn execute(&self) -> CliResult<()> {
        let config = self.args.resolve()?;
        init_logging(&self.log_level(&config), self.debug)?;

        info!(endpoint = %config.endpoint, "Starting ghost text server");
        info!("Listening on stdio transport");

        let provider = HttpCompletionProvider::new(config.endpoint.clone(), config.request_timeout())
            .map_err(|e| CliError::Config(e.to_string()))?;

        tokio::select! {
            result = GhostTextServer::serve(config, Arc::new(provider), tokio::io::stdin(), tokio::io::stdout()) => {
                match result {
                    Ok(()) => {
                        info!("Ghost text server shut down gracefully");
                        Ok(())
                    }
                    Err(e) => {
                        error!("Ghost text server error: {}", e);
                        Err(CliError::Server(e.to_string()))
                    }
                }
            }
            signal = tokio::signal::ctrl_c() => {
                match signal {
                    Ok(()) => info!("Received shutdown signal (SIGINT)"),
                    Err(e) => error!("Failed to listen for shutdown signal: {}", e),
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_precedence() {
        let config = ServerConfig {
            log_level: "warn".to_string(),
            ..ServerConfig::default()
        };

        let plain = ServeCommand::new(ServerArgs::default(), false);
        assert_eq!(plain.log_level(&config), "warn");

        let debug = ServeCommand::new(ServerArgs::default(), true);
        assert_eq!(debug.log_level(&config), "debug");

        let explicit = ServeCommand::new(
            ServerArgs {
                log_level: Some("trace".to_string()),
                ..ServerArgs::default()
            },
            true,
        );
        assert_eq!(explicit.log_level(&config), "trace");
    }
}
