//! Config command - print the effective server configuration

use async_trait::async_trait;
use ghostline_lsp::ServerConfig;

use crate::commands::{Command, ServerArgs};
use crate::error::{CliError, CliResult};

pub struct ConfigCommand {
    args: ServerArgs,
}

impl ConfigCommand {
    pub fn new(args: ServerArgs) -> Self {
        Self { args }
    }

    /// Effective configuration as YAML
    pub fn render(&self) -> CliResult<String> {
        render_yaml(&self.args.resolve()?)
    }
}

#[async_trait]
impl Command for ConfigCommand {
    async fn execute(&self) -> CliResult<()> {
        print!("{}", self.render()?);
        Ok(())
    }
}

fn render_yaml(config: &ServerConfig) -> CliResult<String> {
    serde_yaml::to_string(config)
        .map_err(|e| CliError::Internal(format!("Failed to render config: {}", e)))
}
