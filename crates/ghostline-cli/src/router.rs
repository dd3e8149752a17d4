// Command routing and dispatch

use clap::{Parser, Subcommand};

use crate::commands::{Command, ConfigCommand, ServeCommand, ServerArgs};
use crate::error::CliResult;

/// Ghostline - inline LLM suggestions over the Language Server Protocol
#[derive(Parser, Debug)]
#[command(name = "ghostline")]
#[command(bin_name = "ghostline")]
#[command(about = "Ghost-text language server")]
#[command(version)]
#[command(author = "Ghostline Contributors")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Run the ghost-text language server on stdin/stdout
    Serve {
        #[command(flatten)]
        server: ServerArgs,

        /// Verbose logging with source locations
        #[arg(long)]
        debug: bool,
    },

    /// Print the effective server configuration as YAML
    Config {
        #[command(flatten)]
        server: ServerArgs,
    },
}

/// Command router
pub struct CommandRouter;

impl CommandRouter {
    /// Parse arguments and run the command
    pub async fn route() -> CliResult<()> {
        let cli = Cli::parse();
        Self::execute(&cli).await
    }

    pub async fn execute(cli: &Cli) -> CliResult<()> {
        match &cli.command {
            Commands::Serve { server, debug } => {
                ServeCommand::new(server.clone(), *debug).execute().await
            }
            Commands::Config { server } => ConfigCommand::new(server.clone()).execute().await,
        }
    }
}
