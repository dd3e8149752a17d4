// CLI errors

use ghostline_lsp::LspError;
use thiserror::Error;

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CliError {
    /// User-facing message with a hint
    pub fn user_message(&self) -> String {
        match self {
            CliError::InvalidArgument { message } => {
                format!(
                    "Invalid argument: {}\n\nRun 'ghostline --help' for usage information.",
                    message
                )
            }
            CliError::Io(e) => format!("File operation failed: {}", e),
            CliError::Config(msg) => {
                format!(
                    "Configuration error: {}\n\nRun 'ghostline config' to see the effective configuration.",
                    msg
                )
            }
            CliError::Server(msg) => format!("Ghost text server stopped with an error: {}", msg),
            CliError::Internal(msg) => {
                format!("Internal error: {}\n\nPlease report this issue.", msg)
            }
        }
    }
}

impl From<LspError> for CliError {
    fn from(err: LspError) -> Self {
        match err {
            LspError::ParseError(_) | LspError::InvalidParams(_) => {
                CliError::Config(err.to_string())
            }
            LspError::IoError(msg) => CliError::Io(std::io::Error::new(std::io::ErrorKind::Other, msg)),
            other => CliError::Server(other.to_string()),
        }
    }
}

pub type CliResult<T> = Result<T, CliError>;
