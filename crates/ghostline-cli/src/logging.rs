// Logging setup for the server process

use crate::error::{CliError, CliResult};

/// Map a level name to a tracing level, falling back to INFO
pub fn parse_level(name: &str) -> tracing::Level {
    match name.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    }
}

/// Install the stderr subscriber
///
/// Stdout carries the protocol, so nothing may log there. `debug` adds
/// targets, thread ids and source locations.
pub fn init_logging(level: &str, debug: bool) -> CliResult<()> {
    use tracing_subscriber::fmt;

    fmt()
        .with_max_level(parse_level(level))
        .with_target(debug)
        .with_thread_ids(debug)
        .with_file(debug)
        .with_line_number(debug)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| CliError::Internal(format!("Failed to install logger: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("DEBUG"), tracing::Level::DEBUG);
        assert_eq!(parse_level("warn"), tracing::Level::WARN);
        assert_eq!(parse_level("chatty"), tracing::Level::INFO);
    }
}
