// Tracing subscriber setup for the binary

use tracing::Level;

use crate::error::{CliError, CliResult};

/// Parses a level name, falling back to `INFO` for anything unrecognized
pub fn parse_level(name: &str) -> Level {
    match name.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Installs a fmt subscriber writing to stderr
///
/// Stdout carries the JSON response only. Source locations are included at
/// `debug` and below.
pub fn init_logging(level_name: &str) -> CliResult<()> {
    use tracing_subscriber::fmt;

    let level = parse_level(level_name);
    let detailed = level >= Level::DEBUG;

    fmt()
        .with_max_level(level)
        .with_target(detailed)
        .with_file(detailed)
        .with_line_number(detailed)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| CliError::Internal(format!("failed to initialize logging: {}", e)))
}
