// CLI error types and user-facing messages

use bulkedit_core::BulkEditError;
use thiserror::Error;

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Unknown tool: {tool}. Did you mean: {suggestion}?")]
    ToolNotFound { tool: String, suggestion: String },

    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Engine error: {0}")]
    Engine(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<BulkEditError> for CliError {
    fn from(err: BulkEditError) -> Self {
        match err {
            BulkEditError::Config(msg) => CliError::Config(msg),
            other => CliError::Engine(other.to_string()),
        }
    }
}

impl CliError {
    /// Get a user-friendly error message with suggestions
    pub fn user_message(&self) -> String {
        match self {
            CliError::ToolNotFound { tool, suggestion } => {
                format!(
                    "Tool '{}' not found.\n\nDid you mean: {}\n\nRun 'bulkedit tools' for the available tools.",
                    tool, suggestion
                )
            }
            CliError::InvalidArgument { message } => {
                format!(
                    "Invalid argument: {}\n\nRun 'bulkedit --help' for usage information.",
                    message
                )
            }
            CliError::Io(e) => format!("File operation failed: {}", e),
            CliError::Config(msg) => {
                format!(
                    "Configuration error: {}\n\nCheck bulkedit.toml and BULKEDIT_* environment variables.",
                    msg
                )
            }
            CliError::Engine(msg) => format!("Bulk edit failed: {}", msg),
            CliError::Internal(msg) => {
                format!("Internal error: {}\n\nPlease report this issue.", msg)
            }
        }
    }
}

pub type CliResult<T> = Result<T, CliError>;
