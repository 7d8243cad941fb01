//! BulkEdit CLI
//!
//! Thin command-line front end over [`bulkedit_core::BulkEditTools`]: each
//! command becomes one tool call whose JSON response is printed to stdout.

pub mod error;
pub mod logging;
pub mod router;

pub use error::{CliError, CliResult};
pub use router::{Cli, CommandOutput, CommandRouter, Commands};
