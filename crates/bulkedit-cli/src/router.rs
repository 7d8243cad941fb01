// Command routing and dispatch

use std::path::{Path, PathBuf};

use bulkedit_core::{BulkEditTools, EngineConfig, ToolResponse, TOOL_NAMES};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use tokio::io::AsyncReadExt;
use tracing::debug;

use crate::error::{CliError, CliResult};

/// BulkEdit - apply, preview and roll back edits across many files
#[derive(Parser, Debug)]
#[command(name = "bulkedit")]
#[command(bin_name = "bulkedit")]
#[command(about = "Apply, preview and roll back edits across many files")]
#[command(
    long_about = "BulkEdit: structured text edits across many files, with dry-run preview, validation, impact estimation and session-based rollback.\n\nQuick Start:\n  • bulkedit tools                         List available tools\n  • bulkedit call bulk_replace --args '{...}'  Run a tool\n  • bulkedit rollbacks                     List rollback sessions\n  • bulkedit rollback <ID>                 Restore a session"
)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (default: ./bulkedit.toml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log level: trace, debug, info, warn or error
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Workspace root for relative file patterns
    #[arg(long, global = true, value_name = "DIR")]
    pub root: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Invoke a tool with a JSON argument object
    #[command(about = "Invoke a tool with a JSON argument object read from --args, --args-file or stdin")]
    Call {
        /// Tool name (see `bulkedit tools`)
        #[arg(value_name = "TOOL")]
        tool: String,

        /// Arguments as a JSON string
        #[arg(long, conflicts_with = "args_file")]
        args: Option<String>,

        /// File holding the JSON arguments
        #[arg(long, value_name = "FILE")]
        args_file: Option<PathBuf>,
    },

    /// List the tool names
    #[command(about = "List the tools `call` accepts")]
    Tools,

    /// List rollback sessions
    #[command(about = "List rollback sessions that have not expired")]
    Rollbacks,

    /// Restore a rollback session
    #[command(about = "Restore every file of a rollback session to its pre-edit content")]
    Rollback {
        /// Session id returned by an edit
        #[arg(value_name = "ID")]
        id: String,
    },

    /// Delete expired rollback sessions
    #[command(about = "Delete expired rollback sessions and their stored pre-images")]
    Cleanup,
}

/// What a command printed and whether it succeeded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Text for stdout
    pub text: String,
    /// False maps to exit code 1
    pub success: bool,
}

impl CommandOutput {
    fn from_response(response: &ToolResponse) -> CliResult<Self> {
        let text = response
            .to_json_pretty()
            .map_err(|e| CliError::Internal(format!("failed to render response: {}", e)))?;
        Ok(Self {
            text,
            success: response.success,
        })
    }
}

/// Command router
pub struct CommandRouter;

impl CommandRouter {
    /// Parse arguments, set up logging and run the command
    pub async fn route() -> CliResult<CommandOutput> {
        let cli = Cli::parse();
        let config = Self::load_config(&cli)?;

        crate::logging::init_logging(&config.log_level)?;

        Self::execute(&cli, &config).await
    }

    /// Loads configuration and applies the global flags on top of it
    pub fn load_config(cli: &Cli) -> CliResult<EngineConfig> {
        let mut config = EngineConfig::load(cli.config.as_deref())?;
        if let Some(root) = &cli.root {
            config = config.with_workspace_root(root.clone());
        }
        if let Some(level) = &cli.log_level {
            config.log_level = level.clone();
        }
        Ok(config)
    }

    /// Execute a command
    pub async fn execute(cli: &Cli, config: &EngineConfig) -> CliResult<CommandOutput> {
        let (tool, args) = match &cli.command {
            Commands::Tools => {
                return Ok(CommandOutput {
                    text: TOOL_NAMES.join("\n"),
                    success: true,
                })
            }
            Commands::Call {
                tool,
                args,
                args_file,
            } => {
                ensure_known(tool)?;
                let args = read_args(args.as_deref(), args_file.as_deref()).await?;
                (tool.as_str(), args)
            }
            Commands::Rollbacks => ("get_available_rollbacks", json!({})),
            Commands::Rollback { id } => ("rollback_bulk_edit", json!({ "rollbackId": id })),
            Commands::Cleanup => ("cleanup_expired_rollbacks", json!({})),
        };

        debug!(tool, root = %config.workspace_root.display(), "Dispatching");
        let tools = BulkEditTools::from_config(config).await?;
        let response = tools.call(tool, args).await;
        CommandOutput::from_response(&response)
    }
}

fn ensure_known(tool: &str) -> CliResult<()> {
    if TOOL_NAMES.contains(&tool) {
        return Ok(());
    }
    Err(CliError::ToolNotFound {
        tool: tool.to_string(),
        suggestion: suggest(tool),
    })
}

/// Closest tool name by shared leading characters
fn suggest(tool: &str) -> String {
    TOOL_NAMES
        .iter()
        .map(|name| {
            let shared = name
                .chars()
                .zip(tool.chars())
                .take_while(|(a, b)| a == b)
                .count();
            (shared, *name)
        })
        .filter(|(shared, _)| *shared > 0)
        .max_by_key(|(shared, _)| *shared)
        .map(|(_, name)| name.to_string())
        .unwrap_or_else(|| TOOL_NAMES.join(", "))
}

/// Reads the argument object from the flag, the file, or stdin
pub async fn read_args(inline: Option<&str>, file: Option<&Path>) -> CliResult<Value> {
    let raw = match (inline, file) {
        (Some(inline), _) => inline.to_string(),
        (None, Some(path)) => tokio::fs::read_to_string(path).await?,
        (None, None) => {
            let mut buffer = String::new();
            tokio::io::stdin().read_to_string(&mut buffer).await?;
            buffer
        }
    };

    if raw.trim().is_empty() {
        return Ok(json!({}));
    }
    serde_json::from_str(&raw).map_err(|e| CliError::InvalidArgument {
        message: format!("arguments are not valid JSON: {}", e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("bulkedit").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = parse(&["rollback", "abc", "--root", "/tmp/ws", "--log-level", "debug"]);
        assert_eq!(cli.root, Some(PathBuf::from("/tmp/ws")));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert!(matches!(cli.command, Commands::Rollback { ref id } if id == "abc"));
    }

    #[test]
    fn test_args_and_args_file_conflict() {
        let parsed = Cli::try_parse_from([
            "bulkedit",
            "call",
            "bulk_replace",
            "--args",
            "{}",
            "--args-file",
            "a.json",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_suggest_prefers_longest_shared_prefix() {
        assert_eq!(suggest("bulk_replac"), "bulk_replace");
        assert_eq!(suggest("rollback"), "rollback_bulk_edit");
        assert!(suggest("zzz").contains("bulk_replace"));
    }

    #[tokio::test]
    async fn test_read_args_inline_and_file() {
        let inline = read_args(Some(r#"{"files": ["a.txt"]}"#), None).await.unwrap();
        assert_eq!(inline["files"][0], "a.txt");

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"rollbackId": "s1"}}"#).unwrap();
        let from_file = read_args(None, Some(file.path())).await.unwrap();
        assert_eq!(from_file["rollbackId"], "s1");
    }

    #[tokio::test]
    async fn test_read_args_rejects_invalid_json() {
        let err = read_args(Some("{not json"), None).await.unwrap_err();
        assert!(matches!(err, CliError::InvalidArgument { .. }));
    }

    #[tokio::test]
    async fn test_tools_lists_every_name() {
        let output = CommandRouter::execute(&parse(&["tools"]), &EngineConfig::default())
            .await
            .unwrap();
        assert!(output.success);
        assert_eq!(output.text.lines().count(), TOOL_NAMES.len());
    }

    #[tokio::test]
    async fn test_unknown_tool_is_rejected_before_dispatch() {
        let cli = parse(&["call", "bulk_replac", "--args", "{}"]);
        let err = CommandRouter::execute(&cli, &EngineConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CliError::ToolNotFound { .. }));
    }

    #[tokio::test]
    async fn test_rollback_of_unknown_session_fails() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig::default().with_workspace_root(dir.path());
        let output = CommandRouter::execute(&parse(&["rollback", "missing"]), &config)
            .await
            .unwrap();
        assert!(!output.success);
        assert!(output.text.contains("missing"));
    }
}
