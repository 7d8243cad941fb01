//! Engine configuration
//!
//! Loaded from an optional TOML file layered under `BULKEDIT_*` environment
//! variables, e.g. `BULKEDIT_ROLLBACK_TTL_HOURS=48`.

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::{BulkEditError, Result};

/// Default configuration file name, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "bulkedit.toml";

/// Environment variable prefix
pub const ENV_PREFIX: &str = "BULKEDIT";

/// Configuration for the bulk edit engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Base directory for relative file patterns
    pub workspace_root: PathBuf,
    /// Rollback-session store root, relative to `workspace_root` unless absolute
    pub backup_dir: PathBuf,
    /// Session lifetime in hours
    pub rollback_ttl_hours: i64,
    /// Default worker-pool size; host CPU count when unset
    pub max_parallelism: Option<usize>,
    /// Files above this size are flagged in reports
    pub large_file_threshold_bytes: u64,
    /// Log level used by the CLI
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workspace_root: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            backup_dir: PathBuf::from(".bulkedit").join("rollback"),
            rollback_ttl_hours: 24,
            max_parallelism: None,
            large_file_threshold_bytes: 1024 * 1024,
            log_level: "info".to_string(),
        }
    }
}

impl EngineConfig {
    /// Loads configuration from `path` (or `bulkedit.toml`) and the environment
    ///
    /// A missing file is not an error; the defaults apply.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        let builder = Config::builder()
            .add_source(File::from(path).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true));

        let config: EngineConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.rollback_ttl_hours <= 0 {
            return Err(BulkEditError::Config(
                "rollback_ttl_hours must be greater than 0".to_string(),
            ));
        }
        if self.max_parallelism == Some(0) {
            return Err(BulkEditError::Config(
                "max_parallelism must be greater than 0".to_string(),
            ));
        }
        if self.large_file_threshold_bytes == 0 {
            return Err(BulkEditError::Config(
                "large_file_threshold_bytes must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Sets the workspace root
    pub fn with_workspace_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.workspace_root = root.into();
        self
    }

    /// Absolute location of the rollback-session store
    pub fn resolved_backup_dir(&self) -> PathBuf {
        if self.backup_dir.is_absolute() {
            self.backup_dir.clone()
        } else {
            self.workspace_root.join(&self.backup_dir)
        }
    }

    /// Session lifetime
    pub fn rollback_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.rollback_ttl_hours)
    }

    /// Worker-pool size used when a request does not set one
    pub fn default_parallelism(&self) -> usize {
        self.max_parallelism.unwrap_or_else(host_parallelism).max(1)
    }
}

/// Number of CPUs available to this process
pub fn host_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.rollback_ttl_hours, 24);
        assert_eq!(config.large_file_threshold_bytes, 1_048_576);
        assert_eq!(config.log_level, "info");
        assert!(config.validate().is_ok());
        assert!(config.default_parallelism() >= 1);
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bulkedit.toml");
        std::fs::write(
            &path,
            "backup_dir = \"/var/backups/bulkedit\"\nrollback_ttl_hours = 48\nmax_parallelism = 2\n",
        )
        .unwrap();

        let config = EngineConfig::load(Some(&path)).unwrap();
        assert_eq!(config.rollback_ttl_hours, 48);
        assert_eq!(config.max_parallelism, Some(2));
        assert_eq!(config.default_parallelism(), 2);
        assert_eq!(
            config.resolved_backup_dir(),
            PathBuf::from("/var/backups/bulkedit")
        );
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = EngineConfig::load(Some(&temp_dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config.rollback_ttl_hours, 24);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = EngineConfig::default();
        config.rollback_ttl_hours = 0;
        assert!(matches!(config.validate(), Err(BulkEditError::Config(_))));

        let mut config = EngineConfig::default();
        config.max_parallelism = Some(0);
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.large_file_threshold_bytes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_relative_backup_dir_is_under_workspace_root() {
        let config = EngineConfig::default().with_workspace_root("/w");
        assert_eq!(config.resolved_backup_dir(), PathBuf::from("/w/.bulkedit/rollback"));
    }
}
