use super::ConfigError;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_BINARY: &str = "pcluster";
pub const DEFAULT_TOOL_ROOT_ENV: &str = "PYTHON_VENV_PATH";
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 3600;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Settings {
    /// Executable name, looked up under `<tool root>/bin` or on the search path.
    #[serde(default = "default_binary")]
    pub binary: String,
    /// Environment variable naming an alternate tool installation root.
    #[serde(default = "default_tool_root_env")]
    pub tool_root_env: String,
    /// Explicit tool root; takes precedence over `tool_root_env`.
    #[serde(default)]
    pub tool_root: Option<PathBuf>,
    /// Parent directory for per-operation workspaces. Defaults to the system
    /// temp dir.
    #[serde(default)]
    pub workspace_root: Option<PathBuf>,
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            tool_root_env: default_tool_root_env(),
            tool_root: None,
            workspace_root: None,
            command_timeout_secs: default_command_timeout_secs(),
            log_file: None,
        }
    }
}

fn default_binary() -> String {
    DEFAULT_BINARY.to_string()
}

fn default_tool_root_env() -> String {
    DEFAULT_TOOL_ROOT_ENV.to_string()
}

fn default_command_timeout_secs() -> u64 {
    DEFAULT_COMMAND_TIMEOUT_SECS
}

impl Settings {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let binary = self.binary.trim();
        if binary.is_empty() {
            return Err(ConfigError::Settings("`binary` must be non-empty".to_string()));
        }
        if binary.contains('/') {
            return Err(ConfigError::Settings(
                "`binary` must be a bare executable name; use `tool_root` for a location"
                    .to_string(),
            ));
        }
        if self.tool_root_env.trim().is_empty() {
            return Err(ConfigError::Settings(
                "`tool_root_env` must be non-empty".to_string(),
            ));
        }
        if self.command_timeout_secs == 0 {
            return Err(ConfigError::Settings(
                "`command_timeout_secs` must be greater than 0".to_string(),
            ));
        }
        if let Some(root) = &self.workspace_root {
            if !root.is_absolute() {
                return Err(ConfigError::Settings(
                    "`workspace_root` must be an absolute path".to_string(),
                ));
            }
        }
        Ok(())
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    pub fn resolve_tool_root(&self) -> Option<PathBuf> {
        self.resolve_tool_root_with(|key| std::env::var_os(key))
    }

    /// `tool_root` if set, otherwise the value of `tool_root_env`. A variable
    /// that is present but empty still counts as set, so the tool lookup
    /// under it fails instead of quietly using the search path.
    pub fn resolve_tool_root_with<F>(&self, lookup: F) -> Option<PathBuf>
    where
        F: Fn(&str) -> Option<OsString>,
    {
        if let Some(root) = &self.tool_root {
            return Some(root.clone());
        }
        lookup(&self.tool_root_env).map(PathBuf::from)
    }
}
