use crate::exec::{CancellationToken, ExecError};
use std::path::{Path, PathBuf};
use std::time::Duration;

const PATH_VAR: &str = "PATH";

/// Everything a single tool invocation needs. The environment is carried as
/// data and handed to the child process; the parent process environment is
/// never modified.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub executable: PathBuf,
    pub environment: Vec<(String, String)>,
    pub working_dir: Option<PathBuf>,
    pub cancel: CancellationToken,
    pub timeout: Option<Duration>,
}

impl ExecutionContext {
    /// Builds a context from an ambient environment snapshot.
    ///
    /// With a `tool_root`, `<tool_root>/bin/<binary>` must exist and
    /// `<tool_root>/bin` is put in front of the search path. Without one the
    /// binary is resolved through the ambient search path.
    pub fn build<I>(binary: &str, tool_root: Option<&Path>, ambient: I) -> Result<Self, ExecError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut environment: Vec<(String, String)> = ambient.into_iter().collect();

        let executable = match tool_root {
            Some(root) => {
                let bin_dir = root.join("bin");
                let executable = bin_dir.join(binary);
                std::fs::metadata(&executable).map_err(|source| ExecError::ToolNotFound {
                    path: executable.display().to_string(),
                    source,
                })?;

                let ambient_path = environment
                    .iter()
                    .rev()
                    .find(|(key, _)| key == PATH_VAR)
                    .map(|(_, value)| value.clone());
                environment.retain(|(key, _)| key != PATH_VAR);
                let search_path = match ambient_path {
                    Some(rest) if !rest.is_empty() => format!("{}:{rest}", bin_dir.display()),
                    _ => bin_dir.display().to_string(),
                };
                environment.push((PATH_VAR.to_string(), search_path));
                executable
            }
            None => PathBuf::from(binary),
        };

        Ok(Self {
            executable,
            environment,
            working_dir: None,
            cancel: CancellationToken::default(),
            timeout: None,
        })
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Copy of this context bound to `dir`.
    pub fn in_dir(&self, dir: &Path) -> Self {
        let mut scoped = self.clone();
        scoped.working_dir = Some(dir.to_path_buf());
        scoped
    }

    pub fn env_value(&self, key: &str) -> Option<&str> {
        self.environment
            .iter()
            .rev()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    pub fn command_form(&self, verb: &str, args: &[String]) -> String {
        let mut form = format!("{} {verb}", self.executable.display());
        for arg in args {
            form.push(' ');
            form.push_str(arg);
        }
        form
    }
}
