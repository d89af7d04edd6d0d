use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub mod context;
pub mod runner;
pub mod scripted;
pub mod workspace;

pub use context::ExecutionContext;
pub use runner::ProcessExecutor;
pub use scripted::{RecordedInvocation, ScriptedExecutor, ScriptedResponse};
pub use workspace::{with_workspace, CLUSTER_CONFIG_FILE_NAME};

#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("tool executable not found at {path}: {source}")]
    ToolNotFound {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("workspace io error at {path}: {source}")]
    WorkspaceIo {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to start {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{command_form}` exited with code {exit_code}")]
    NonZeroExit { command_form: String, exit_code: i32 },
    #[error("`{command_form}` was cancelled")]
    Cancelled { command_form: String },
    #[error("`{command_form}` timed out after {timeout_ms}ms")]
    TimedOut {
        command_form: String,
        timeout_ms: u64,
    },
    #[error("io error while running `{command_form}`: {source}")]
    Io {
        command_form: String,
        #[source]
        source: std::io::Error,
    },
}

impl ExecError {
    /// True when the process ran to completion and reported failure through
    /// its exit status, which is the only case where the output carries a
    /// tool error payload.
    pub fn is_exit_failure(&self) -> bool {
        matches!(self, Self::NonZeroExit { .. })
    }
}

/// Cooperative cancellation shared between a caller and in-flight commands.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

#[derive(Debug)]
pub struct CommandOutput {
    pub combined: Vec<u8>,
    pub exit_error: Option<ExecError>,
}

impl CommandOutput {
    pub fn succeeded(combined: Vec<u8>) -> Self {
        Self {
            combined,
            exit_error: None,
        }
    }

    pub fn failed(combined: Vec<u8>, error: ExecError) -> Self {
        Self {
            combined,
            exit_error: Some(error),
        }
    }

    pub fn output_lossy(&self) -> String {
        String::from_utf8_lossy(&self.combined).into_owned()
    }
}

/// Runs one tool verb inside an execution context.
///
/// Implementations must return the combined output even when the process
/// exits non-zero; error payloads arrive that way.
pub trait CommandExecutor: Send + Sync {
    fn run(&self, context: &ExecutionContext, verb: &str, args: &[String]) -> CommandOutput;
}

impl<E: CommandExecutor + ?Sized> CommandExecutor for &E {
    fn run(&self, context: &ExecutionContext, verb: &str, args: &[String]) -> CommandOutput {
        (**self).run(context, verb, args)
    }
}
