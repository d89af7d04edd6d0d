use crate::exec::{
    CommandExecutor, CommandOutput, ExecError, ExecutionContext, CLUSTER_CONFIG_FILE_NAME,
};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

/// Canned result for one scripted invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptedResponse {
    pub output: Vec<u8>,
    pub exit_code: Option<i32>,
}

impl ScriptedResponse {
    pub fn success(output: impl Into<Vec<u8>>) -> Self {
        Self {
            output: output.into(),
            exit_code: None,
        }
    }

    pub fn failure(output: impl Into<Vec<u8>>, exit_code: i32) -> Self {
        Self {
            output: output.into(),
            exit_code: Some(exit_code),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedInvocation {
    pub verb: String,
    pub args: Vec<String>,
    pub environment: Vec<(String, String)>,
    pub working_dir: Option<PathBuf>,
    /// Contents of the workspace configuration file at the time of the call.
    pub config_document: Option<String>,
}

/// Executor that replays queued responses in order and records every call.
/// Running out of responses is reported as a spawn failure.
#[derive(Debug, Default)]
pub struct ScriptedExecutor {
    responses: Mutex<VecDeque<ScriptedResponse>>,
    invocations: Mutex<Vec<RecordedInvocation>>,
}

impl ScriptedExecutor {
    pub fn new(responses: impl IntoIterator<Item = ScriptedResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            invocations: Mutex::new(Vec::new()),
        }
    }

    pub fn push(&self, response: ScriptedResponse) {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(response);
    }

    pub fn invocations(&self) -> Vec<RecordedInvocation> {
        self.invocations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn remaining(&self) -> usize {
        self.responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl CommandExecutor for ScriptedExecutor {
    fn run(&self, context: &ExecutionContext, verb: &str, args: &[String]) -> CommandOutput {
        let config_document = context
            .working_dir
            .as_ref()
            .and_then(|dir| std::fs::read_to_string(dir.join(CLUSTER_CONFIG_FILE_NAME)).ok());
        self.invocations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedInvocation {
                verb: verb.to_string(),
                args: args.to_vec(),
                environment: context.environment.clone(),
                working_dir: context.working_dir.clone(),
                config_document,
            });

        let next = self
            .responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        let Some(response) = next else {
            return CommandOutput::failed(
                Vec::new(),
                ExecError::Spawn {
                    binary: context.executable.display().to_string(),
                    source: std::io::Error::other("no scripted response left"),
                },
            );
        };

        match response.exit_code {
            None => CommandOutput::succeeded(response.output),
            Some(exit_code) => CommandOutput::failed(
                response.output,
                ExecError::NonZeroExit {
                    command_form: context.command_form(verb, args),
                    exit_code,
                },
            ),
        }
    }
}
