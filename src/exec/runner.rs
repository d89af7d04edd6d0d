use crate::exec::{CommandExecutor, CommandOutput, ExecError, ExecutionContext};
use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Runs the tool as a child process. stdout and stderr share one pipe so the
/// combined output keeps the order the tool wrote it in.
#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    poll_interval: Duration,
}

impl Default for ProcessExecutor {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl ProcessExecutor {
    pub fn with_poll_interval(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }

    fn run_process(
        &self,
        context: &ExecutionContext,
        verb: &str,
        args: &[String],
        command_form: &str,
    ) -> Result<CommandOutput, ExecError> {
        let io_err = |source| ExecError::Io {
            command_form: command_form.to_string(),
            source,
        };

        let (reader, writer) = std::io::pipe().map_err(io_err)?;
        let stderr_writer = writer.try_clone().map_err(io_err)?;

        let mut command = Command::new(&context.executable);
        command
            .arg(verb)
            .args(args)
            .env_clear()
            .envs(
                context
                    .environment
                    .iter()
                    .map(|(key, value)| (key.as_str(), value.as_str())),
            )
            .stdin(Stdio::null())
            .stdout(Stdio::from(writer))
            .stderr(Stdio::from(stderr_writer));
        if let Some(dir) = &context.working_dir {
            command.current_dir(dir);
        }
        // Own process group, so a kill reaches anything the tool forked.
        #[cfg(unix)]
        std::os::unix::process::CommandExt::process_group(&mut command, 0);

        let spawned = command.spawn();
        // The command still owns the parent's copies of the write ends; the
        // reader only sees EOF once they are gone.
        drop(command);
        let mut child = spawned.map_err(|source| ExecError::Spawn {
            binary: context.executable.display().to_string(),
            source,
        })?;

        let output_reader = thread::spawn(move || {
            let mut buf = Vec::new();
            let mut reader = reader;
            let _ = reader.read_to_end(&mut buf);
            buf
        });

        let start = Instant::now();
        let exit_status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    if context.cancel.is_cancelled() {
                        let combined = terminate(&mut child, output_reader);
                        return Ok(CommandOutput::failed(
                            combined,
                            ExecError::Cancelled {
                                command_form: command_form.to_string(),
                            },
                        ));
                    }
                    if let Some(timeout) = context.timeout {
                        if start.elapsed() > timeout {
                            let combined = terminate(&mut child, output_reader);
                            return Ok(CommandOutput::failed(
                                combined,
                                ExecError::TimedOut {
                                    command_form: command_form.to_string(),
                                    timeout_ms: u64::try_from(timeout.as_millis())
                                        .unwrap_or(u64::MAX),
                                },
                            ));
                        }
                    }
                    thread::sleep(self.poll_interval);
                }
                Err(err) => {
                    let _ = terminate(&mut child, output_reader);
                    return Err(io_err(err));
                }
            }
        };

        let combined = output_reader.join().unwrap_or_default();
        if exit_status.success() {
            return Ok(CommandOutput::succeeded(combined));
        }
        Ok(CommandOutput::failed(
            combined,
            ExecError::NonZeroExit {
                command_form: command_form.to_string(),
                exit_code: exit_status.code().unwrap_or(-1),
            },
        ))
    }
}

fn terminate(child: &mut Child, output_reader: JoinHandle<Vec<u8>>) -> Vec<u8> {
    kill_process_group(child);
    let _ = child.kill();
    let _ = child.wait();
    output_reader.join().unwrap_or_default()
}

/// Signals the group led by `child`. Descendants that still hold the output
/// pipe would otherwise keep the reader from reaching EOF.
#[cfg(unix)]
fn kill_process_group(child: &Child) {
    let Ok(pgid) = libc::pid_t::try_from(child.id()) else {
        return;
    };
    // SAFETY: kill(2) takes plain integers; the group was created at spawn
    // and its leader has not been reaped yet.
    unsafe {
        libc::kill(-pgid, libc::SIGKILL);
    }
}

#[cfg(not(unix))]
fn kill_process_group(_child: &Child) {}

impl CommandExecutor for ProcessExecutor {
    fn run(&self, context: &ExecutionContext, verb: &str, args: &[String]) -> CommandOutput {
        let command_form = context.command_form(verb, args);
        match self.run_process(context, verb, args, &command_form) {
            Ok(output) => output,
            Err(err) => CommandOutput::failed(Vec::new(), err),
        }
    }
}
