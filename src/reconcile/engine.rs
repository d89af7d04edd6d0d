use crate::cluster::{Cluster, ClusterSpec};
use crate::config::Settings;
use crate::exec::{
    with_workspace, CancellationToken, CommandExecutor, CommandOutput, ExecutionContext, ProcessExecutor,
    CLUSTER_CONFIG_FILE_NAME,
};
use crate::logging::ReconcileLog;
use crate::reconcile::ReconcileError;
use crate::status::{
    classify, decode_success, ClusterEnvelope, DescribeClusterOutput, ErrorClassification,
    Operation, UpdateClusterOutput,
};
use std::path::{Path, PathBuf};

/// Result of observing the remote cluster. `resource_up_to_date` is only
/// ever true when `resource_exists` is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExternalObservation {
    pub resource_exists: bool,
    pub resource_up_to_date: bool,
}

/// Drives the provisioning tool for one reconciliation connection.
#[derive(Debug)]
pub struct ClusterClient<E> {
    context: ExecutionContext,
    executor: E,
    workspace_root: Option<PathBuf>,
    log: ReconcileLog,
}

/// Production executor factory. The credential blob is accepted for the
/// connection contract; the tool reads its own credential chain.
pub fn new_process_executor(_credentials: &[u8]) -> Result<ProcessExecutor, ReconcileError> {
    Ok(ProcessExecutor::default())
}

/// Builds a client from settings: resolves the tool location, snapshots the
/// ambient environment into the execution context and constructs the
/// executor from the credential blob.
pub fn connect<E, F>(
    settings: &Settings,
    credentials: &[u8],
    new_executor: F,
    log: ReconcileLog,
) -> Result<ClusterClient<E>, ReconcileError>
where
    E: CommandExecutor,
    F: FnOnce(&[u8]) -> Result<E, ReconcileError>,
{
    let executor = new_executor(credentials)?;
    let tool_root = settings.resolve_tool_root();
    let context =
        ExecutionContext::build(&settings.binary, tool_root.as_deref(), std::env::vars())?
            .with_timeout(Some(settings.command_timeout()));
    Ok(ClusterClient::new(context, executor)
        .with_workspace_root(settings.workspace_root.clone())
        .with_log(log))
}

impl<E: CommandExecutor> ClusterClient<E> {
    pub fn new(context: ExecutionContext, executor: E) -> Self {
        Self {
            context,
            executor,
            workspace_root: None,
            log: ReconcileLog::disabled(),
        }
    }

    pub fn with_workspace_root(mut self, root: Option<PathBuf>) -> Self {
        self.workspace_root = root;
        self
    }

    /// Binds every command this client runs to `cancel`.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.context.cancel = cancel;
        self
    }

    pub fn with_log(mut self, log: ReconcileLog) -> Self {
        self.log = log;
        self
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn workspace_root(&self) -> Option<&Path> {
        self.workspace_root.as_deref()
    }

    pub fn log(&self) -> &ReconcileLog {
        &self.log
    }

    fn exec(
        &self,
        context: &ExecutionContext,
        operation: Operation,
        args: &[String],
    ) -> CommandOutput {
        self.log.debug(
            "pcluster.exec",
            &format!("executing: {}", context.command_form(operation.verb(), args)),
        );
        self.executor.run(context, operation.verb(), args)
    }

    fn exec_in_workspace(
        &self,
        spec: &ClusterSpec,
        operation: Operation,
        args: &[String],
    ) -> Result<CommandOutput, ReconcileError> {
        let output = with_workspace(
            &self.context,
            self.workspace_root.as_deref(),
            &spec.name,
            &spec.cluster_configuration,
            |context| self.exec(context, operation, args),
        )?;
        Ok(output)
    }

    /// Describes the cluster, maps its lifecycle status and, when it exists,
    /// runs the drift probe. Status fields are written back only after every
    /// step succeeded.
    pub fn observe(&self, cluster: &mut Cluster) -> Result<ExternalObservation, ReconcileError> {
        let name = cluster.name().to_string();
        let CommandOutput {
            combined,
            exit_error,
        } = self.exec(&self.context, Operation::Describe, &describe_args(&cluster.spec));

        if let Some(err) = exit_error {
            if !err.is_exit_failure() {
                return Err(err.into());
            }
            return match classify(&combined, &name)? {
                ErrorClassification::NotFound => {
                    cluster.status.at_provider.up_to_date = false;
                    self.log
                        .info("cluster.observe", &format!("cluster {name} does not exist"));
                    Ok(ExternalObservation::default())
                }
                classification => Err(ReconcileError::UnclassifiedRemoteFailure {
                    operation: Operation::Describe,
                    cluster: name,
                    classification,
                    output: String::from_utf8_lossy(&combined).into_owned(),
                    source: err,
                }),
            };
        }

        let describe: DescribeClusterOutput = decode_success(Operation::Describe, &combined)?;
        let remote_status = describe.cluster.cluster_status;
        let outcome = remote_status.lifecycle_outcome();
        let up_to_date = if outcome.exists {
            self.is_up_to_date(&cluster.spec)?
        } else {
            false
        };

        cluster
            .status
            .apply_describe(&describe, outcome.availability, up_to_date);
        self.log.info(
            "cluster.observe",
            &format!(
                "cluster {name} status={remote_status} exists={} up_to_date={up_to_date}",
                outcome.exists
            ),
        );
        Ok(ExternalObservation {
            resource_exists: outcome.exists,
            resource_up_to_date: up_to_date,
        })
    }

    /// Dry-run update against the desired configuration. The tool never exits
    /// zero on a dry run; the verdict is carried by the error message.
    pub fn is_up_to_date(&self, spec: &ClusterSpec) -> Result<bool, ReconcileError> {
        let CommandOutput {
            combined,
            exit_error,
        } = self.exec_in_workspace(spec, Operation::Update, &dry_run_args(spec))?;

        let Some(err) = exit_error else {
            self.log.warn(
                "cluster.dryrun",
                &format!("dry-run for cluster {} ended with exit code 0", spec.name),
            );
            return Err(ReconcileError::DryRunSucceeded {
                cluster: spec.name.clone(),
                output: String::from_utf8_lossy(&combined).into_owned(),
            });
        };
        if !err.is_exit_failure() {
            return Err(err.into());
        }

        match classify(&combined, &spec.name)? {
            ErrorClassification::UpToDate => Ok(true),
            ErrorClassification::NotUpToDate => Ok(false),
            classification => Err(ReconcileError::UnclassifiedRemoteFailure {
                operation: Operation::Update,
                cluster: spec.name.clone(),
                classification,
                output: String::from_utf8_lossy(&combined).into_owned(),
                source: err,
            }),
        }
    }

    pub fn create(&self, cluster: &mut Cluster) -> Result<(), ReconcileError> {
        let combined =
            self.run_mutation(&cluster.spec, Operation::Create, &create_args(&cluster.spec))?;
        let created: ClusterEnvelope = decode_success(Operation::Create, &combined)?;
        cluster.status.apply_summary(&created.cluster);
        self.log.info(
            "cluster.create",
            &format!(
                "cluster {} create requested, status={}",
                cluster.spec.name, created.cluster.cluster_status
            ),
        );
        Ok(())
    }

    pub fn update(&self, cluster: &mut Cluster) -> Result<(), ReconcileError> {
        let combined =
            self.run_mutation(&cluster.spec, Operation::Update, &update_args(&cluster.spec))?;
        let updated: UpdateClusterOutput = decode_success(Operation::Update, &combined)?;
        cluster.status.apply_summary(&updated.cluster);
        self.log.info(
            "cluster.update",
            &format!(
                "cluster {} updated to reflect {} changes, status={}",
                cluster.spec.name,
                updated.change_set.len(),
                updated.cluster.cluster_status
            ),
        );
        Ok(())
    }

    pub fn delete(&self, cluster: &mut Cluster) -> Result<(), ReconcileError> {
        let combined =
            self.run_mutation(&cluster.spec, Operation::Delete, &delete_args(&cluster.spec))?;
        let deleted: ClusterEnvelope = decode_success(Operation::Delete, &combined)?;
        cluster.status.apply_summary(&deleted.cluster);
        self.log.info(
            "cluster.delete",
            &format!(
                "cluster {} delete requested, status={}",
                cluster.spec.name, deleted.cluster.cluster_status
            ),
        );
        Ok(())
    }

    /// Runs a mutating verb in a workspace. Failures are surfaced as-is with
    /// the raw tool output; no classification is attempted.
    fn run_mutation(
        &self,
        spec: &ClusterSpec,
        operation: Operation,
        args: &[String],
    ) -> Result<Vec<u8>, ReconcileError> {
        let CommandOutput {
            combined,
            exit_error,
        } = self.exec_in_workspace(spec, operation, args)?;
        match exit_error {
            None => Ok(combined),
            Some(err) if err.is_exit_failure() => Err(ReconcileError::CommandFailed {
                operation,
                cluster: spec.name.clone(),
                output: String::from_utf8_lossy(&combined).into_owned(),
                source: err,
            }),
            Some(err) => Err(err.into()),
        }
    }
}

fn to_args(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|arg| (*arg).to_string()).collect()
}

pub fn describe_args(spec: &ClusterSpec) -> Vec<String> {
    to_args(&["--cluster-name", &spec.name])
}

pub fn create_args(spec: &ClusterSpec) -> Vec<String> {
    to_args(&[
        "--cluster-configuration",
        CLUSTER_CONFIG_FILE_NAME,
        "--cluster-name",
        &spec.name,
        "--region",
        &spec.region,
    ])
}

pub fn update_args(spec: &ClusterSpec) -> Vec<String> {
    create_args(spec)
}

pub fn dry_run_args(spec: &ClusterSpec) -> Vec<String> {
    let mut args = update_args(spec);
    args.extend(to_args(&["--dryrun", "true"]));
    args
}

pub fn delete_args(spec: &ClusterSpec) -> Vec<String> {
    to_args(&["--cluster-name", &spec.name, "--region", &spec.region])
}
