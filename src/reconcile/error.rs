use crate::exec::ExecError;
use crate::status::{ErrorClassification, Operation, StatusError};

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Exec(#[from] ExecError),
    #[error(transparent)]
    Status(#[from] StatusError),
    #[error("{operation} for cluster `{cluster}` failed ({classification}): {output}")]
    UnclassifiedRemoteFailure {
        operation: Operation,
        cluster: String,
        classification: ErrorClassification,
        output: String,
        #[source]
        source: ExecError,
    },
    #[error("{operation} for cluster `{cluster}` failed: {output}")]
    CommandFailed {
        operation: Operation,
        cluster: String,
        output: String,
        #[source]
        source: ExecError,
    },
    #[error("dry-run update for cluster `{cluster}` exited with status 0; output: {output}")]
    DryRunSucceeded { cluster: String, output: String },
    #[error("failed to construct executor: {0}")]
    Connect(String),
}
