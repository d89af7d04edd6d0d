use crate::cluster::Cluster;
use crate::exec::CommandExecutor;
use crate::reconcile::{ClusterClient, ReconcileError};
use crate::status::RemoteLifecycleStatus;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PassOutcome {
    Created,
    Updated,
    Deleted,
    UpToDate,
    /// A create, update or delete is still running remotely.
    Waiting,
    DeletionPending,
    Gone,
}

impl PassOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
            Self::UpToDate => "up_to_date",
            Self::Waiting => "waiting",
            Self::DeletionPending => "deletion_pending",
            Self::Gone => "gone",
        }
    }
}

/// One level-triggered pass: observe, then create, update or delete as
/// needed. Errors end the pass; the caller retries on its own schedule.
pub fn reconcile_once<E: CommandExecutor>(
    client: &ClusterClient<E>,
    cluster: &mut Cluster,
    deletion_requested: bool,
) -> Result<PassOutcome, ReconcileError> {
    let observation = client.observe(cluster)?;
    let remote_status = cluster.status.remote_status();
    let in_progress =
        observation.resource_exists && remote_status.is_some_and(|status| status.is_in_progress());

    let outcome = if deletion_requested {
        if !observation.resource_exists {
            PassOutcome::Gone
        } else if remote_status == Some(RemoteLifecycleStatus::DeleteInProgress) {
            PassOutcome::DeletionPending
        } else {
            client.delete(cluster)?;
            PassOutcome::Deleted
        }
    } else if !observation.resource_exists {
        client.create(cluster)?;
        PassOutcome::Created
    } else if in_progress {
        PassOutcome::Waiting
    } else if !observation.resource_up_to_date {
        client.update(cluster)?;
        PassOutcome::Updated
    } else {
        PassOutcome::UpToDate
    };

    client.log().info(
        "reconcile.pass",
        &format!("cluster {} pass outcome={}", cluster.name(), outcome.as_str()),
    );
    Ok(outcome)
}
