use crate::status::{Availability, ClusterSummary, DescribeClusterOutput, RemoteLifecycleStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Desired state. `name` is the cluster identity passed to every tool call.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    pub name: String,
    pub region: String,
    pub cluster_configuration: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterObservation {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cluster_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub stack_arn: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_status: Option<RemoteLifecycleStatus>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub scheduler_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub up_to_date: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability: Option<Availability>,
    #[serde(default)]
    pub at_provider: ClusterObservation,
}

impl ClusterStatus {
    pub fn remote_status(&self) -> Option<RemoteLifecycleStatus> {
        self.at_provider.remote_status
    }

    /// Records the cluster fields of a create, update or delete response.
    pub fn apply_summary(&mut self, summary: &ClusterSummary) {
        let observed = &mut self.at_provider;
        observed.cluster_name = summary.cluster_name.clone();
        observed.stack_arn = summary.cloudformation_stack_arn.clone();
        observed.remote_status = Some(summary.cluster_status);
        observed.scheduler_type = summary.scheduler.scheduler_type.clone();
    }

    /// Records a describe response together with the derived availability
    /// and drift result.
    pub fn apply_describe(
        &mut self,
        describe: &DescribeClusterOutput,
        availability: Option<Availability>,
        up_to_date: bool,
    ) {
        self.apply_summary(&describe.cluster);
        self.at_provider.last_updated_time = describe.last_updated_time;
        self.at_provider.up_to_date = up_to_date;
        if availability.is_some() {
            self.availability = availability;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cluster {
    pub spec: ClusterSpec,
    pub status: ClusterStatus,
}

impl Cluster {
    pub fn new(spec: ClusterSpec) -> Self {
        Self {
            spec,
            status: ClusterStatus::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }
}
