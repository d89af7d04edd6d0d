use crate::status::{RemoteLifecycleStatus, StatusError};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

/// The four tool verbs the engine drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Describe,
    Create,
    Update,
    Delete,
}

impl Operation {
    pub fn verb(self) -> &'static str {
        match self {
            Self::Describe => "describe-cluster",
            Self::Create => "create-cluster",
            Self::Update => "update-cluster",
            Self::Delete => "delete-cluster",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.verb())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct Scheduler {
    #[serde(rename = "type", default)]
    pub scheduler_type: String,
}

/// Cluster fields shared by every success payload.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSummary {
    pub cluster_name: String,
    #[serde(default)]
    pub cloudformation_stack_arn: String,
    #[serde(
        rename = "cloudFormationStackStatus",
        alias = "cloudformationStackStatus",
        default
    )]
    pub cloudformation_stack_status: Option<String>,
    pub cluster_status: RemoteLifecycleStatus,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub scheduler: Scheduler,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadNode {
    #[serde(default)]
    pub instance_id: Option<String>,
    #[serde(default)]
    pub instance_type: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub public_ip_address: Option<String>,
    #[serde(default)]
    pub private_ip_address: Option<String>,
    #[serde(default)]
    pub launch_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

/// `describe-cluster` output: the cluster fields sit at the top level next to
/// the describe-only ones, so one decode fills both.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescribeClusterOutput {
    #[serde(flatten)]
    pub cluster: ClusterSummary,
    #[serde(default)]
    pub creation_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_updated_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub compute_fleet_status: Option<String>,
    #[serde(default)]
    pub head_node: Option<HeadNode>,
    #[serde(default)]
    pub tags: Vec<Tag>,
}

/// `create-cluster` and `delete-cluster` output.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClusterEnvelope {
    pub cluster: ClusterSummary,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeSetEntry {
    #[serde(default)]
    pub parameter: Option<String>,
    #[serde(default)]
    pub current_value: Option<Value>,
    #[serde(default)]
    pub requested_value: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateClusterOutput {
    pub cluster: ClusterSummary,
    #[serde(default)]
    pub change_set: Vec<ChangeSetEntry>,
}

pub fn decode_success<T: DeserializeOwned>(
    operation: Operation,
    output: &[u8],
) -> Result<T, StatusError> {
    serde_json::from_slice(output).map_err(|source| StatusError::MalformedSuccessPayload {
        operation,
        output: String::from_utf8_lossy(output).into_owned(),
        source,
    })
}
