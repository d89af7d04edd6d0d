pub mod classify;
pub mod lifecycle;
pub mod payload;

pub use classify::{classify, classify_message, ErrorClassification};
pub use lifecycle::{Availability, LifecycleOutcome, RemoteLifecycleStatus};
pub use payload::{
    decode_success, ClusterEnvelope, ClusterSummary, DescribeClusterOutput, Operation,
    UpdateClusterOutput,
};

#[derive(Debug, thiserror::Error)]
pub enum StatusError {
    #[error("malformed {operation} payload: {source}; output: {output}")]
    MalformedSuccessPayload {
        operation: Operation,
        output: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("malformed error payload: {source}; output: {output}")]
    MalformedErrorPayload {
        output: String,
        #[source]
        source: serde_json::Error,
    },
}
