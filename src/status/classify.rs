use crate::status::StatusError;
use serde::Deserialize;

pub const NO_CHANGES_MESSAGE: &str =
    "Bad Request: No changes found in your cluster configuration.";
pub const DRY_RUN_MESSAGE: &str = "Request would have succeeded, but DryRun flag is set.";
pub const UPDATE_BLOCKED_PREFIX: &str = "Cannot execute update while stack is in";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClassification {
    NotFound,
    UpToDate,
    NotUpToDate,
    EmptyOrUnclassified,
}

impl std::fmt::Display for ErrorClassification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::NotFound => "not found",
            Self::UpToDate => "up to date",
            Self::NotUpToDate => "not up to date",
            Self::EmptyOrUnclassified => "unclassified",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    message: String,
}

/// Decodes a `{"message": ...}` error payload and classifies its message.
pub fn classify(output: &[u8], cluster_name: &str) -> Result<ErrorClassification, StatusError> {
    let payload: ErrorPayload =
        serde_json::from_slice(output).map_err(|source| StatusError::MalformedErrorPayload {
            output: String::from_utf8_lossy(output).into_owned(),
            source,
        })?;
    Ok(classify_message(&payload.message, cluster_name))
}

/// Message matching against the tool's wording. Checks run in priority
/// order and the first hit wins.
pub fn classify_message(message: &str, cluster_name: &str) -> ErrorClassification {
    if message.starts_with(&format!("Cluster '{cluster_name}' does not exist")) {
        return ErrorClassification::NotFound;
    }
    if message == NO_CHANGES_MESSAGE || message.starts_with(UPDATE_BLOCKED_PREFIX) {
        return ErrorClassification::UpToDate;
    }
    if message == DRY_RUN_MESSAGE {
        return ErrorClassification::NotUpToDate;
    }
    ErrorClassification::EmptyOrUnclassified
}
