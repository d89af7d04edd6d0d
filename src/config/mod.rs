pub mod error;
pub mod resource;
pub mod settings;

pub use error::ConfigError;
pub use resource::{
    validate_cluster_name, ClusterDocument, ForProvider, ResourceMetadata, ResourceSpec,
};
pub use settings::{Settings, DEFAULT_BINARY, DEFAULT_COMMAND_TIMEOUT_SECS, DEFAULT_TOOL_ROOT_ENV};
