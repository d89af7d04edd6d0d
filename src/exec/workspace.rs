use crate::exec::{ExecError, ExecutionContext};
use std::fs;
use std::path::Path;

pub const CLUSTER_CONFIG_FILE_NAME: &str = "cluster-config.yaml";

/// Runs `operation` inside a fresh directory holding the configuration
/// document.
///
/// The directory is named after the resource with a random suffix, so
/// concurrent reconciliations never share one. It is removed when this
/// function returns or unwinds. If the directory or file cannot be written
/// the operation is not invoked.
pub fn with_workspace<T, F>(
    context: &ExecutionContext,
    root: Option<&Path>,
    resource_name: &str,
    configuration: &str,
    operation: F,
) -> Result<T, ExecError>
where
    F: FnOnce(&ExecutionContext) -> T,
{
    let parent = root.map_or_else(std::env::temp_dir, Path::to_path_buf);
    let workspace = tempfile::Builder::new()
        .prefix(&format!("{resource_name}-"))
        .tempdir_in(&parent)
        .map_err(|source| ExecError::WorkspaceIo {
            path: parent.display().to_string(),
            source,
        })?;

    let config_path = workspace.path().join(CLUSTER_CONFIG_FILE_NAME);
    fs::write(&config_path, configuration.as_bytes()).map_err(|source| {
        ExecError::WorkspaceIo {
            path: config_path.display().to_string(),
            source,
        }
    })?;

    Ok(operation(&context.in_dir(workspace.path())))
}
