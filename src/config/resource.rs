use super::ConfigError;
use crate::cluster::{Cluster, ClusterSpec, ClusterStatus};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::Path;

const MAX_CLUSTER_NAME_LEN: usize = 60;

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct ResourceMetadata {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForProvider {
    pub region: String,
    pub cluster_configuration: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSpec {
    pub for_provider: ForProvider,
}

/// On-disk cluster resource: metadata, desired parameters and the last
/// recorded status.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub metadata: ResourceMetadata,
    pub spec: ResourceSpec,
    #[serde(default)]
    pub status: ClusterStatus,
}

impl ClusterDocument {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn to_cluster(&self) -> Result<Cluster, ConfigError> {
        validate_cluster_name(&self.metadata.name).map_err(ConfigError::Resource)?;
        if self.spec.for_provider.region.trim().is_empty() {
            return Err(ConfigError::Resource(
                "`spec.forProvider.region` must be non-empty".to_string(),
            ));
        }
        Ok(Cluster {
            spec: ClusterSpec {
                name: self.metadata.name.clone(),
                region: self.spec.for_provider.region.clone(),
                cluster_configuration: self.spec.for_provider.cluster_configuration.clone(),
            },
            status: self.status.clone(),
        })
    }

    pub fn set_status(&mut self, status: ClusterStatus) {
        self.status = status;
    }

    /// Replaces the file at `path` through a sibling temp file so readers
    /// never see a partial document.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let body = serde_yaml::to_string(self).map_err(|source| ConfigError::Encode {
            path: path.display().to_string(),
            source,
        })?;
        let write_err = |source| ConfigError::Write {
            path: path.display().to_string(),
            source,
        };
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut staged = tempfile::NamedTempFile::new_in(parent).map_err(write_err)?;
        staged.write_all(body.as_bytes()).map_err(write_err)?;
        staged.as_file().sync_all().map_err(write_err)?;
        staged.persist(path).map_err(|err| write_err(err.error))?;
        Ok(())
    }
}

/// Cluster names start with a letter, use letters, digits and '-', and are
/// at most 60 characters.
pub fn validate_cluster_name(name: &str) -> Result<(), String> {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return Err("cluster name must be non-empty".to_string());
    };
    if !first.is_ascii_alphabetic() {
        return Err(format!("cluster name `{name}` must start with a letter"));
    }
    if name.len() > MAX_CLUSTER_NAME_LEN {
        return Err(format!(
            "cluster name `{name}` exceeds {MAX_CLUSTER_NAME_LEN} characters"
        ));
    }
    if !chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '-') {
        return Err(format!(
            "cluster name `{name}` must use only ASCII letters, digits or '-'"
        ));
    }
    Ok(())
}
