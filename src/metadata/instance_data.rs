//! cloud-init instance data
//!
//! cloud-init caches what it learned about the instance in
//! `/run/cloud-init/instance-data.json`. The standardized `v1` keys are
//! preferred; the raw datasource metadata under `ds.metadata` covers
//! datasources that leave `v1` incomplete.

use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use super::{MetadataSource, UNKNOWN_PROVIDER};
use crate::{CloudMetadata, RepoError};

/// Region keys used by datasources, in lookup order
const DS_REGION_KEYS: [&str; 3] = ["region", "location", "availabilityDomain"];

/// Metadata source backed by the instance data JSON file
pub struct InstanceData {
    path: PathBuf,
}

impl InstanceData {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Build metadata from the parsed JSON document
    pub fn parse(data: &Value) -> CloudMetadata {
        let v1 = data.get("v1");
        let ds_metadata = data
            .get("ds")
            .and_then(|ds| ds.get("metadata"))
            .and_then(Value::as_object);

        let v1_str = |key: &str| v1.and_then(|v| v.get(key)).and_then(non_empty_str);
        let ds_str = |key: &str| ds_metadata.and_then(|m| m.get(key)).and_then(non_empty_str);

        let provider = v1_str("cloud_name")
            .or_else(|| ds_str("cloud_name"))
            .unwrap_or_else(|| UNKNOWN_PROVIDER.to_string());
        let region = v1_str("region").or_else(|| DS_REGION_KEYS.iter().find_map(|key| ds_str(key)));
        let instance_id = v1_str("instance_id").or_else(|| ds_str("instance_id"));

        CloudMetadata {
            provider,
            region,
            instance_id,
            additional_info: ds_metadata.cloned().unwrap_or_default(),
        }
    }
}

fn non_empty_str(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[async_trait]
impl MetadataSource for InstanceData {
    fn name(&self) -> &'static str {
        "InstanceData"
    }

    async fn is_available(&self) -> bool {
        fs::try_exists(&self.path).await.unwrap_or(false)
    }

    async fn get_metadata(&self) -> Result<CloudMetadata, RepoError> {
        debug!("Reading instance data from {}", self.path.display());

        let content = fs::read_to_string(&self.path).await.map_err(|e| {
            RepoError::Metadata(format!(
                "cloud-init metadata file not readable at {}: {}",
                self.path.display(),
                e
            ))
        })?;
        let data: Value = serde_json::from_str(&content)?;

        Ok(Self::parse(&data))
    }
}
