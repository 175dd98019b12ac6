//! Cloud metadata sources
//!
//! Metadata sources report which cloud the instance runs in and where.
//! cloud-init has already talked to the provider by the time this tool
//! runs, so every source here reads cloud-init's results rather than a
//! metadata service.

pub mod instance_data;
pub mod mock;
pub mod query;

use crate::{CloudMetadata, RepoError};
use async_trait::async_trait;
use std::path::Path;

/// Provider name used when a source cannot tell
pub const UNKNOWN_PROVIDER: &str = "unknown";

/// Trait for cloud metadata sources
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Name of this source (e.g., "InstanceData", "CloudInitQuery")
    fn name(&self) -> &'static str;

    /// Check if this source can be used on this host
    async fn is_available(&self) -> bool;

    /// Fetch provider, region and instance details
    async fn get_metadata(&self) -> Result<CloudMetadata, RepoError>;
}

/// Detect and return the first available metadata source
///
/// Tries the cached instance data file first, then `cloud-init query`.
pub async fn detect_metadata_source(
    instance_data: &Path,
) -> Result<Box<dyn MetadataSource>, RepoError> {
    let sources: Vec<Box<dyn MetadataSource>> = vec![
        Box::new(instance_data::InstanceData::new(instance_data)),
        Box::new(query::CloudInitQuery::new()),
    ];

    for source in sources {
        if source.is_available().await {
            tracing::info!("Detected metadata source: {}", source.name());
            return Ok(source);
        }
    }

    Err(RepoError::NoMetadataSource)
}
