//! Mock metadata source for testing
//!
//! # Example
//! ```
//! use rlc_cloud_repos::CloudMetadata;
//! use rlc_cloud_repos::metadata::mock::MockMetadata;
//!
//! let mock = MockMetadata::new().with_metadata(CloudMetadata::new("azure", "eastus"));
//! ```

use async_trait::async_trait;

use super::MetadataSource;
use crate::{CloudMetadata, RepoError};

/// Configurable metadata source
pub struct MockMetadata {
    name: &'static str,
    available: bool,
    metadata: Option<CloudMetadata>,
    error: Option<String>,
}

impl MockMetadata {
    /// Create a mock that is available and reports `mock`/`mock-region`
    pub fn new() -> Self {
        Self {
            name: "Mock",
            available: true,
            metadata: None,
            error: None,
        }
    }

    /// Set the source name
    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Set whether the source is available
    pub fn with_available(mut self, available: bool) -> Self {
        self.available = available;
        self
    }

    /// Set the metadata to return
    pub fn with_metadata(mut self, metadata: CloudMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Configure to return an error
    pub fn with_error(mut self, error: &str) -> Self {
        self.error = Some(error.to_string());
        self
    }
}

impl Default for MockMetadata {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetadataSource for MockMetadata {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn is_available(&self) -> bool {
        self.available
    }

    async fn get_metadata(&self) -> Result<CloudMetadata, RepoError> {
        if let Some(error) = &self.error {
            return Err(RepoError::Metadata(error.clone()));
        }

        Ok(self
            .metadata
            .clone()
            .unwrap_or_else(|| CloudMetadata::new("mock", "mock-region")))
    }
}
