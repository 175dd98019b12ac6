//! Error types for rlc-cloud-repos

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for rlc-cloud-repos operations
#[derive(Error, Debug)]
pub enum RepoError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Mirror config YAML not found at {}", .0.display())]
    MirrorMapNotFound(PathBuf),

    #[error("Invalid mirror map: {0}")]
    InvalidMirrorMap(String),

    #[error("No mirror found for provider={provider}, region={region}")]
    MirrorNotFound { provider: String, region: String },

    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("No metadata source available")]
    NoMetadataSource,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Command execution failed: {0}")]
    Command(String),
}

impl RepoError {
    /// Create a mirror-not-found error for a provider/region pair
    pub fn mirror_not_found(provider: impl Into<String>, region: Option<&str>) -> Self {
        Self::MirrorNotFound {
            provider: provider.into(),
            region: region.unwrap_or("<none>").to_string(),
        }
    }

    /// Whether this error means the mirror configuration itself is missing or broken
    pub fn is_configuration_missing(&self) -> bool {
        matches!(
            self,
            Self::MirrorMapNotFound(_)
                | Self::InvalidMirrorMap(_)
                | Self::MirrorNotFound { .. }
                | Self::Yaml(_)
        )
    }
}
