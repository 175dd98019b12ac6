//! rlc-cloud-repos library
//!
//! Points dnf at the package mirror closest to the instance it runs on.
//!
//! # Flow
//!
//! 1. A [`metadata::MetadataSource`] reports the cloud provider and region
//! 2. [`mirrors::select_mirror`] walks the mirror map fallback chain
//!    (exact region, provider default, global default)
//! 3. [`dnf_vars::write_variables`] reconciles `/etc/dnf/vars`, keeping a
//!    `.bak` of every value it replaces
//! 4. A marker file keeps later boots from repeating the work

pub mod config;
pub mod configure;
pub mod dnf_vars;
pub mod marker;
pub mod metadata;
pub mod mirrors;
pub mod paths;
pub mod repo_file;

mod error;

pub use config::Settings;
pub use configure::{RunOutcome, configure_repos, run};
pub use error::RepoError;

use serde::{Deserialize, Serialize};

/// Cloud metadata reported by a metadata source
///
/// The provider keeps the case it was reported with; lookups use
/// [`CloudMetadata::provider_key`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudMetadata {
    pub provider: String,
    pub region: Option<String>,
    pub instance_id: Option<String>,
    #[serde(default)]
    pub additional_info: serde_json::Map<String, serde_json::Value>,
}

impl CloudMetadata {
    /// Create metadata for a provider and region
    pub fn new(provider: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            region: Some(region.into()),
            ..Default::default()
        }
    }

    /// Set the instance ID
    pub fn with_instance_id(mut self, instance_id: impl Into<String>) -> Self {
        self.instance_id = Some(instance_id.into());
        self
    }

    /// Provider normalized for mirror map lookups
    pub fn provider_key(&self) -> String {
        self.provider.to_lowercase()
    }

    /// Region, if the metadata source reported one
    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }
}

impl std::fmt::Display for CloudMetadata {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "provider={}, region={}",
            self.provider,
            self.region.as_deref().unwrap_or("<none>")
        )
    }
}
