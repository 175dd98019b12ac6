//! `cloud-init query` metadata source
//!
//! Asks the cloud-init CLI for `cloud_name` and `region`. Each query is a
//! separate process; a failing command fails the whole lookup.

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, error};

use super::MetadataSource;
use crate::{CloudMetadata, RepoError};

/// Metadata source that shells out to `cloud-init query`
pub struct CloudInitQuery {
    program: String,
}

impl CloudInitQuery {
    pub fn new() -> Self {
        Self::with_program("cloud-init")
    }

    /// Use a different executable in place of `cloud-init`
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn query(&self, key: &str) -> Result<String, RepoError> {
        debug!("Running {} query {}", self.program, key);

        let output = Command::new(&self.program)
            .args(["query", key])
            .output()
            .await
            .map_err(|e| {
                error!("Failed to query cloud-init: {}", e);
                RepoError::Command(format!("{} query {}: {}", self.program, key, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!("Failed to query cloud-init: {}", stderr.trim());
            return Err(RepoError::Metadata(format!(
                "cloud-init must be available and functional ({} query {} exited with {})",
                self.program, key, output.status
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl Default for CloudInitQuery {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetadataSource for CloudInitQuery {
    fn name(&self) -> &'static str {
        "CloudInitQuery"
    }

    async fn is_available(&self) -> bool {
        Command::new(&self.program)
            .arg("--version")
            .output()
            .await
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    async fn get_metadata(&self) -> Result<CloudMetadata, RepoError> {
        let provider = self.query("cloud_name").await?;
        let region = self.query("region").await?;

        Ok(CloudMetadata {
            provider,
            region: Some(region).filter(|r| !r.is_empty()),
            ..Default::default()
        })
    }
}
