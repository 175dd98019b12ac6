//! Completion marker handling
//!
//! The marker file is the idempotency barrier for a whole run: once it
//! exists, later invocations skip configuration unless forced. Its content
//! is a timestamp for humans and is never parsed.

use crate::RepoError;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Marker file at a fixed path
#[derive(Debug, Clone)]
pub struct MarkerFile {
    path: PathBuf,
}

impl MarkerFile {
    /// Create a marker handle for `path`
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Marker path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a previous run completed
    pub async fn exists(&self) -> bool {
        let exists = fs::try_exists(&self.path).await.unwrap_or(false);
        debug!(
            "Marker check: {} -> {}",
            self.path.display(),
            if exists { "skip" } else { "run" }
        );
        exists
    }

    /// Record a completed run
    pub async fn mark_done(&self) -> Result<(), RepoError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let content = format!("Configured on {}\n", timestamp());
        fs::write(&self.path, content.as_bytes()).await?;

        debug!("Created marker: {}", self.path.display());
        Ok(())
    }
}

fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}
