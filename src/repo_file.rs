//! Standalone `.repo` file rendering
//!
//! For hosts that do not use dnf variables, the selected mirror can be
//! written straight into a yum repository definition.

use crate::{CloudMetadata, RepoError};
use std::path::Path;
use tokio::fs;
use tracing::info;

/// Repository section name
pub const REPO_SECTION: &str = "base";

/// Render a repository definition pointing at `mirror_url`
pub fn render_repo_file(metadata: &CloudMetadata, mirror_url: &str) -> String {
    let region = metadata.region().unwrap_or_default();
    let lines = [
        format!("[{}]", REPO_SECTION),
        format!("name={} Mirror", metadata.provider.to_uppercase()),
        format!(
            "baseurl={}/{}/rocky-lts-$releasever.$basearch",
            mirror_url.trim_end_matches('/'),
            region
        ),
        "enabled=1".to_string(),
    ];
    lines.join("\n") + "\n"
}

/// Write a rendered repository definition to disk
pub async fn write_repo_file(path: &Path, content: &str) -> Result<(), RepoError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, content).await?;
    info!("Wrote repo to {}", path.display());
    Ok(())
}
