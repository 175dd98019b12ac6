//! Configuration pass
//!
//! One pass, in order:
//! 1. marker check (skipped with `force`)
//! 2. metadata lookup
//! 3. mirror map load and mirror selection
//! 4. dnf variable reconciliation
//! 5. marker write
//!
//! A pass that fails part way leaves no marker, so the next run redoes
//! every step. Every step is idempotent.

use crate::dnf_vars::{self, VarOutcome, VariableSet};
use crate::marker::MarkerFile;
use crate::metadata::MetadataSource;
use crate::mirrors::{self, MirrorSelection};
use crate::{CloudMetadata, RepoError, Settings};
use tracing::{info, warn};

/// dnf variable holding the primary mirror
pub const PRIMARY_VAR: &str = "baseurl1";

/// dnf variable holding the backup mirror
pub const BACKUP_VAR: &str = "baseurl2";

/// dnf variable holding the cloud region
pub const REGION_VAR: &str = "region";

/// What a configuration pass did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigureReport {
    pub metadata: CloudMetadata,
    pub selection: MirrorSelection,
    pub outcomes: Vec<(String, VarOutcome)>,
}

impl ConfigureReport {
    /// Variables that could not be written
    pub fn failures(&self) -> impl Iterator<Item = &(String, VarOutcome)> {
        self.outcomes.iter().filter(|(_, outcome)| !outcome.is_success())
    }
}

/// Result of [`run`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Marker present, nothing done
    AlreadyConfigured,
    /// Pass completed and marker written
    Configured(ConfigureReport),
}

/// Variables written for a selection
pub fn build_variables(
    metadata: &CloudMetadata,
    selection: &MirrorSelection,
    extra: &VariableSet,
) -> VariableSet {
    let mut vars = VariableSet::new()
        .with(PRIMARY_VAR, selection.primary.as_str())
        .with(BACKUP_VAR, selection.backup.as_str());
    if let Some(region) = metadata.region() {
        vars.insert(REGION_VAR, region);
    }
    for (name, value) in extra.iter() {
        vars.insert(name, value);
    }
    vars
}

/// Detect, select and write, without consulting or writing the marker
pub async fn configure_repos(
    settings: &Settings,
    source: &dyn MetadataSource,
) -> Result<ConfigureReport, RepoError> {
    let metadata = source.get_metadata().await?;
    info!("Using cloud metadata: {}", metadata);

    let mirror_map = mirrors::load_mirror_map(&settings.paths.mirror_file).await?;
    info!("Loaded mirror map from {}", settings.paths.mirror_file.display());

    let selection = mirrors::select_mirror(&metadata, &mirror_map)?;
    let selection = settings.backup.apply(selection, metadata.region());
    info!(
        "Selected mirror URL: {} (backup: {}, tier: {})",
        selection.primary, selection.backup, selection.tier
    );

    let vars = build_variables(&metadata, &selection, &settings.extra_vars);
    let outcomes = dnf_vars::write_variables(&settings.paths.vars_dir, &vars).await;

    let report = ConfigureReport {
        metadata,
        selection,
        outcomes,
    };
    for (name, outcome) in report.failures() {
        warn!("DNF var '{}' not updated: {}", name, outcome);
    }
    Ok(report)
}

/// Run a full pass guarded by the marker file
pub async fn run(settings: &Settings, source: &dyn MetadataSource) -> Result<RunOutcome, RepoError> {
    let marker = MarkerFile::new(&settings.paths.marker_file);

    if !settings.force && marker.exists().await {
        info!(
            "Marker file exists ({}). Skipping repo update.",
            marker.path().display()
        );
        return Ok(RunOutcome::AlreadyConfigured);
    }

    let report = configure_repos(settings, source).await?;

    marker.mark_done().await?;
    info!("Marker file written to {}", marker.path().display());

    Ok(RunOutcome::Configured(report))
}
