//! Azure mirror generation
//!
//! Rebuilds the `azure` section of a mirror map from Azure's region
//! metadata. Every active region gets its own depot as primary and its
//! regional pair's depot as backup.

use crate::RepoError;
use serde_yaml::{Mapping, Value};
use std::path::Path;
use tokio::fs;
use tracing::{debug, info, warn};

/// Provider key of the generated section
pub const AZURE_KEY: &str = "azure";

/// Primary used when the existing map has no azure default
pub const AZURE_DEFAULT_PRIMARY: &str = "https://depot.eastus.prod.azure.ciq.com";

/// An active Azure region and its regional pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AzureRegion {
    pub name: String,
    pub regional_pair: String,
}

/// Depot URL serving an Azure region
pub fn depot_url(region: &str) -> String {
    format!("https://depot.{}.prod.azure.ciq.com", region)
}

/// Extract active regions from Azure metadata
///
/// Reads the `Regions` sequence; commented-out regions never reach the
/// parsed document, and entries without a `name` are skipped.
pub fn extract_active_regions(metadata: &Value) -> Vec<AzureRegion> {
    let Some(regions) = metadata.get("Regions").and_then(Value::as_sequence) else {
        warn!("Azure metadata has no 'Regions' sequence");
        return Vec::new();
    };

    regions
        .iter()
        .filter_map(|region| {
            let name = region.get("name").and_then(Value::as_str)?;
            let regional_pair = region
                .get("regional_pair")
                .and_then(Value::as_str)
                .unwrap_or_default();
            Some(AzureRegion {
                name: name.to_string(),
                regional_pair: regional_pair.to_string(),
            })
        })
        .collect()
}

/// Generate `{primary, backup}` entries for each region
///
/// A region without a pair takes `fallback_backup`, or gets no backup key
/// when there is none.
pub fn generate_mirror_urls(regions: &[AzureRegion], fallback_backup: Option<&str>) -> Mapping {
    let mut mirrors = Mapping::new();
    for region in regions {
        let mut entry = Mapping::new();
        entry.insert("primary".into(), depot_url(&region.name).into());

        if !region.regional_pair.is_empty() {
            entry.insert("backup".into(), depot_url(&region.regional_pair).into());
        } else if let Some(backup) = fallback_backup {
            debug!("Region {} has no regional pair, using {}", region.name, backup);
            entry.insert("backup".into(), backup.into());
        } else {
            warn!("Region {} has no regional pair and no fallback backup", region.name);
        }

        mirrors.insert(region.name.clone().into(), Value::Mapping(entry));
    }
    mirrors
}

/// The existing azure default entry, or a primary-only placeholder
pub fn preserve_default_entry(existing: &Value) -> Value {
    if let Some(default) = existing.get(AZURE_KEY).and_then(|azure| azure.get("default")) {
        return default.clone();
    }

    let mut entry = Mapping::new();
    entry.insert("primary".into(), AZURE_DEFAULT_PRIMARY.into());
    Value::Mapping(entry)
}

/// Replace the azure section of `existing` with one generated from `azure_metadata`
///
/// All other sections are kept as they are.
pub fn transform_azure_mirrors(azure_metadata: &Value, existing: &Value) -> Result<Value, RepoError> {
    let Value::Mapping(existing_map) = existing else {
        return Err(RepoError::InvalidMirrorMap(
            "existing mirrors document is not a mapping".to_string(),
        ));
    };

    let regions = extract_active_regions(azure_metadata);
    let default = preserve_default_entry(existing);
    let fallback_backup = default.get("backup").and_then(Value::as_str);

    let mut azure = generate_mirror_urls(&regions, fallback_backup);
    azure.insert("default".into(), default.clone());

    let mut updated = existing_map.clone();
    updated.insert(AZURE_KEY.into(), Value::Mapping(azure));

    info!("Generated {} azure mirror entries", regions.len());
    Ok(Value::Mapping(updated))
}

/// Whether the azure sections of two mirror documents differ
pub fn azure_section_changed(updated: &Value, existing: &Value) -> bool {
    updated.get(AZURE_KEY) != existing.get(AZURE_KEY)
}

/// Load a YAML document from disk
pub async fn load_yaml_file(path: &Path) -> Result<Value, RepoError> {
    let content = fs::read_to_string(path).await.map_err(|e| {
        RepoError::Config(format!("Cannot read {}: {}", path.display(), e))
    })?;
    Ok(serde_yaml::from_str(&content)?)
}

/// Serialize a YAML document
pub fn to_yaml(value: &Value) -> Result<String, RepoError> {
    Ok(serde_yaml::to_string(value)?)
}
