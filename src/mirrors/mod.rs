//! Mirror map parsing and lookup
//!
//! The mirror map is a YAML document shaped as:
//!
//! ```yaml
//! azure:
//!   eastus:
//!     primary: https://depot.eastus.prod.azure.ciq.com
//!     backup: https://depot.westus2.prod.azure.ciq.com
//!   default:
//!     primary: https://depot.eastus.prod.azure.ciq.com
//!     backup: https://depot.westus2.prod.azure.ciq.com
//! default:
//!   primary: https://depot.eastus.prod.azure.ciq.com
//!   backup: https://depot.prod.ciqws.com
//! ```
//!
//! Entries are parsed into [`MirrorEntry`] so the resolver can match on
//! shapes instead of inspecting raw YAML values.

pub mod azure;
pub mod backup;
pub mod select;

pub use backup::BackupSource;
pub use select::{MirrorSelection, Tier, select_mirror};

use crate::RepoError;
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::path::Path;
use tokio::fs;
use tracing::{debug, error, warn};

/// Key of the provider-level and top-level fallback entries
pub const DEFAULT_KEY: &str = "default";

/// A `{primary, backup}` mapping; either key may be missing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MirrorPair {
    pub primary: Option<String>,
    pub backup: Option<String>,
}

impl MirrorPair {
    /// Pair with both URLs set
    pub fn new(primary: impl Into<String>, backup: impl Into<String>) -> Self {
        Self {
            primary: Some(primary.into()),
            backup: Some(backup.into()),
        }
    }
}

/// One entry of the mirror map
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MirrorEntry {
    /// A mapping with `primary` and/or `backup`
    Pair(MirrorPair),
    /// Legacy bare string: primary only, no backup
    PrimaryOnly(String),
    /// Anything else (sequence, number, null); holds the YAML kind
    Malformed(&'static str),
}

impl MirrorEntry {
    /// Shorthand for a complete pair
    pub fn pair(primary: impl Into<String>, backup: impl Into<String>) -> Self {
        Self::Pair(MirrorPair::new(primary, backup))
    }

    fn from_value(value: &Value) -> Self {
        match value {
            Value::Mapping(map) => Self::Pair(MirrorPair {
                primary: url_field(map, "primary"),
                backup: url_field(map, "backup"),
            }),
            Value::String(s) => Self::PrimaryOnly(s.clone()),
            Value::Tagged(tagged) => Self::from_value(&tagged.value),
            other => Self::Malformed(value_kind(other)),
        }
    }
}

/// Mirrors known for one provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderMirrors {
    /// The provider entry is a mapping of regions plus an optional default
    Regions {
        regions: BTreeMap<String, MirrorEntry>,
        default: Option<MirrorEntry>,
    },
    /// The provider entry is not a mapping; holds the YAML kind
    NotAMapping(&'static str),
}

impl ProviderMirrors {
    fn empty() -> Self {
        Self::Regions {
            regions: BTreeMap::new(),
            default: None,
        }
    }

    fn from_value(provider: &str, value: &Value) -> Self {
        let map = match value {
            Value::Mapping(map) => map,
            Value::Tagged(tagged) => return Self::from_value(provider, &tagged.value),
            other => return Self::NotAMapping(value_kind(other)),
        };

        let mut regions = BTreeMap::new();
        let mut default = None;
        for (key, entry) in map {
            let Some(key) = key_string(key) else {
                warn!("Skipping non-scalar region key under provider '{}'", provider);
                continue;
            };
            let entry = MirrorEntry::from_value(entry);
            if key == DEFAULT_KEY {
                default = Some(entry);
            } else {
                regions.insert(key, entry);
            }
        }

        Self::Regions { regions, default }
    }
}

/// Parsed mirror map
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MirrorMap {
    providers: BTreeMap<String, ProviderMirrors>,
    default: Option<MirrorEntry>,
}

impl MirrorMap {
    /// Create an empty map (no global default)
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a map with only a global default
    pub fn with_default(entry: MirrorEntry) -> Self {
        Self {
            providers: BTreeMap::new(),
            default: Some(entry),
        }
    }

    /// Parse a mirror map from YAML text
    ///
    /// Only the document shape is checked here; use [`load_mirror_map`] for
    /// the global default requirement.
    pub fn from_yaml(yaml: &str) -> Result<Self, RepoError> {
        let value: Value = serde_yaml::from_str(yaml)
            .map_err(|e| RepoError::InvalidMirrorMap(format!("Invalid YAML in mirror map: {}", e)))?;
        Self::from_value(&value)
    }

    /// Build a mirror map from a parsed YAML value
    pub fn from_value(value: &Value) -> Result<Self, RepoError> {
        let map = match value {
            Value::Mapping(map) => map,
            other => {
                return Err(RepoError::InvalidMirrorMap(format!(
                    "top level must be a mapping, found {}",
                    value_kind(other)
                )));
            }
        };

        let mut mirror_map = Self::new();
        for (key, entry) in map {
            let Some(key) = key_string(key) else {
                warn!("Skipping non-scalar provider key in mirror map");
                continue;
            };
            if key == DEFAULT_KEY {
                mirror_map.default = Some(MirrorEntry::from_value(entry));
            } else {
                let provider = ProviderMirrors::from_value(&key, entry);
                mirror_map.providers.insert(key, provider);
            }
        }

        debug!(
            "Parsed mirror map with {} providers",
            mirror_map.providers.len()
        );
        Ok(mirror_map)
    }

    /// Mirrors for a provider key (already normalized)
    pub fn provider(&self, provider: &str) -> Option<&ProviderMirrors> {
        self.providers.get(provider)
    }

    /// Provider keys in sorted order
    pub fn providers(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }

    /// Top-level default entry
    pub fn default_entry(&self) -> Option<&MirrorEntry> {
        self.default.as_ref()
    }

    /// Set the top-level default entry
    pub fn set_default(&mut self, entry: MirrorEntry) {
        self.default = Some(entry);
    }

    /// Add or replace a region entry for a provider
    pub fn insert_region(&mut self, provider: &str, region: &str, entry: MirrorEntry) {
        if let ProviderMirrors::Regions { regions, .. } = self.provider_mut(provider) {
            regions.insert(region.to_string(), entry);
        }
    }

    /// Set a provider's default entry
    pub fn set_provider_default(&mut self, provider: &str, entry: MirrorEntry) {
        if let ProviderMirrors::Regions { default, .. } = self.provider_mut(provider) {
            *default = Some(entry);
        }
    }

    fn provider_mut(&mut self, provider: &str) -> &mut ProviderMirrors {
        let slot = self
            .providers
            .entry(provider.to_string())
            .or_insert_with(ProviderMirrors::empty);
        if matches!(slot, ProviderMirrors::NotAMapping(_)) {
            *slot = ProviderMirrors::empty();
        }
        slot
    }

    /// Fail unless the global default can terminate every lookup
    pub fn ensure_global_default(&self) -> Result<(), RepoError> {
        match &self.default {
            None => Err(RepoError::InvalidMirrorMap(
                "no top-level 'default' entry".to_string(),
            )),
            Some(MirrorEntry::Malformed(kind)) => Err(RepoError::InvalidMirrorMap(format!(
                "top-level 'default' entry is a {}, expected a mapping",
                kind
            ))),
            Some(MirrorEntry::PrimaryOnly(_)) => {
                warn!("Top-level 'default' is a bare string; backup URL will be empty");
                Ok(())
            }
            Some(MirrorEntry::Pair(MirrorPair { primary: None, .. })) => Err(
                RepoError::InvalidMirrorMap("top-level 'default' has no primary URL".to_string()),
            ),
            Some(MirrorEntry::Pair(pair)) => {
                if pair.backup.is_none() {
                    warn!("Top-level 'default' has no backup URL; backup will be empty");
                }
                Ok(())
            }
        }
    }

    /// Report every entry that lacks a primary or backup URL
    ///
    /// The global default and every provider must carry a default with both
    /// URLs, and every region entry must carry both.
    pub fn lint(&self) -> Vec<String> {
        let mut issues = entry_issues(self.default.as_ref(), "the top-level default section");

        for (provider, mirrors) in &self.providers {
            match mirrors {
                ProviderMirrors::NotAMapping(kind) => {
                    issues.push(format!("Provider '{}' is a {}, not a mapping", provider, kind));
                }
                ProviderMirrors::Regions { regions, default } => {
                    issues.extend(entry_issues(
                        default.as_ref(),
                        &format!("the default section of provider '{}'", provider),
                    ));
                    for (region, entry) in regions {
                        issues.extend(entry_issues(
                            Some(entry),
                            &format!("region '{}' of provider '{}'", region, provider),
                        ));
                    }
                }
            }
        }

        issues
    }
}

fn entry_issues(entry: Option<&MirrorEntry>, location: &str) -> Vec<String> {
    match entry {
        None => vec![format!("No entry found for {}", location)],
        Some(MirrorEntry::Malformed(kind)) => {
            vec![format!("Entry for {} is a {}, not a mapping", location, kind)]
        }
        Some(MirrorEntry::PrimaryOnly(_)) => {
            vec![format!("No backup URL found in {} (bare string entry)", location)]
        }
        Some(MirrorEntry::Pair(pair)) => {
            let mut issues = Vec::new();
            if pair.primary.is_none() {
                issues.push(format!("No primary URL found in {}", location));
            }
            if pair.backup.is_none() {
                issues.push(format!("No backup URL found in {}", location));
            }
            issues
        }
    }
}

/// Load the mirror map from disk
///
/// Fails when the file is missing, is not valid YAML, or has no usable
/// top-level `default` entry.
pub async fn load_mirror_map(path: &Path) -> Result<MirrorMap, RepoError> {
    if !fs::try_exists(path).await.unwrap_or(false) {
        error!("Mirror YAML not found at {}", path.display());
        return Err(RepoError::MirrorMapNotFound(path.to_path_buf()));
    }

    let content = fs::read_to_string(path).await?;
    let map = MirrorMap::from_yaml(&content).inspect_err(|e| {
        error!("Failed to parse mirror map {}: {}", path.display(), e);
    })?;
    map.ensure_global_default()?;

    debug!("Loaded mirror map from {}", path.display());
    Ok(map)
}

fn url_field(map: &Mapping, key: &str) -> Option<String> {
    match map.get(key)? {
        Value::String(s) => Some(s.clone()),
        other => {
            warn!("Ignoring non-string '{}' value ({})", key, value_kind(other));
            None
        }
    }
}

fn key_string(key: &Value) -> Option<String> {
    match key {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}
