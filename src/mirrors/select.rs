//! Mirror selection
//!
//! Three tiers, tried in order, first match wins:
//! 1. exact region entry of the provider
//! 2. the provider's `default` entry
//! 3. the top-level `default` entry
//!
//! Tiers are never merged: an exact region entry missing its backup yields
//! an empty backup rather than borrowing one from a default.

use super::{MirrorEntry, MirrorMap, MirrorPair, ProviderMirrors};
use crate::{CloudMetadata, RepoError};
use tracing::{debug, info, warn};

/// Fallback tier that produced a selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// Provider and region both matched
    Exact,
    /// Provider matched, region did not
    ProviderDefault,
    /// Provider unknown or unusable
    GlobalDefault,
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tier::Exact => write!(f, "exact"),
            Tier::ProviderDefault => write!(f, "provider-default"),
            Tier::GlobalDefault => write!(f, "global-default"),
        }
    }
}

/// Primary and backup mirror URLs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorSelection {
    pub primary: String,
    pub backup: String,
    pub tier: Tier,
}

impl MirrorSelection {
    /// `(primary, backup)` as string slices
    pub fn urls(&self) -> (&str, &str) {
        (&self.primary, &self.backup)
    }
}

/// Choose the primary and backup mirror URLs for the given cloud metadata
///
/// The provider is matched case-insensitively, the region exactly. Fails
/// only when the lookup falls through to a missing or malformed top-level
/// default.
pub fn select_mirror(
    metadata: &CloudMetadata,
    mirror_map: &MirrorMap,
) -> Result<MirrorSelection, RepoError> {
    let provider = metadata.provider_key();
    let region = metadata.region();

    info!(
        "Selecting mirror for provider={}, region={}",
        provider,
        region.unwrap_or("<none>")
    );

    match mirror_map.provider(&provider) {
        Some(ProviderMirrors::Regions { regions, default }) => {
            match region.and_then(|r| regions.get(r)) {
                Some(MirrorEntry::Pair(pair)) => {
                    return Ok(from_pair(pair, Tier::Exact));
                }
                Some(other) => {
                    debug!(
                        "Region entry for {} is not a mapping ({:?}), trying provider default",
                        provider, other
                    );
                }
                None => {
                    debug!("No region entry for {}, trying provider default", provider);
                }
            }

            if let Some(selection) = default
                .as_ref()
                .and_then(|entry| from_default(entry, Tier::ProviderDefault))
            {
                return Ok(selection);
            }
            info!("Provider {} has no usable default, using global default", provider);
        }
        Some(ProviderMirrors::NotAMapping(kind)) => {
            warn!(
                "Mirror map entry for provider {} is a {}, using global default",
                provider, kind
            );
        }
        None => {
            info!("Provider {} not found, using default values", provider);
        }
    }

    mirror_map
        .default_entry()
        .and_then(|entry| from_default(entry, Tier::GlobalDefault))
        .ok_or_else(|| RepoError::mirror_not_found(provider, region))
}

fn from_default(entry: &MirrorEntry, tier: Tier) -> Option<MirrorSelection> {
    match entry {
        MirrorEntry::Pair(pair) => Some(from_pair(pair, tier)),
        MirrorEntry::PrimaryOnly(primary) => {
            warn!("Legacy string entry at {} tier, backup URL left empty", tier);
            Some(MirrorSelection {
                primary: primary.clone(),
                backup: String::new(),
                tier,
            })
        }
        MirrorEntry::Malformed(kind) => {
            warn!("Ignoring {} entry at {} tier", kind, tier);
            None
        }
    }
}

fn from_pair(pair: &MirrorPair, tier: Tier) -> MirrorSelection {
    let field = |value: &Option<String>, key: &str| {
        value.clone().unwrap_or_else(|| {
            warn!("Mirror entry at {} tier has no '{}' URL, using empty string", tier, key);
            String::new()
        })
    };

    let selection = MirrorSelection {
        primary: field(&pair.primary, "primary"),
        backup: field(&pair.backup, "backup"),
        tier,
    };
    debug!(
        "Selected {} tier: primary={}, backup={}",
        tier, selection.primary, selection.backup
    );
    selection
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario_map() -> MirrorMap {
        MirrorMap::from_yaml(
            r#"
azure:
  eastus:
    primary: P
    backup: B
default:
  primary: D1
  backup: D2
"#,
        )
        .unwrap()
    }

    fn select(provider: &str, region: &str, map: &MirrorMap) -> (String, String) {
        let selection = select_mirror(&CloudMetadata::new(provider, region), map).unwrap();
        (selection.primary, selection.backup)
    }

    #[test]
    fn test_exact_match() {
        let map = scenario_map();
        assert_eq!(select("azure", "eastus", &map), ("P".into(), "B".into()));
    }

    #[test]
    fn test_unknown_region_without_provider_default_uses_global() {
        let map = scenario_map();
        let selection = select_mirror(&CloudMetadata::new("azure", "westus"), &map).unwrap();
        assert_eq!(selection.urls(), ("D1", "D2"));
        assert_eq!(selection.tier, Tier::GlobalDefault);
    }

    #[test]
    fn test_unknown_provider_uses_global() {
        let map = scenario_map();
        assert_eq!(select("gcp", "x", &map), ("D1".into(), "D2".into()));
    }

    #[test]
    fn test_provider_is_case_insensitive_region_is_not() {
        let map = scenario_map();
        assert_eq!(select("AZURE", "eastus", &map), ("P".into(), "B".into()));
        assert_eq!(select("azure", "EastUS", &map), ("D1".into(), "D2".into()));
    }

    #[test]
    fn test_provider_default_tier() {
        let mut map = scenario_map();
        map.set_provider_default("azure", MirrorEntry::pair("AD1", "AD2"));

        let selection = select_mirror(&CloudMetadata::new("azure", "westus"), &map).unwrap();
        assert_eq!(selection.urls(), ("AD1", "AD2"));
        assert_eq!(selection.tier, Tier::ProviderDefault);
    }

    #[test]
    fn test_legacy_string_provider_default() {
        let mut map = scenario_map();
        map.set_provider_default("azure", MirrorEntry::PrimaryOnly("LEGACY".to_string()));

        assert_eq!(select("azure", "westus", &map), ("LEGACY".into(), String::new()));
    }

    #[test]
    fn test_exact_entry_with_missing_backup_is_not_merged() {
        let map = MirrorMap::from_yaml(
            r#"
aws:
  us-east-1:
    primary: P
  default:
    primary: AD1
    backup: AD2
default:
  primary: D1
  backup: D2
"#,
        )
        .unwrap();

        let selection = select_mirror(&CloudMetadata::new("aws", "us-east-1"), &map).unwrap();
        assert_eq!(selection.urls(), ("P", ""));
        assert_eq!(selection.tier, Tier::Exact);
    }

    #[test]
    fn test_non_mapping_region_falls_to_provider_default() {
        let map = MirrorMap::from_yaml(
            r#"
aws:
  us-east-1: https://bare
  default:
    primary: AD1
    backup: AD2
default:
  primary: D1
  backup: D2
"#,
        )
        .unwrap();

        assert_eq!(select("aws", "us-east-1", &map), ("AD1".into(), "AD2".into()));
    }

    #[test]
    fn test_non_mapping_provider_uses_global() {
        let map = MirrorMap::from_yaml("oracle: [1, 2]\ndefault:\n  primary: D1\n  backup: D2\n")
            .unwrap();
        assert_eq!(select("oracle", "us-ashburn-1", &map), ("D1".into(), "D2".into()));
    }

    #[test]
    fn test_malformed_provider_default_uses_global() {
        let map = MirrorMap::from_yaml(
            "aws:\n  default: 42\ndefault:\n  primary: D1\n  backup: D2\n",
        )
        .unwrap();
        let selection = select_mirror(&CloudMetadata::new("aws", "nowhere"), &map).unwrap();
        assert_eq!(selection.tier, Tier::GlobalDefault);
    }

    #[test]
    fn test_missing_region_skips_exact_tier() {
        let map = scenario_map();
        let metadata = CloudMetadata {
            provider: "azure".to_string(),
            region: None,
            ..Default::default()
        };
        let selection = select_mirror(&metadata, &map).unwrap();
        assert_eq!(selection.tier, Tier::GlobalDefault);
    }

    #[test]
    fn test_missing_global_default_fails() {
        let map = MirrorMap::from_yaml("azure:\n  eastus:\n    primary: url\n").unwrap();

        let err = select_mirror(&CloudMetadata::new("unknown", "unknown"), &map).unwrap_err();
        assert!(matches!(err, RepoError::MirrorNotFound { .. }));
        assert!(err.to_string().contains("provider=unknown, region=unknown"));
    }

    #[test]
    fn test_malformed_global_default_fails() {
        let map = MirrorMap::from_yaml("default: 7\n").unwrap();
        assert!(select_mirror(&CloudMetadata::new("gcp", "x"), &map).is_err());
    }

    #[test]
    fn test_legacy_global_default() {
        let map = MirrorMap::with_default(MirrorEntry::PrimaryOnly("G".to_string()));
        assert_eq!(select("gcp", "x", &map), ("G".into(), String::new()));
    }

    #[test]
    fn test_tier_display() {
        assert_eq!(Tier::Exact.to_string(), "exact");
        assert_eq!(Tier::ProviderDefault.to_string(), "provider-default");
        assert_eq!(Tier::GlobalDefault.to_string(), "global-default");
    }
}
