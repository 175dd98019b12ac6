//! Integration tests for mirror map loading and selection

use rlc_cloud_repos::mirrors::{MirrorEntry, MirrorMap, Tier, load_mirror_map, select_mirror};
use rlc_cloud_repos::{CloudMetadata, RepoError};
use std::path::PathBuf;
use tempfile::TempDir;

fn shipped_mirrors() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("data/mirrors.yaml")
}

// ==================== Shipped Mirror Map ====================

/// Test the shipped mirror map loads and has a global default
#[tokio::test]
async fn test_load_shipped_map() {
    let map = load_mirror_map(&shipped_mirrors()).await.unwrap();

    assert!(map.provider("azure").is_some());
    assert!(map.default_entry().is_some());
}

/// Test every entry of the shipped map has both URLs
#[tokio::test]
async fn test_shipped_map_is_complete() {
    let map = load_mirror_map(&shipped_mirrors()).await.unwrap();
    let issues = map.lint();

    assert!(issues.is_empty(), "unexpected issues: {:?}", issues);
}

/// Test every common provider/region pair resolves to two https URLs
#[tokio::test]
async fn test_shipped_map_always_resolves() {
    let map = load_mirror_map(&shipped_mirrors()).await.unwrap();

    let cases = [
        ("aws", "us-west-2"),
        ("azure", "eastus"),
        ("azure", "westus2"),
        ("azure", "nonexistent-region"),
        ("gcp", "us-central1"),
        ("oracle", "us-ashburn-1"),
        ("unknown-provider", "unknown-region"),
    ];

    for (provider, region) in cases {
        let selection = select_mirror(&CloudMetadata::new(provider, region), &map).unwrap();
        assert!(
            selection.primary.starts_with("https://"),
            "{}/{}: {}",
            provider,
            region,
            selection.primary
        );
        assert!(selection.backup.starts_with("https://"));
    }
}

/// Test azure falls back to its provider default for unknown regions
#[tokio::test]
async fn test_shipped_map_provider_fallback() {
    let map = load_mirror_map(&shipped_mirrors()).await.unwrap();

    let selection = select_mirror(&CloudMetadata::new("azure", "unknown"), &map).unwrap();
    assert_eq!(selection.primary, "https://depot.eastus.prod.azure.ciq.com");
    assert_eq!(selection.tier, Tier::ProviderDefault);
}

/// Test an unknown provider gets the global default
#[tokio::test]
async fn test_shipped_map_global_fallback() {
    let map = load_mirror_map(&shipped_mirrors()).await.unwrap();

    let selection = select_mirror(&CloudMetadata::new("unknown", "unknown"), &map).unwrap();
    assert_eq!(selection.primary, "https://depot.eastus.prod.azure.ciq.com");
    assert_eq!(selection.backup, "https://depot.prod.ciqws.com");
    assert_eq!(selection.tier, Tier::GlobalDefault);
}

// ==================== Fallback Scenarios ====================

/// Test the three-tier walk on a small map
#[test]
fn test_scenario_map() {
    let map = MirrorMap::from_yaml(
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
    .unwrap();

    let pick = |provider: &str, region: &str| {
        let selection = select_mirror(&CloudMetadata::new(provider, region), &map).unwrap();
        (selection.primary, selection.backup)
    };

    assert_eq!(pick("azure", "eastus"), ("P".to_string(), "B".to_string()));
    assert_eq!(pick("azure", "westus"), ("D1".to_string(), "D2".to_string()));
    assert_eq!(pick("gcp", "x"), ("D1".to_string(), "D2".to_string()));
}

/// Test mixed-case provider names from metadata still match
#[test]
fn test_provider_case_from_metadata() {
    let mut map = MirrorMap::with_default(MirrorEntry::pair("D1", "D2"));
    map.insert_region("oracle", "us-ashburn-1", MirrorEntry::pair("OP", "OB"));

    let selection = select_mirror(&CloudMetadata::new("Oracle", "us-ashburn-1"), &map).unwrap();
    assert_eq!(selection.urls(), ("OP", "OB"));
}

// ==================== Failure Cases ====================

/// Test a missing mirror file is a configuration error
#[tokio::test]
async fn test_missing_file() {
    let err = load_mirror_map(&PathBuf::from("nonexistent.yaml"))
        .await
        .unwrap_err();

    assert!(matches!(err, RepoError::MirrorMapNotFound(_)));
    assert!(err.to_string().contains("nonexistent.yaml"));
}

/// Test invalid YAML is rejected at load time
#[tokio::test]
async fn test_invalid_yaml() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("invalid.yaml");
    std::fs::write(&path, "{ invalid: yaml: content").unwrap();

    let err = load_mirror_map(&path).await.unwrap_err();
    assert!(err.is_configuration_missing());
}

/// Test selection without any fallback fails loudly
#[test]
fn test_select_without_fallback() {
    let map = MirrorMap::from_yaml("azure:\n  eastus:\n    primary: url\n").unwrap();

    let result = select_mirror(&CloudMetadata::new("unknown", "unknown"), &map);
    assert!(matches!(result, Err(RepoError::MirrorNotFound { .. })));
}
