//! Property-based tests for mirror selection and variable reconciliation

use proptest::prelude::*;
use rlc_cloud_repos::CloudMetadata;
use rlc_cloud_repos::dnf_vars::{VarOutcome, write_variable};
use rlc_cloud_repos::mirrors::{MirrorEntry, MirrorMap, Tier, select_mirror};
use tempfile::TempDir;

fn provider_name() -> impl Strategy<Value = String> {
    "[a-z]{3,8}".prop_filter("reserved key", |p| p != "default")
}

fn region_name() -> impl Strategy<Value = String> {
    "[a-z]{2,8}-[a-z]{2,6}[0-9]"
}

fn url() -> impl Strategy<Value = String> {
    "[a-z]{3,10}".prop_map(|host| format!("https://{}.example.com", host))
}

fn global_default() -> MirrorMap {
    MirrorMap::with_default(MirrorEntry::pair("https://global", "https://global.backup"))
}

// ============================================================================
// select_mirror property tests
// ============================================================================

proptest! {
    /// Property: with a global default present, selection never fails
    #[test]
    fn selection_never_fails_with_default(
        known in provider_name(),
        known_region in region_name(),
        provider in "[A-Za-z]{1,10}",
        region in ".*",
    ) {
        let mut map = global_default();
        map.insert_region(&known, &known_region, MirrorEntry::pair("https://p", "https://b"));

        let result = select_mirror(&CloudMetadata::new(provider, region), &map);
        prop_assert!(result.is_ok());
    }

    /// Property: a provider absent from the map always gets the global default
    #[test]
    fn unknown_provider_gets_global_default(
        known in provider_name(),
        provider in provider_name(),
        region in region_name(),
    ) {
        prop_assume!(known != provider);
        let mut map = global_default();
        map.insert_region(&known, &region, MirrorEntry::pair("https://p", "https://b"));

        let selection = select_mirror(&CloudMetadata::new(provider, region), &map).unwrap();
        prop_assert_eq!(selection.tier, Tier::GlobalDefault);
        prop_assert_eq!(selection.urls(), ("https://global", "https://global.backup"));
    }

    /// Property: an unknown region of a known provider gets the provider default
    #[test]
    fn unknown_region_gets_provider_default(
        provider in provider_name(),
        known_region in region_name(),
        region in region_name(),
        primary in url(),
        backup in url(),
    ) {
        prop_assume!(known_region != region);
        let mut map = global_default();
        map.insert_region(&provider, &known_region, MirrorEntry::pair("https://p", "https://b"));
        map.set_provider_default(&provider, MirrorEntry::pair(primary.clone(), backup.clone()));

        let selection = select_mirror(&CloudMetadata::new(provider, region), &map).unwrap();
        prop_assert_eq!(selection.tier, Tier::ProviderDefault);
        prop_assert_eq!(selection.primary, primary);
        prop_assert_eq!(selection.backup, backup);
    }

    /// Property: an exact entry always wins, whatever the provider name case
    #[test]
    fn exact_entry_wins(
        provider in provider_name(),
        region in region_name(),
        primary in url(),
        backup in url(),
        uppercase in any::<bool>(),
    ) {
        let mut map = global_default();
        map.insert_region(&provider, &region, MirrorEntry::pair(primary.clone(), backup.clone()));
        map.set_provider_default(&provider, MirrorEntry::pair("https://pd", "https://pd.backup"));

        let reported = if uppercase { provider.to_uppercase() } else { provider };
        let selection = select_mirror(&CloudMetadata::new(reported, region), &map).unwrap();
        prop_assert_eq!(selection.tier, Tier::Exact);
        prop_assert_eq!(selection.primary, primary);
        prop_assert_eq!(selection.backup, backup);
    }

    /// Property: region lookup is case-sensitive
    #[test]
    fn region_lookup_is_case_sensitive(
        provider in provider_name(),
        region in region_name(),
    ) {
        let mut map = global_default();
        map.insert_region(&provider, &region, MirrorEntry::pair("https://p", "https://b"));

        let selection =
            select_mirror(&CloudMetadata::new(provider, region.to_uppercase()), &map).unwrap();
        prop_assert_ne!(selection.tier, Tier::Exact);
    }
}

// ============================================================================
// write_variable property tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Property: writing the same value twice leaves no backup behind
    #[test]
    fn write_is_idempotent(name in "[a-z][a-z0-9_]{0,11}", value in "[ -~]{0,40}") {
        let temp = TempDir::new().unwrap();

        let first = tokio_test::block_on(write_variable(temp.path(), &name, &value));
        let second = tokio_test::block_on(write_variable(temp.path(), &name, &value));

        prop_assert_eq!(first, VarOutcome::Created);
        prop_assert_eq!(second, VarOutcome::Unchanged);
        let backup = temp.path().join(format!("{}.bak", name));
        prop_assert!(!backup.exists());
        let stored = std::fs::read_to_string(temp.path().join(&name)).unwrap();
        prop_assert_eq!(stored, format!("{}\n", value.trim()));
    }

    /// Property: after a change the backup holds the previous value
    #[test]
    fn change_backs_up_previous(
        name in "[a-z][a-z0-9_]{0,11}",
        old in "[a-z0-9:/.]{1,30}",
        new in "[a-z0-9:/.]{1,30}",
    ) {
        prop_assume!(old != new);
        let temp = TempDir::new().unwrap();

        tokio_test::block_on(write_variable(temp.path(), &name, &old));
        let outcome = tokio_test::block_on(write_variable(temp.path(), &name, &new));

        prop_assert_eq!(outcome, VarOutcome::Updated);
        let backup = std::fs::read_to_string(temp.path().join(format!("{}.bak", name))).unwrap();
        prop_assert_eq!(backup.trim(), old.as_str());
        let current = std::fs::read_to_string(temp.path().join(&name)).unwrap();
        prop_assert_eq!(current, format!("{}\n", new));
    }
}
