//! Backup mirror policy
//!
//! The mirror map already names a backup for every entry, but deployments
//! differ on what `baseurl2` should point at. The policy is chosen
//! explicitly instead of being baked into the writer.

use super::MirrorSelection;
use tracing::{debug, warn};
use url::Url;

/// Global depot used as the fixed backup
pub const GLOBAL_FALLBACK_URL: &str = "https://depot.prod.ciqws.com";

/// Where the backup mirror URL comes from
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BackupSource {
    /// Use the backup resolved from the mirror map
    #[default]
    Map,
    /// Always use this URL
    Fixed(String),
    /// Drop the region label from the primary URL's host
    ///
    /// `https://depot.eastus.prod.azure.ciq.com` in region `eastus` becomes
    /// `https://depot.prod.azure.ciq.com`. When the host does not carry the
    /// region label the resolved backup is kept.
    DerivedFromPrimary,
}

impl BackupSource {
    /// Apply the policy to a resolved selection
    pub fn apply(&self, mut selection: MirrorSelection, region: Option<&str>) -> MirrorSelection {
        match self {
            BackupSource::Map => {}
            BackupSource::Fixed(url) => {
                debug!("Using fixed backup mirror {}", url);
                selection.backup = url.clone();
            }
            BackupSource::DerivedFromPrimary => {
                match region.and_then(|r| derive_from_primary(&selection.primary, r)) {
                    Some(url) => {
                        debug!("Derived backup mirror {} from {}", url, selection.primary);
                        selection.backup = url;
                    }
                    None => warn!(
                        "Cannot derive backup from primary {}, keeping {}",
                        selection.primary, selection.backup
                    ),
                }
            }
        }
        selection
    }
}

impl std::fmt::Display for BackupSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackupSource::Map => write!(f, "map"),
            BackupSource::Fixed(url) => write!(f, "fixed ({})", url),
            BackupSource::DerivedFromPrimary => write!(f, "derived"),
        }
    }
}

fn derive_from_primary(primary: &str, region: &str) -> Option<String> {
    let mut url = Url::parse(primary).ok()?;
    let host = url.host_str()?.to_string();

    let labels: Vec<&str> = host.split('.').collect();
    if !labels.contains(&region) {
        return None;
    }
    let derived: Vec<&str> = labels.into_iter().filter(|label| *label != region).collect();
    if derived.len() < 2 {
        return None;
    }

    url.set_host(Some(&derived.join("."))).ok()?;
    let mut derived = url.to_string();
    if !primary.ends_with('/') && url.path() == "/" {
        derived.pop();
    }
    Some(derived)
}
