//! Run settings
//!
//! Everything a configuration pass needs besides the metadata source.
//! The binary fills this from command line flags and environment variables.

use crate::RepoError;
use crate::dnf_vars::VariableSet;
use crate::mirrors::BackupSource;
use crate::paths::RepoPaths;

/// Settings for one configuration pass
#[derive(Debug, Clone, Default)]
pub struct Settings {
    /// File locations
    pub paths: RepoPaths,
    /// Ignore the marker file
    pub force: bool,
    /// Where `baseurl2` comes from
    pub backup: BackupSource,
    /// Additional variables written after the mirror variables
    pub extra_vars: VariableSet,
}

impl Settings {
    /// Settings with the given paths and defaults for everything else
    pub fn new(paths: RepoPaths) -> Self {
        Self {
            paths,
            ..Default::default()
        }
    }

    /// Ignore the marker file
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Set the backup policy
    pub fn with_backup(mut self, backup: BackupSource) -> Self {
        self.backup = backup;
        self
    }

    /// Add an extra variable
    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_vars.insert(name, value);
        self
    }
}

/// Parse a `NAME=VALUE` assignment
pub fn parse_assignment(raw: &str) -> Result<(String, String), RepoError> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| RepoError::Config(format!("expected NAME=VALUE, got '{}'", raw)))?;

    let name = name.trim();
    if name.is_empty() {
        return Err(RepoError::Config(format!("empty variable name in '{}'", raw)));
    }
    Ok((name.to_string(), value.to_string()))
}
