//! Standard rlc-cloud-repos paths
//!
//! Every path the tool reads or writes, with the system defaults.

use std::path::{Path, PathBuf};

/// Default mirror map location
pub const DEFAULT_MIRROR_PATH: &str = "/etc/rlc-cloud-repos/mirrors.yaml";

/// Default marker file location
pub const DEFAULT_MARKER_PATH: &str = "/etc/rlc-cloud-repos/.configured";

/// dnf variable directory
pub const DNF_VARS_DIR: &str = "/etc/dnf/vars";

/// cloud-init instance data written at boot
pub const INSTANCE_DATA_PATH: &str = "/run/cloud-init/instance-data.json";

/// Default output of `select --format repo --output`
pub const DEFAULT_REPO_FILE_PATH: &str = "/etc/yum.repos.d/rlc-depot.repo";

/// Paths used during a configuration pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoPaths {
    /// Mirror map YAML
    pub mirror_file: PathBuf,
    /// Directory holding one file per dnf variable
    pub vars_dir: PathBuf,
    /// Marker whose existence means the pass already ran
    pub marker_file: PathBuf,
    /// cloud-init instance data JSON
    pub instance_data: PathBuf,
}

impl Default for RepoPaths {
    fn default() -> Self {
        Self::new()
    }
}

impl RepoPaths {
    /// Create with default paths
    pub fn new() -> Self {
        Self {
            mirror_file: PathBuf::from(DEFAULT_MIRROR_PATH),
            vars_dir: PathBuf::from(DNF_VARS_DIR),
            marker_file: PathBuf::from(DEFAULT_MARKER_PATH),
            instance_data: PathBuf::from(INSTANCE_DATA_PATH),
        }
    }

    /// Relocate every default path under `root` (useful for testing)
    pub fn with_root(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let rebase = |p: &str| root.join(p.trim_start_matches('/'));
        Self {
            mirror_file: rebase(DEFAULT_MIRROR_PATH),
            vars_dir: rebase(DNF_VARS_DIR),
            marker_file: rebase(DEFAULT_MARKER_PATH),
            instance_data: rebase(INSTANCE_DATA_PATH),
        }
    }

    /// Override the mirror map path
    pub fn with_mirror_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.mirror_file = path.into();
        self
    }

    /// Override the dnf variable directory
    pub fn with_vars_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.vars_dir = path.into();
        self
    }

    /// Override the marker file path
    pub fn with_marker_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.marker_file = path.into();
        self
    }

    /// Override the instance data path
    pub fn with_instance_data(mut self, path: impl Into<PathBuf>) -> Self {
        self.instance_data = path.into();
        self
    }

    /// Path of a single dnf variable file
    pub fn var_file(&self, name: &str) -> PathBuf {
        self.vars_dir.join(name)
    }
}
