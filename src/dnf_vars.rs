//! dnf variable reconciliation
//!
//! Each dnf variable lives in its own file under the vars directory
//! (`/etc/dnf/vars/baseurl1` holds `$baseurl1`). Writes converge on the
//! desired value:
//! - missing file: created
//! - same value: left alone
//! - different value: copied to `<name>.bak`, then replaced
//!
//! Replacement goes through a temp file renamed over the target, so the
//! live file holds either the old or the new value at every point. A
//! failed backup skips the write; a failed write is logged and the rest of
//! the batch carries on.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, error, info, warn};

/// Suffix of the file holding the previous value
pub const BACKUP_SUFFIX: &str = ".bak";

/// Ordered set of variables to write
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableSet {
    vars: Vec<(String, String)>,
}

impl VariableSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a variable, replacing the value of an existing one in place
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.vars.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = value,
            None => self.vars.push((name, value)),
        }
    }

    /// Builder form of [`VariableSet::insert`]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Value of a variable
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for VariableSet {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (name, value) in iter {
            set.insert(name, value);
        }
        set
    }
}

/// Result of reconciling one variable
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VarOutcome {
    /// File did not exist and was written
    Created,
    /// File already held the value
    Unchanged,
    /// Previous value moved to the backup and the new value written
    Updated,
    /// Backup failed, the previous value was left in place
    BackupFailed(String),
    /// Value could not be written
    WriteFailed(String),
}

impl VarOutcome {
    /// Whether the variable now holds the requested value
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Created | Self::Unchanged | Self::Updated)
    }
}

impl std::fmt::Display for VarOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Unchanged => write!(f, "unchanged"),
            Self::Updated => write!(f, "updated"),
            Self::BackupFailed(reason) => write!(f, "backup failed: {}", reason),
            Self::WriteFailed(reason) => write!(f, "write failed: {}", reason),
        }
    }
}

/// Path of the backup file for a variable
pub fn backup_path(base_dir: &Path, name: &str) -> PathBuf {
    base_dir.join(format!("{}{}", name, BACKUP_SUFFIX))
}

/// Create or update a single dnf variable
///
/// Surrounding whitespace of `value` is dropped, so stored and desired
/// values compare the same way. Never returns an error: failures are
/// logged and reported in the outcome.
pub async fn write_variable(base_dir: &Path, name: &str, value: &str) -> VarOutcome {
    let value = value.trim();
    if !is_valid_name(name) {
        error!("Invalid DNF var name '{}', skipping", name);
        return VarOutcome::WriteFailed(format!("invalid variable name '{}'", name));
    }

    if let Err(e) = fs::create_dir_all(base_dir).await {
        error!("Cannot create DNF vars dir {} ({}), skipping", base_dir.display(), e);
        return VarOutcome::WriteFailed(e.to_string());
    }

    let path = base_dir.join(name);
    let outcome = match fs::read(&path).await {
        Ok(current) => {
            // Undecodable content never matches and is replaced
            if std::str::from_utf8(&current).map(str::trim) == Ok(value) {
                debug!("DNF var '{}' already set correctly.", name);
                return VarOutcome::Unchanged;
            }

            let backup = backup_path(base_dir, name);
            if let Err(e) = fs::copy(&path, &backup).await {
                error!("Cannot backup DNF var '{}' ({}), skipping", name, e);
                return VarOutcome::BackupFailed(e.to_string());
            }
            info!(
                "Backed up existing DNF var '{}' to '{}'",
                name,
                backup.file_name().unwrap_or_default().to_string_lossy()
            );
            VarOutcome::Updated
        }
        Err(e) if e.kind() == ErrorKind::NotFound => VarOutcome::Created,
        Err(e) => {
            error!("Cannot read DNF var '{}' ({}), skipping", name, e);
            return VarOutcome::WriteFailed(e.to_string());
        }
    };

    if let Err(e) = replace_file(base_dir, name, value).await {
        error!("Cannot write to DNF var '{}' ({}), skipping", name, e);
        return VarOutcome::WriteFailed(e.to_string());
    }

    if value.is_empty() {
        warn!("Wrote empty value for DNF var '{}'", name);
    }
    info!("Wrote DNF var '{}': {}", name, value);
    outcome
}

/// Write every variable of the set, continuing past failures
pub async fn write_variables(base_dir: &Path, vars: &VariableSet) -> Vec<(String, VarOutcome)> {
    let mut outcomes = Vec::with_capacity(vars.len());
    for (name, value) in vars.iter() {
        let outcome = write_variable(base_dir, name, value).await;
        outcomes.push((name.to_string(), outcome));
    }
    outcomes
}

/// Write `value\n` to a temp file beside the target and rename it into place
async fn replace_file(base_dir: &Path, name: &str, value: &str) -> std::io::Result<()> {
    let temp = base_dir.join(format!(".{}.tmp", name));
    fs::write(&temp, format!("{}\n", value)).await?;

    if let Err(e) = fs::rename(&temp, base_dir.join(name)).await {
        fs::remove_file(&temp).await.ok();
        return Err(e);
    }
    Ok(())
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\', '\0'])
}
