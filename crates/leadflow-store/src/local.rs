//! The local snapshot slot
//!
//! One durable key-value slot holding the whole application snapshot.
//! Loading tolerates a missing or corrupt slot by falling back to the
//! default snapshot; saving is always a total overwrite, replaced
//! atomically so a crash mid-write can never leave a torn slot.

use leadflow_model::Snapshot;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Errors saving the local slot. Loading is total and never errors.
#[derive(Debug, thiserror::Error)]
pub enum LocalStoreError {
    /// Snapshot could not be serialized
    #[error("snapshot serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Slot file could not be written or replaced
    #[error("snapshot write failed: {0}")]
    Io(#[from] io::Error),
}

/// File-backed single-slot snapshot store.
#[derive(Debug, Clone)]
pub struct LocalStore {
    path: PathBuf,
}

impl LocalStore {
    /// Store backed by the given slot path.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The slot path.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted snapshot, merged over defaults.
    ///
    /// A missing file, an unreadable file, or corrupt JSON all yield the
    /// default snapshot. Same-shape partial data merges field-wise via
    /// serde defaults.
    #[must_use]
    pub fn load(&self) -> Snapshot {
        match fs::read_to_string(&self.path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(snapshot) => snapshot,
                Err(err) => {
                    tracing::warn!(path = %self.path.display(), %err, "corrupt snapshot slot, using defaults");
                    Snapshot::default()
                }
            },
            Err(err) if err.kind() == io::ErrorKind::NotFound => Snapshot::default(),
            Err(err) => {
                tracing::warn!(path = %self.path.display(), %err, "unreadable snapshot slot, using defaults");
                Snapshot::default()
            }
        }
    }

    /// Persist the full snapshot, replacing the slot atomically.
    ///
    /// Writes to a sibling temp file and renames over the slot. There is no
    /// partial-field update path.
    pub fn save(&self, snapshot: &Snapshot) -> Result<(), LocalStoreError> {
        let raw = serde_json::to_string_pretty(snapshot)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, raw)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
