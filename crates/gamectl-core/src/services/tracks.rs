//! Track discovery over the tracks directory.
//!
//! The catalog is recomputed from the filesystem on every call and never
//! cached, so listing and validation always agree with each other. They
//! are not atomic against concurrent filesystem changes; that race is
//! accepted and documented rather than eliminated.

use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::TrackSelection;
use crate::ports::ControlError;

/// Subdirectory name inside every track that never names a variant.
pub const RESERVED_VARIANT_DIR: &str = "data";

/// Filesystem-derived set of valid track/variant selection strings.
pub struct TrackCatalog {
    tracks_dir: PathBuf,
}

impl TrackCatalog {
    /// Create a catalog over the given tracks directory.
    pub fn new(tracks_dir: impl Into<PathBuf>) -> Self {
        Self {
            tracks_dir: tracks_dir.into(),
        }
    }

    /// Enumerate all selectable entries.
    ///
    /// Each immediate subdirectory is a track. A track without variant
    /// subdirectories contributes its own name; one with N variants
    /// contributes N entries of the form `"<track> <variant>"`, in
    /// directory enumeration order.
    pub fn entries(&self) -> Result<Vec<String>, ControlError> {
        let mut entries = Vec::new();
        for (track, track_path) in subdirectories(&self.tracks_dir)? {
            let variants: Vec<String> = subdirectories(&track_path)?
                .into_iter()
                .map(|(name, _)| name)
                .filter(|name| name != RESERVED_VARIANT_DIR)
                .collect();
            if variants.is_empty() {
                entries.push(track);
            } else {
                for variant in variants {
                    entries.push(format!("{track} {variant}"));
                }
            }
        }
        Ok(entries)
    }

    /// Check a requested selection against the live catalog.
    ///
    /// Uses the same computation as [`entries`](Self::entries), so a
    /// selection that validates here was listable in the same moment.
    pub fn validate(&self, selection: &TrackSelection) -> Result<(), ControlError> {
        let wanted = selection.catalog_entry();
        if self.entries()?.iter().any(|entry| *entry == wanted) {
            Ok(())
        } else {
            Err(ControlError::Validation(format!(
                "unknown track selection: {wanted}"
            )))
        }
    }
}

fn subdirectories(dir: &Path) -> Result<Vec<(String, PathBuf)>, ControlError> {
    let reader = fs::read_dir(dir).map_err(|e| {
        ControlError::operation_with(format!("failed to enumerate {}", dir.display()), e)
    })?;

    let mut found = Vec::new();
    for entry in reader {
        let entry = entry.map_err(|e| {
            ControlError::operation_with(format!("failed to enumerate {}", dir.display()), e)
        })?;
        let path = entry.path();
        if path.is_dir() {
            found.push((entry.file_name().to_string_lossy().into_owned(), path));
        }
    }
    Ok(found)
}
