//! Pure domain types, independent of any infrastructure concern.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A requested track, with an optional track variant.
///
/// Used only by the track-selecting server kind. Validity is decided by
/// the live [`TrackCatalog`](crate::services::TrackCatalog), never here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackSelection {
    /// Name of the track. Must match a track directory exactly.
    pub track: String,
    /// Optional variant of the track.
    #[serde(default)]
    pub variant: Option<String>,
}

impl TrackSelection {
    /// Create a new selection.
    #[must_use]
    pub fn new(track: impl Into<String>, variant: Option<String>) -> Self {
        Self {
            track: track.into(),
            variant,
        }
    }

    /// The catalog entry string this selection must match:
    /// `"<track>"` without a variant, `"<track> <variant>"` with one.
    #[must_use]
    pub fn catalog_entry(&self) -> String {
        match &self.variant {
            Some(variant) => format!("{} {}", self.track, variant),
            None => self.track.clone(),
        }
    }
}

impl fmt::Display for TrackSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.catalog_entry())
    }
}
