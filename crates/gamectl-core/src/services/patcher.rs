//! Track selection patching of the generated server configuration file.
//!
//! The file format is unversioned, line-oriented text where mutable keys
//! are identified by a fixed tag prefix. Only the two recognized tag
//! lines are rewritten; every other byte is preserved as read, including
//! line endings.

use std::fs;
use std::path::PathBuf;

use tracing::{debug, warn};

use crate::domain::TrackSelection;
use crate::ports::ControlError;

/// Tag prefix of the track line.
pub const TRACK_TAG: &str = "TRACK=";
/// Tag prefix of the track variant line.
pub const VARIANT_TAG: &str = "CONFIG_TRACK=";

/// Rewrites the two tagged lines of the server configuration file.
pub struct ConfigPatcher {
    config_file: PathBuf,
}

impl ConfigPatcher {
    /// Create a patcher over the given configuration file.
    pub fn new(config_file: impl Into<PathBuf>) -> Self {
        Self {
            config_file: config_file.into(),
        }
    }

    /// Patch the configuration file for the given selection.
    ///
    /// Scans from the top, replacing the first track-tag line with
    /// `TRACK=<track>` and the first variant-tag line with
    /// `CONFIG_TRACK=<variant or empty>`. The file is written back only
    /// when BOTH tags were found; with a single tag present nothing is
    /// written at all. That partial-match no-write is inherited behavior,
    /// kept as-is pending a product decision.
    pub fn apply(&self, selection: &TrackSelection) -> Result<(), ControlError> {
        let text = fs::read_to_string(&self.config_file).map_err(|e| {
            ControlError::operation_with(
                format!(
                    "failed to read server configuration {}",
                    self.config_file.display()
                ),
                e,
            )
        })?;

        let mut track_done = false;
        let mut variant_done = false;
        let mut patched = String::with_capacity(text.len() + 64);

        for line in text.split_inclusive('\n') {
            let (content, ending) = split_line_ending(line);
            if !track_done && content.starts_with(TRACK_TAG) {
                patched.push_str(TRACK_TAG);
                patched.push_str(&selection.track);
                patched.push_str(ending);
                track_done = true;
            } else if !variant_done && content.starts_with(VARIANT_TAG) {
                patched.push_str(VARIANT_TAG);
                if let Some(variant) = &selection.variant {
                    patched.push_str(variant);
                }
                patched.push_str(ending);
                variant_done = true;
            } else {
                patched.push_str(line);
            }
        }

        if track_done && variant_done {
            debug!(selection = %selection, "writing patched server configuration");
            fs::write(&self.config_file, patched).map_err(|e| {
                ControlError::operation_with(
                    format!(
                        "failed to write server configuration {}",
                        self.config_file.display()
                    ),
                    e,
                )
            })?;
        } else {
            warn!(
                track_found = track_done,
                variant_found = variant_done,
                "configuration tags incomplete, file left untouched"
            );
        }
        Ok(())
    }
}

fn split_line_ending(line: &str) -> (&str, &str) {
    if let Some(content) = line.strip_suffix("\r\n") {
        (content, "\r\n")
    } else if let Some(content) = line.strip_suffix('\n') {
        (content, "\n")
    } else {
        (line, "")
    }
}
