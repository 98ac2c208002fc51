//! Deletion sweep: remove artifacts whose source document is gone.
//!
//! After deleting an artifact, its parent directory is removed if it ended
//! up completely empty. Pruning stops there: a chain of now-empty ancestor
//! directories above the immediate parent is left untouched.

use anyhow::Result;
use std::fs;
use tracing::debug;

use crate::models::{ConversionTask, TaskStatus};

/// Delete the destination artifacts for all `Deleted` tasks. Returns the
/// number of artifacts removed.
pub fn sweep(tasks: &[ConversionTask], artifact_ext: &str) -> Result<u64> {
    let mut removed = 0u64;

    for task in tasks {
        if task.status != TaskStatus::Deleted {
            continue;
        }

        let path = task.artifact_path(artifact_ext);
        debug!(path = %path.display(), "delete artifact");
        fs::remove_file(&path)?;
        removed += 1;

        if let Some(parent) = path.parent() {
            if fs::read_dir(parent)?.next().is_none() {
                debug!(path = %parent.display(), "prune empty directory");
                fs::remove_dir(parent)?;
            }
        }
    }

    Ok(removed)
}
