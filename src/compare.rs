//! Comparison model building and source/destination diffing.
//!
//! The diff classifies every comparison key as Added, Deleted, or
//! Confirming by set comparison. "Confirming" means the destination artifact
//! might already be up to date; that question is settled later by hashing,
//! not here.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::models::{ComparisonRecord, ConversionTask, TaskStatus};

/// Map a flat file list into comparison records keyed by
/// `(relative_dir, base_name)`.
pub fn build_records(paths: &[PathBuf], root: &Path) -> Result<Vec<ComparisonRecord>> {
    let mut records = Vec::with_capacity(paths.len());
    for path in paths {
        let relative = path
            .strip_prefix(root)
            .with_context(|| format!("{} is not under {}", path.display(), root.display()))?;
        let relative_dir = relative.parent().unwrap_or(Path::new("")).to_path_buf();
        let base_name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        records.push(ComparisonRecord {
            full_path: path.clone(),
            root_dir: root.to_path_buf(),
            relative_dir,
            base_name,
        });
    }
    Ok(records)
}

/// Diff destination records against source records into conversion tasks.
///
/// Keys only in the destination become `Deleted`, keys only in the source
/// become `Added`, keys in both become `Confirming`. A `Confirming` match
/// whose source was last modified strictly before `changed_since` generates
/// no task at all: the run simply does not look at it.
pub fn diff(
    current: &[ComparisonRecord],
    updated: &[ComparisonRecord],
    output_root: &Path,
    changed_since: Option<DateTime<Utc>>,
) -> Result<Vec<ConversionTask>> {
    let source_keys: HashSet<_> = updated.iter().map(|r| r.key()).collect();
    let dest_keys: HashSet<_> = current.iter().map(|r| r.key()).collect();

    let mut tasks = Vec::new();

    for record in current {
        if !source_keys.contains(&record.key()) {
            tasks.push(ConversionTask {
                base_name: record.base_name.clone(),
                relative_dir: record.relative_dir.clone(),
                output_root: output_root.to_path_buf(),
                status: TaskStatus::Deleted,
                source_path: None,
            });
        }
    }

    for record in updated {
        let status = if dest_keys.contains(&record.key()) {
            if let Some(cutoff) = changed_since {
                if modified_at(&record.full_path)? < cutoff {
                    continue;
                }
            }
            TaskStatus::Confirming
        } else {
            TaskStatus::Added
        };

        tasks.push(ConversionTask {
            base_name: record.base_name.clone(),
            relative_dir: record.relative_dir.clone(),
            output_root: output_root.to_path_buf(),
            status,
            source_path: Some(record.full_path.clone()),
        });
    }

    Ok(tasks)
}

fn modified_at(path: &Path) -> Result<DateTime<Utc>> {
    let modified = std::fs::metadata(path)
        .and_then(|m| m.modified())
        .with_context(|| format!("cannot stat {}", path.display()))?;
    Ok(modified.into())
}
