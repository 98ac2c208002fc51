//! Tree scanning with glob include/exclude rules.
//!
//! Both trees are enumerated the same way: walk the root, match each file's
//! root-relative path against the include set, drop anything the exclude set
//! matches. Exclude wins. Results are sorted so downstream stages see a
//! deterministic order.

use anyhow::{bail, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Include/exclude patterns for scanning a source tree of documents.
///
/// Files under `tmp/` and `temp/` are scratch space, and base names starting
/// with `_` mark drafts that are never converted.
pub fn source_patterns(doc_ext: &str) -> (Vec<String>, Vec<String>) {
    (
        vec![format!("**/*.{doc_ext}")],
        vec![
            "tmp/*".to_string(),
            "temp/*".to_string(),
            format!("**/_*.{doc_ext}"),
        ],
    )
}

/// Include/exclude patterns for scanning a destination tree of artifacts.
///
/// The aggregate index is excluded so it never diffs against itself.
pub fn destination_patterns(artifact_ext: &str) -> (Vec<String>, Vec<String>) {
    (
        vec![format!("**/*.{artifact_ext}")],
        vec![
            "tmp/*".to_string(),
            "temp/*".to_string(),
            format!("index.{artifact_ext}"),
        ],
    )
}

/// List all files under `root` matching the include globs and not matching
/// the exclude globs, as full paths in deterministic (sorted) order.
///
/// With `create_missing`, an absent root is created and yields an empty list
/// (destination trees legitimately start empty); otherwise an absent root is
/// an error.
pub fn scan_tree(
    root: &Path,
    include_globs: &[String],
    exclude_globs: &[String],
    create_missing: bool,
) -> Result<Vec<PathBuf>> {
    if !root.exists() {
        if !create_missing {
            bail!("scan root does not exist: {}", root.display());
        }
        debug!(root = %root.display(), "creating missing scan root");
        std::fs::create_dir_all(root)?;
    }

    let include_set = build_globset(include_globs)?;
    let exclude_set = build_globset(exclude_globs)?;

    let mut files = Vec::new();

    for entry in WalkDir::new(root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);

        if exclude_set.is_match(relative) {
            continue;
        }
        if !include_set.is_match(relative) {
            continue;
        }

        files.push(path.to_path_buf());
    }

    // Sort for deterministic ordering
    files.sort();

    Ok(files)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}
