//! Core data models used throughout mdpack.
//!
//! These types represent the per-run comparison and conversion state that
//! flows through the sync pipeline. All of them are transient: nothing here
//! is ever persisted between runs.

use std::path::{Path, PathBuf};

/// A file discovered under a tree root, keyed for source/destination matching.
///
/// Two records with the same `(relative_dir, base_name)` key are treated as
/// the same logical document regardless of which tree they came from.
#[derive(Debug, Clone)]
pub struct ComparisonRecord {
    pub full_path: PathBuf,
    pub root_dir: PathBuf,
    pub relative_dir: PathBuf,
    pub base_name: String,
}

impl ComparisonRecord {
    /// The comparison key: relative directory plus extension-less file name.
    pub fn key(&self) -> (&Path, &str) {
        (self.relative_dir.as_path(), self.base_name.as_str())
    }
}

/// Classification of a comparison key after diffing the two trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// Present only in the source tree: convert and write unconditionally.
    Added,
    /// Present only in the destination tree: remove the artifact.
    Deleted,
    /// Present in both trees: reconvert and write only if the hash changed.
    Confirming,
}

/// One unit of work produced by the diff engine.
#[derive(Debug, Clone)]
pub struct ConversionTask {
    pub base_name: String,
    pub relative_dir: PathBuf,
    pub output_root: PathBuf,
    pub status: TaskStatus,
    /// Path of the source document. `None` for `Deleted` tasks.
    pub source_path: Option<PathBuf>,
}

impl ConversionTask {
    /// Destination artifact path: `<output_root>/<relative_dir>/<base_name>.<ext>`.
    pub fn artifact_path(&self, artifact_ext: &str) -> PathBuf {
        self.output_root
            .join(&self.relative_dir)
            .join(format!("{}.{}", self.base_name, artifact_ext))
    }
}
