//! Synchronization orchestration.
//!
//! One linear pass: validate → scan both trees → diff → sweep deletions →
//! confirm/update → add → optional index rebuild. Each stage is fail-fast
//! and nothing is rolled back; the destination tree is only guaranteed
//! consistent with the source after a run that completes.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::compare;
use crate::config::Config;
use crate::index::{self, IndexOutcome};
use crate::models::TaskStatus;
use crate::pipeline::ConvertWorker;
use crate::retry::{Cancelled, RetryPolicy};
use crate::scan;
use crate::store::ContentStore;
use crate::sweep;

/// Run one synchronization pass.
///
/// `source` may be a single document or a directory. Without `index_root`
/// the aggregate rebuild is skipped. `changed_since` narrows the run: a
/// source document already present in the destination and last modified
/// before that instant is treated as up to date without being read.
pub async fn run_sync(
    config: &Config,
    source: &Path,
    output_root: &Path,
    index_root: Option<&Path>,
    changed_since: Option<DateTime<Utc>>,
    token: &CancellationToken,
) -> Result<()> {
    let store = Arc::new(ContentStore::new(RetryPolicy::new(&config.retry)));
    let workers = config.sync.effective_workers();
    let doc_ext = &config.sync.doc_ext;
    let artifact_ext = &config.sync.artifact_ext;

    // Scan source
    let (source_root, source_files) = list_source(source, doc_ext)?;
    info!(source = %source.display(), files = source_files.len(), "scanned source");

    // Scan destination (created when missing: first runs start empty)
    let (include, exclude) = scan::destination_patterns(artifact_ext);
    let dest_files = scan::scan_tree(output_root, &include, &exclude, true)?;
    info!(destination = %output_root.display(), files = dest_files.len(), "scanned destination");

    if source_files.is_empty() && dest_files.is_empty() {
        println!("sync {}", source.display());
        println!("  nothing to convert");
        println!("ok");
        return Ok(());
    }

    // Diff
    let current = compare::build_records(&dest_files, output_root)?;
    let updated = compare::build_records(&source_files, &source_root)?;
    let tasks = compare::diff(&current, &updated, output_root, changed_since)?;

    let batch = |status: TaskStatus| {
        tasks
            .iter()
            .filter(|t| t.status == status)
            .cloned()
            .collect::<Vec<_>>()
    };

    // Sweep deletions first so the destination never holds artifacts for
    // documents that no longer exist.
    let deleted = sweep::sweep(&batch(TaskStatus::Deleted), artifact_ext)?;

    // Confirm/update, then add
    let worker = ConvertWorker::new(store.clone(), artifact_ext, workers);
    let confirm_stats = worker.process(batch(TaskStatus::Confirming), token).await?;
    let add_stats = worker.process(batch(TaskStatus::Added), token).await?;
    let cancelled = confirm_stats.cancelled || add_stats.cancelled;

    // Optional index rebuild over the post-sweep, post-update state
    let mut index_outcome = None;
    if let Some(index_root) = index_root {
        if cancelled {
            info!("skipping index rebuild after cancellation");
        } else {
            match index::rebuild(store, output_root, index_root, artifact_ext, workers, token)
                .await
            {
                Ok(outcome) => index_outcome = Some(outcome),
                Err(err) if err.is::<Cancelled>() => {
                    info!("index rebuild cancelled");
                }
                Err(err) => return Err(err),
            }
        }
    }

    println!("sync {}", source.display());
    println!("  added: {}", add_stats.written);
    println!("  updated: {}", confirm_stats.written);
    println!("  unchanged: {}", confirm_stats.unchanged);
    println!("  skipped (no header): {}", add_stats.skipped + confirm_stats.skipped);
    println!("  deleted: {}", deleted);
    if let Some(outcome) = index_outcome {
        let label = match outcome {
            IndexOutcome::Written => "written",
            IndexOutcome::Unchanged => "unchanged",
            IndexOutcome::Empty => "empty",
        };
        println!("  index: {label}");
    }
    println!("{}", if cancelled { "cancelled" } else { "ok" });

    Ok(())
}

/// Resolve the source argument into a scan root and file list.
///
/// A single document stands alone with its parent as the root, so its
/// comparison key lands directly under the output root.
fn list_source(source: &Path, doc_ext: &str) -> Result<(PathBuf, Vec<PathBuf>)> {
    if source.is_file() {
        let root = source
            .parent()
            .with_context(|| format!("no parent directory for {}", source.display()))?
            .to_path_buf();
        return Ok((root, vec![source.to_path_buf()]));
    }

    if source.is_dir() {
        let (include, exclude) = scan::source_patterns(doc_ext);
        let files = scan::scan_tree(source, &include, &exclude, false)?;
        return Ok((source.to_path_buf(), files));
    }

    bail!("source path does not exist: {}", source.display());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_full_cycle_add_update_delete() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        let out = tmp.path().join("out");
        fs::create_dir_all(src.join("guides")).unwrap();
        fs::write(src.join("a.md"), "---\ntitle: A\n---\nalpha").unwrap();
        fs::write(src.join("guides/b.md"), "---\ntitle: B\n---\nbeta").unwrap();

        let config = Config::default();
        let token = CancellationToken::new();

        run_sync(&config, &src, &out, None, None, &token)
            .await
            .unwrap();
        assert!(out.join("a.json").exists());
        assert!(out.join("guides/b.json").exists());

        // Remove one source; its artifact and emptied directory must go.
        fs::remove_file(src.join("guides/b.md")).unwrap();
        run_sync(&config, &src, &out, None, None, &token)
            .await
            .unwrap();
        assert!(out.join("a.json").exists());
        assert!(!out.join("guides").exists());
    }

    #[tokio::test]
    async fn test_missing_source_is_usage_error() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("out");
        let result = run_sync(
            &Config::default(),
            &tmp.path().join("nope"),
            &out,
            None,
            None,
            &CancellationToken::new(),
        )
        .await;
        assert!(result.is_err());
        // Validation happens before destination-root creation.
        assert!(!out.exists());
    }

    #[tokio::test]
    async fn test_single_file_source() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        let out = tmp.path().join("out");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("solo.md"), "---\ntitle: S\n---\nbody").unwrap();

        run_sync(
            &Config::default(),
            &src.join("solo.md"),
            &out,
            None,
            None,
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        assert!(out.join("solo.json").exists());
    }

    #[tokio::test]
    async fn test_sweep_emptying_destination_root_still_reindexes() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        let out = tmp.path().join("out");
        let idx = tmp.path().join("idx");
        fs::create_dir_all(&src).unwrap();
        fs::create_dir_all(&out).unwrap();
        fs::write(out.join("a.json"), "{}").unwrap();

        // Sweeping the last root-level artifact prunes the destination root
        // itself; the index rebuild must recreate it and report empty
        // instead of failing.
        run_sync(
            &Config::default(),
            &src,
            &out,
            Some(idx.as_path()),
            None,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert!(out.is_dir());
        assert!(!out.join("a.json").exists());
        assert!(!idx.join("index.json").exists());
    }

    #[tokio::test]
    async fn test_index_rebuild_wired_in() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        let out = tmp.path().join("out");
        let idx = tmp.path().join("idx");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("a.md"), "---\ntitle: A\n---\nalpha").unwrap();

        run_sync(
            &Config::default(),
            &src,
            &out,
            Some(idx.as_path()),
            None,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        let index: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(idx.join("index.json")).unwrap()).unwrap();
        assert_eq!(index.as_array().unwrap().len(), 1);
        assert_eq!(index[0]["reference"], "a");
    }
}
