//! Aggregate index rebuild.
//!
//! The index is one artifact summarizing every current destination artifact
//! as ordered `(reference, content)` pairs. Reads fan out onto the worker
//! pool and join before the deterministic sort, so the serialized aggregate
//! is byte-identical across runs whenever the underlying artifacts are.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::compare;
use crate::convert::{self, IndexEntry};
use crate::retry::Cancelled;
use crate::scan;
use crate::store::{self, ContentStore};

/// Result of an index rebuild, for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOutcome {
    Written,
    Unchanged,
    /// No destination artifacts exist; no aggregate is created.
    Empty,
}

/// Rebuild `<index_root>/index.<ext>` from the current destination tree.
pub async fn rebuild(
    store: Arc<ContentStore>,
    destination_root: &Path,
    index_root: &Path,
    artifact_ext: &str,
    workers: usize,
    token: &CancellationToken,
) -> Result<IndexOutcome> {
    let index_path = index_root.join(format!("index.{artifact_ext}"));
    info!(path = %index_path.display(), "rebuilding aggregate index");

    // The sweep may have pruned the destination root itself when its last
    // root-level artifact went away; recreate it rather than fail.
    let (include, exclude) = scan::destination_patterns(artifact_ext);
    let artifacts = scan::scan_tree(destination_root, &include, &exclude, true)?;
    if artifacts.is_empty() {
        warn!(
            root = %destination_root.display(),
            "no artifacts to index, skipping aggregate"
        );
        return Ok(IndexOutcome::Empty);
    }

    let records = compare::build_records(&artifacts, destination_root)?;

    // Parallel read; completion order is irrelevant because render_index
    // sorts by reference.
    let semaphore = Arc::new(Semaphore::new(workers.max(1)));
    let mut set = JoinSet::new();
    for record in records {
        if token.is_cancelled() {
            return Err(Cancelled.into());
        }

        let permit = semaphore
            .clone()
            .acquire_owned()
            .await
            .context("worker pool closed")?;
        let store = store.clone();
        let token = token.clone();

        set.spawn(async move {
            let _permit = permit;
            let content = store.read_to_string(&record.full_path, &token).await?;
            let reference = convert::doc_reference(&record.relative_dir, &record.base_name);
            anyhow::Ok(IndexEntry { reference, content })
        });
    }

    let mut entries = Vec::new();
    while let Some(joined) = set.join_next().await {
        entries.push(joined??);
    }

    let rendered = convert::render_index(entries)?;

    if index_path.exists() {
        let existing = store.read_to_string(&index_path, token).await?;
        if store::content_hash(&rendered) == store::content_hash(&existing) {
            info!("aggregate index unchanged, skipping write");
            return Ok(IndexOutcome::Unchanged);
        }
    }

    store.write(&index_path, &rendered, token).await?;
    Ok(IndexOutcome::Written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryConfig;
    use crate::retry::RetryPolicy;
    use std::fs;
    use tempfile::TempDir;

    fn test_store() -> Arc<ContentStore> {
        Arc::new(ContentStore::new(RetryPolicy::new(&RetryConfig {
            max_attempts: 1,
            backoff_base_ms: 0,
        })))
    }

    #[tokio::test]
    async fn test_rebuild_orders_by_reference() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("out");
        fs::create_dir_all(dest.join("z")).unwrap();
        fs::write(dest.join("z/late.json"), r#"{"t":1}"#).unwrap();
        fs::write(dest.join("early.json"), r#"{"t":2}"#).unwrap();

        let token = CancellationToken::new();
        let outcome = rebuild(test_store(), &dest, &dest, "json", 2, &token)
            .await
            .unwrap();
        assert_eq!(outcome, IndexOutcome::Written);

        let index: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dest.join("index.json")).unwrap()).unwrap();
        assert_eq!(index[0]["reference"], "early");
        assert_eq!(index[1]["reference"], "z/late");
        assert_eq!(index[1]["content"], r#"{"t":1}"#);
    }

    #[tokio::test]
    async fn test_rebuild_skips_unchanged_index() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("out");
        fs::create_dir_all(&dest).unwrap();
        fs::write(dest.join("a.json"), "{}").unwrap();

        let token = CancellationToken::new();
        let first = rebuild(test_store(), &dest, &dest, "json", 2, &token)
            .await
            .unwrap();
        assert_eq!(first, IndexOutcome::Written);

        let second = rebuild(test_store(), &dest, &dest, "json", 2, &token)
            .await
            .unwrap();
        assert_eq!(second, IndexOutcome::Unchanged);
    }

    #[tokio::test]
    async fn test_rebuild_empty_destination_creates_nothing() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("out");
        fs::create_dir_all(&dest).unwrap();

        let token = CancellationToken::new();
        let outcome = rebuild(test_store(), &dest, &dest, "json", 2, &token)
            .await
            .unwrap();
        assert_eq!(outcome, IndexOutcome::Empty);
        assert!(!dest.join("index.json").exists());
    }

    #[tokio::test]
    async fn test_rebuild_recreates_missing_destination_root() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("out");

        let token = CancellationToken::new();
        let outcome = rebuild(test_store(), &dest, &dest, "json", 2, &token)
            .await
            .unwrap();
        assert_eq!(outcome, IndexOutcome::Empty);
        assert!(dest.is_dir());
        assert!(!dest.join("index.json").exists());
    }

    #[tokio::test]
    async fn test_rebuild_deterministic_bytes() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("out");
        fs::create_dir_all(&dest).unwrap();
        for name in ["d", "a", "c", "b"] {
            fs::write(dest.join(format!("{name}.json")), format!("{{\"n\":\"{name}\"}}")).unwrap();
        }

        let token = CancellationToken::new();
        rebuild(test_store(), &dest, &dest, "json", 4, &token)
            .await
            .unwrap();
        let first = fs::read_to_string(dest.join("index.json")).unwrap();

        fs::remove_file(dest.join("index.json")).unwrap();
        rebuild(test_store(), &dest, &dest, "json", 1, &token)
            .await
            .unwrap();
        let second = fs::read_to_string(dest.join("index.json")).unwrap();

        assert_eq!(first, second);
    }
}
