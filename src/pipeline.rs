//! Bounded-parallel conversion of Added and Confirming tasks.
//!
//! Workers are drawn from a semaphore-bounded pool. Added tasks write their
//! artifact unconditionally; Confirming tasks hash the freshly converted
//! text against the existing artifact and write only on mismatch, which is
//! what makes a no-change rerun perform zero destination writes.

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::convert;
use crate::models::{ConversionTask, TaskStatus};
use crate::retry::Cancelled;
use crate::store::{self, ContentStore};

/// Outcome counters for one pipeline batch.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PipelineStats {
    /// Artifacts created or rewritten.
    pub written: u64,
    /// Confirming artifacts whose hash matched; nothing touched.
    pub unchanged: u64,
    /// Documents without a parseable header; no artifact produced.
    pub skipped: u64,
    /// True when the batch stopped early on cancellation.
    pub cancelled: bool,
}

enum Outcome {
    Written,
    Unchanged,
    Skipped,
}

#[derive(Clone)]
pub struct ConvertWorker {
    store: Arc<ContentStore>,
    artifact_ext: String,
    workers: usize,
}

impl ConvertWorker {
    pub fn new(store: Arc<ContentStore>, artifact_ext: &str, workers: usize) -> Self {
        Self {
            store,
            artifact_ext: artifact_ext.to_string(),
            workers: workers.max(1),
        }
    }

    /// Process one batch of Added or Confirming tasks.
    ///
    /// Cancellation stops dispatch and lets in-flight workers finish; the
    /// first fatal worker error aborts the whole batch. An arbitrary prefix
    /// of a cancelled or failed batch may therefore be applied.
    pub async fn process(
        &self,
        tasks: Vec<ConversionTask>,
        token: &CancellationToken,
    ) -> Result<PipelineStats> {
        let mut stats = PipelineStats::default();
        if tasks.is_empty() {
            return Ok(stats);
        }

        debug!(count = tasks.len(), workers = self.workers, "processing batch");

        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut set = JoinSet::new();

        for task in tasks {
            if token.is_cancelled() {
                stats.cancelled = true;
                break;
            }

            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .context("worker pool closed")?;
            let worker = self.clone();
            let token = token.clone();

            set.spawn(async move {
                let _permit = permit;
                worker.convert_one(&task, &token).await
            });
        }

        while let Some(joined) = set.join_next().await {
            match joined? {
                Ok(Outcome::Written) => stats.written += 1,
                Ok(Outcome::Unchanged) => stats.unchanged += 1,
                Ok(Outcome::Skipped) => stats.skipped += 1,
                Err(err) if err.is::<Cancelled>() => {
                    info!("conversion cancelled");
                    stats.cancelled = true;
                }
                Err(err) => return Err(err),
            }
        }

        Ok(stats)
    }

    async fn convert_one(&self, task: &ConversionTask, token: &CancellationToken) -> Result<Outcome> {
        if token.is_cancelled() {
            return Err(Cancelled.into());
        }

        let source = task
            .source_path
            .as_deref()
            .context("conversion task without a source path")?;

        let text = self.store.read_to_string(source, token).await?;

        let Some(artifact) = convert::document_to_artifact(&text)
            .with_context(|| format!("failed to convert {}", source.display()))?
        else {
            debug!(path = %source.display(), "no structured header, skipping");
            return Ok(Outcome::Skipped);
        };

        let artifact_path = task.artifact_path(&self.artifact_ext);

        match task.status {
            TaskStatus::Added => {
                self.store.write(&artifact_path, &artifact, token).await?;
                Ok(Outcome::Written)
            }
            TaskStatus::Confirming => {
                let new_hash = store::content_hash(&artifact);
                let existing = self.store.read_to_string(&artifact_path, token).await?;
                if new_hash == store::content_hash(&existing) {
                    debug!(path = %artifact_path.display(), "content unchanged, skipping write");
                    return Ok(Outcome::Unchanged);
                }
                self.store.write(&artifact_path, &artifact, token).await?;
                Ok(Outcome::Written)
            }
            TaskStatus::Deleted => {
                anyhow::bail!("deleted task reached the conversion pipeline")
            }
        }
    }
}
