//! Content store: retried filesystem access for documents and artifacts.
//!
//! Reads and writes go through the [`RetryPolicy`] so a momentarily locked
//! file does not kill a run. Writes create missing parent directories, which
//! is what lets the destination tree mirror new source subdirectories.

use anyhow::Result;
use sha2::{Digest, Sha256};
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::retry::RetryPolicy;

#[derive(Debug, Clone)]
pub struct ContentStore {
    policy: RetryPolicy,
}

impl ContentStore {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// Read a file to a UTF-8 string, retrying transient failures.
    pub async fn read_to_string(&self, path: &Path, token: &CancellationToken) -> Result<String> {
        debug!(path = %path.display(), "read file");
        self.policy
            .run(token, || tokio::fs::read_to_string(path))
            .await
    }

    /// Write a file, creating missing parent directories, retrying transient
    /// failures.
    pub async fn write(&self, path: &Path, text: &str, token: &CancellationToken) -> Result<()> {
        debug!(path = %path.display(), "write file");
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        self.policy.run(token, || tokio::fs::write(path, text)).await
    }
}

/// SHA-256 of the text, lowercase hex. Used to gate redundant writes.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryConfig;
    use tempfile::TempDir;

    fn store() -> ContentStore {
        ContentStore::new(RetryPolicy::new(&RetryConfig {
            max_attempts: 1,
            backoff_base_ms: 0,
        }))
    }

    #[tokio::test]
    async fn test_write_creates_parent_dirs() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a/b/c.json");
        let token = CancellationToken::new();

        store().write(&path, "{}", &token).await.unwrap();
        assert_eq!(store().read_to_string(&path, &token).await.unwrap(), "{}");
    }

    #[tokio::test]
    async fn test_read_missing_file_errors() {
        let tmp = TempDir::new().unwrap();
        let token = CancellationToken::new();
        let result = store()
            .read_to_string(&tmp.path().join("missing.md"), &token)
            .await;
        assert!(result.is_err());
    }

    #[test]
    fn test_content_hash_is_stable_and_sensitive() {
        assert_eq!(content_hash("abc"), content_hash("abc"));
        assert_ne!(content_hash("abc"), content_hash("abd"));
    }
}
