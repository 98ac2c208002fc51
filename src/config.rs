use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetryConfig {
    /// Total attempts per I/O operation, including the first one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base backoff in milliseconds; doubles on every retry.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
        }
    }
}

fn default_max_attempts() -> u32 {
    5
}
fn default_backoff_base_ms() -> u64 {
    2000
}

impl RetryConfig {
    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SyncConfig {
    /// Worker pool size for the conversion and index fan-outs.
    /// 0 means auto: 75% of logical cores, rounded up, at least 1.
    #[serde(default)]
    pub workers: usize,
    #[serde(default = "default_doc_ext")]
    pub doc_ext: String,
    #[serde(default = "default_artifact_ext")]
    pub artifact_ext: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            doc_ext: default_doc_ext(),
            artifact_ext: default_artifact_ext(),
        }
    }
}

fn default_doc_ext() -> String {
    "md".to_string()
}
fn default_artifact_ext() -> String {
    "json".to_string()
}

impl SyncConfig {
    /// Effective worker pool size for parallel fan-outs.
    pub fn effective_workers(&self) -> usize {
        if self.workers > 0 {
            return self.workers;
        }
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        ((cores as f64 * 0.75).ceil() as usize).max(1)
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.retry.max_attempts == 0 {
        anyhow::bail!("retry.max_attempts must be >= 1");
    }

    if config.sync.doc_ext.is_empty() || config.sync.artifact_ext.is_empty() {
        anyhow::bail!("sync.doc_ext and sync.artifact_ext must be non-empty");
    }

    if config.sync.doc_ext == config.sync.artifact_ext {
        anyhow::bail!("sync.doc_ext and sync.artifact_ext must differ");
    }

    Ok(config)
}
