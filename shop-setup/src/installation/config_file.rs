//! Credential persistence into the shop config file.
//!
//! Goals:
//! - One key per write; unrelated keys, comments and key order are left as they were
//! - Each write is committed through a temp file + rename, so readers never see a torn file
//! - Transient I/O errors are retried a bounded number of times
//! - Secrets never reach the logs

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::time::{timeout, Duration};
use toml_edit::DocumentMut;

use crate::models::connection::CredentialKey;
use crate::security::crypto::secret_fingerprint;

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Write `value` under `key`, leaving every other entry as it was.
    async fn replace_placeholder(&self, key: CredentialKey, value: &str) -> Result<()>;
}

/// Credential store backed by the TOML config file.
///
/// The file must already exist (it ships with the installation package); the store never
/// creates it.
#[derive(Debug, Clone)]
pub struct TomlConfigFileDao {
    path: PathBuf,
}

impl TomlConfigFileDao {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_document(&self) -> Result<DocumentMut> {
        if !tokio::fs::try_exists(&self.path).await.unwrap_or(false) {
            anyhow::bail!("Config file not found: {:?}", self.path);
        }
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read config file: {:?}", self.path))?;
        content
            .parse::<DocumentMut>()
            .with_context(|| format!("Failed to parse config file as TOML: {:?}", self.path))
    }
}

#[async_trait]
impl CredentialStore for TomlConfigFileDao {
    async fn replace_placeholder(&self, key: CredentialKey, value: &str) -> Result<()> {
        let started = Instant::now();
        let mut doc = self.read_document().await?;
        set_string(&mut doc, key.as_str(), value);
        let rendered = doc.to_string();

        write_file_atomic(&self.path, rendered.as_bytes(), key.as_str()).await?;

        let shown = if key.is_secret() {
            secret_fingerprint(value)
        } else {
            value.to_string()
        };
        info!(
            "[PHASE: install] [STEP: persist_credentials] {} = {} written to {:?} (duration_ms={})",
            key,
            shown,
            self.path,
            started.elapsed().as_millis()
        );
        Ok(())
    }
}

// Replaces the value in place so its surrounding whitespace and trailing comment stay.
fn set_string(doc: &mut DocumentMut, key: &str, value: &str) {
    match doc.get_mut(key).and_then(|item| item.as_value_mut()) {
        Some(existing) => {
            let decor = existing.decor().clone();
            *existing = toml_edit::Value::from(value);
            *existing.decor_mut() = decor;
        }
        None => {
            doc.insert(key, toml_edit::value(value));
        }
    }
}

/// Write `bytes` to a sibling temp file and rename it over `path`, with retries.
pub async fn write_file_atomic(path: &Path, bytes: &[u8], label: &str) -> Result<()> {
    let file_name = path
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("Config path has no file name: {:?}", path))?
        .to_string_lossy()
        .to_string();
    let tmp = path.with_file_name(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4().simple()));

    let mut last_err: Option<anyhow::Error> = None;
    for attempt in 1..=3 {
        let started = Instant::now();
        match timeout(Duration::from_secs(10), tokio::fs::write(&tmp, bytes)).await {
            Ok(Ok(())) => match tokio::fs::rename(&tmp, path).await {
                Ok(()) => {
                    debug!(
                        "[PHASE: install] [STEP: fs] {} ok (attempt={}, path={:?}, bytes={}, duration_ms={})",
                        label,
                        attempt,
                        path,
                        bytes.len(),
                        started.elapsed().as_millis()
                    );
                    return Ok(());
                }
                Err(e) => {
                    warn!(
                        "[PHASE: install] [STEP: fs] {} rename failed (attempt={}, path={:?}, error={:?})",
                        label, attempt, path, e
                    );
                    last_err = Some(anyhow::anyhow!(e));
                }
            },
            Ok(Err(e)) => {
                warn!(
                    "[PHASE: install] [STEP: fs] {} failed (attempt={}, path={:?}, error={:?})",
                    label, attempt, tmp, e
                );
                last_err = Some(anyhow::anyhow!(e));
            }
            Err(_) => {
                warn!(
                    "[PHASE: install] [STEP: fs] {} timed out (attempt={}, path={:?})",
                    label, attempt, tmp
                );
                last_err = Some(anyhow::anyhow!("write timed out"));
            }
        }

        let backoff_ms = 50_u64.saturating_mul(1_u64 << ((attempt - 1) as u32));
        tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
    }

    let _ = tokio::fs::remove_file(&tmp).await;
    Err(last_err
        .unwrap_or_else(|| anyhow::anyhow!("Failed to write file"))
        .context(format!("Failed to write config file: {:?}", path)))
}
