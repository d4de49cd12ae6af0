use std::{
    fs,
    path::PathBuf,
    time::Duration,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::fs as async_fs;
use uuid::Uuid;

use crate::models::errors::AppError;

/// Fixed TTL applied to enveloped entries: 24 hours.
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Stored record: the caller's value wrapped with an absolute expiry.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    value: Value,
    expires_at: DateTime<Utc>,
}

/// File-backed key/value store that wraps every value in an expiry envelope.
///
/// One JSON file per key under the storage directory. Reads of foreign or
/// legacy content that doesn't parse as an envelope fall back to returning
/// the raw stored JSON unchanged; expired entries are deleted on read.
#[derive(Debug, Clone)]
pub struct ExpiringStore {
    dir: PathBuf,
    ttl: Duration,
}

impl ExpiringStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, AppError> {
        Self::with_ttl(dir, DEFAULT_TTL)
    }

    pub fn with_ttl(dir: impl Into<PathBuf>, ttl: Duration) -> Result<Self, AppError> {
        let dir = dir.into();

        if !dir.exists() {
            fs::create_dir_all(&dir).map_err(|e| {
                AppError::storage_failed(format!("Failed to create storage directory: {}", e))
            })?;
        }

        Ok(Self { dir, ttl })
    }

    /// Wraps `value` in an envelope expiring `ttl` from now and writes it.
    pub async fn set(&self, key: &str, value: Value) -> Result<(), AppError> {
        let envelope = Envelope {
            value,
            expires_at: Utc::now() + chrono::Duration::milliseconds(self.ttl.as_millis() as i64),
        };
        let bytes = serde_json::to_vec(&envelope)
            .map_err(|e| AppError::storage_failed(format!("Failed to serialize entry: {}", e)))?;

        self.write_atomic(key, &bytes).await
    }

    /// Writes the bare value with no envelope and no TTL. Entries written this
    /// way read back through the legacy passthrough in [`get`](Self::get).
    pub async fn set_raw(&self, key: &str, value: &Value) -> Result<(), AppError> {
        let bytes = serde_json::to_vec(value)
            .map_err(|e| AppError::storage_failed(format!("Failed to serialize entry: {}", e)))?;

        self.write_atomic(key, &bytes).await
    }

    /// Reads a key. Expired entries are evicted and read as absent; content
    /// that isn't a valid envelope is returned as-is.
    pub async fn get(&self, key: &str) -> Result<Option<Value>, AppError> {
        let path = self.entry_path(key);

        let bytes = match async_fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(AppError::storage_failed(format!(
                    "Failed to read entry '{}': {}",
                    key, e
                )))
            }
        };

        let envelope: Envelope = match serde_json::from_slice(&bytes) {
            Ok(envelope) => envelope,
            // Legacy/foreign content: hand back whatever is stored.
            Err(_) => {
                let raw = serde_json::from_slice::<Value>(&bytes)
                    .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
                return Ok(Some(raw));
            }
        };

        if Utc::now() >= envelope.expires_at {
            tracing::debug!("Evicting expired entry '{}'", key);
            self.remove(key).await?;
            return Ok(None);
        }

        Ok(Some(envelope.value))
    }

    /// Deletes a key unconditionally. Missing entries are not an error.
    pub async fn remove(&self, key: &str) -> Result<(), AppError> {
        let path = self.entry_path(key);

        match async_fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::storage_failed(format!(
                "Failed to delete entry '{}': {}",
                key, e
            ))),
        }
    }

    async fn write_atomic(&self, key: &str, bytes: &[u8]) -> Result<(), AppError> {
        let path = self.entry_path(key);
        let tmp = self.dir.join(format!(".{}.tmp", Uuid::new_v4()));

        async_fs::write(&tmp, bytes).await.map_err(|e| {
            AppError::storage_failed(format!("Failed to write entry '{}': {}", key, e))
        })?;
        async_fs::rename(&tmp, &path).await.map_err(|e| {
            AppError::storage_failed(format!("Failed to commit entry '{}': {}", key, e))
        })?;

        tracing::debug!("Persisted entry '{}'", key);
        Ok(())
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", safe))
    }
}
