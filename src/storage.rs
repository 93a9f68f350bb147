//! Asset store adapter.
//!
//! Binary objects (avatars, project images, screenshots, blog inline
//! images) live on disk under a single root directory and are served
//! publicly under a base URL prefix. Keys are collision-resistant:
//! `"{prefix}/{unix-millis}-{sanitized-name}"`, so a replace never
//! overwrites the object it replaces.

use std::path::{Path, PathBuf};

use chrono::Utc;
use once_cell::sync::Lazy;

/// Process-wide store configured from the environment, mirroring how the
/// database pool is owned globally.
pub static ASSET_STORE: Lazy<AssetStore> = Lazy::new(AssetStore::from_env);

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("failed to write object: {0}")]
    Write(#[source] std::io::Error),

    #[error("failed to delete object: {0}")]
    Delete(#[source] std::io::Error),

    #[error("invalid object path")]
    InvalidPath,
}

/// A stored object: its key within the store and its public URL.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct StoredAsset {
    pub path: String,
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct AssetStore {
    root: PathBuf,
    public_base: String,
}

/// Keep only characters that are safe in an object key segment.
pub fn sanitize_segment(s: &str) -> String {
    let cleaned: String = s
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect();
    let trimmed = cleaned.trim_matches('-');
    if trimmed.is_empty() {
        "asset".to_string()
    } else {
        trimmed.to_string()
    }
}

impl AssetStore {
    pub fn new(root: impl Into<PathBuf>, public_base: impl Into<String>) -> Self {
        let public_base = public_base.into();
        Self {
            root: root.into(),
            public_base: public_base.trim_end_matches('/').to_string(),
        }
    }

    /// Root and public base from ASSET_DIR / ASSET_BASE_URL env vars,
    /// defaulting to `uploads` served at `/uploads`.
    pub fn from_env() -> Self {
        let root = std::env::var("ASSET_DIR").unwrap_or_else(|_| "uploads".to_string());
        let base = std::env::var("ASSET_BASE_URL").unwrap_or_else(|_| "/uploads".to_string());
        Self::new(root, base)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.public_base, path)
    }

    /// Resolve a path-or-URL reference to an object key owned by this
    /// store. Foreign references (e.g. an externally hosted screenshot
    /// URL that was never imported) resolve to `None`.
    fn owned_key(&self, reference: &str) -> Option<String> {
        let key = if let Some(rest) = reference.strip_prefix(&format!("{}/", self.public_base)) {
            rest
        } else if reference.contains("://") || reference.starts_with('/') {
            return None;
        } else {
            reference
        };

        if key.is_empty() {
            return None;
        }
        Some(key.to_string())
    }

    /// Reject traversal and absolute components before touching disk.
    fn safe_disk_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        if key
            .split('/')
            .any(|seg| seg.is_empty() || seg == "." || seg == ".." || seg.contains('\\'))
        {
            return Err(StorageError::InvalidPath);
        }
        Ok(self.root.join(key))
    }

    /// Store `bytes` under a fresh key derived from `path_hint`
    /// (`"projects/photo.png"` becomes `"projects/{millis}-photo.png"`)
    /// and return the durable path and public URL.
    pub async fn upload(&self, path_hint: &str, bytes: &[u8]) -> Result<StoredAsset, StorageError> {
        let (prefix, name) = match path_hint.rsplit_once('/') {
            Some((p, n)) => (sanitize_segment(p), sanitize_segment(n)),
            None => ("misc".to_string(), sanitize_segment(path_hint)),
        };

        let key = format!("{}/{}-{}", prefix, Utc::now().timestamp_millis(), name);
        let disk_path = self.safe_disk_path(&key)?;

        if let Some(parent) = disk_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(StorageError::Write)?;
        }
        tokio::fs::write(&disk_path, bytes)
            .await
            .map_err(StorageError::Write)?;

        tracing::info!("asset stored: {} ({} bytes)", key, bytes.len());

        Ok(StoredAsset {
            url: self.url_for(&key),
            path: key,
        })
    }

    /// Delete an object by path or public URL. References this store does
    /// not own, and objects already gone, are no-ops returning
    /// `Ok(false)`. Returns `Ok(true)` when an object was removed.
    pub async fn delete(&self, path_or_url: &str) -> Result<bool, StorageError> {
        let key = match self.owned_key(path_or_url) {
            Some(k) => k,
            None => {
                tracing::debug!("asset delete skipped, reference not owned: {}", path_or_url);
                return Ok(false);
            }
        };

        let disk_path = self.safe_disk_path(&key)?;
        match tokio::fs::remove_file(&disk_path).await {
            Ok(()) => {
                tracing::info!("asset deleted: {}", key);
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::Delete(e)),
        }
    }

    /// Best-effort delete for replace/cleanup flows. Failure is logged as
    /// a warning and otherwise swallowed; it must never block the primary
    /// operation that triggered the cleanup.
    pub async fn cleanup(&self, path_or_url: &str) {
        if path_or_url.is_empty() {
            return;
        }
        if let Err(e) = self.delete(path_or_url).await {
            tracing::warn!("old asset cleanup failed for {}: {}", path_or_url, e);
        }
    }
}
