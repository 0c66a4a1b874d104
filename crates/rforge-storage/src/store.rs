//! Local filesystem store.

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{StorageError, StorageResult};

/// Filesystem-backed key→bytes store.
///
/// Keys are relative, `/`-separated paths under the store root. Path
/// traversal segments are rejected so a key can never escape the root.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    /// Open (and create) a store rooted at `root`.
    pub async fn open(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// The store root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn check_key(key: &str) -> StorageResult<()> {
        if key.is_empty()
            || key.starts_with('/')
            || key.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..")
        {
            return Err(StorageError::invalid_key(key));
        }
        Ok(())
    }

    /// Local path for a key. The file may not exist yet.
    pub fn local_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    /// Opaque URI for a key.
    pub fn uri(&self, key: &str) -> String {
        format!("file://{}", self.root.join(key).display())
    }

    /// Recover the key from a URI minted by this store.
    pub fn key_from_uri(&self, uri: &str) -> StorageResult<String> {
        let prefix = format!("file://{}/", self.root.display());
        uri.strip_prefix(&prefix)
            .map(str::to_string)
            .ok_or_else(|| StorageError::ForeignUri(uri.to_string()))
    }

    /// Whether an object exists.
    pub async fn exists(&self, key: &str) -> bool {
        Self::check_key(key).is_ok() && tokio::fs::try_exists(self.local_path(key)).await.unwrap_or(false)
    }

    /// Write bytes under a key, creating parent directories.
    pub async fn save_bytes(&self, key: &str, data: &[u8]) -> StorageResult<String> {
        Self::check_key(key)?;
        let dest = self.local_path(key);
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&dest, data).await?;
        debug!(key, bytes = data.len(), "saved object");
        Ok(self.uri(key))
    }

    /// Copy a local file under a key.
    pub async fn save_file(&self, key: &str, src: impl AsRef<Path>) -> StorageResult<String> {
        Self::check_key(key)?;
        let dest = self.local_path(key);
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::copy(src.as_ref(), &dest).await?;
        debug!(key, src = %src.as_ref().display(), "saved file");
        Ok(self.uri(key))
    }

    /// Read an object's bytes.
    pub async fn read_bytes(&self, key: &str) -> StorageResult<Vec<u8>> {
        Self::check_key(key)?;
        let path = self.local_path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::not_found(key))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Remove a whole key prefix (used when pruning a job's subtree).
    pub async fn remove_prefix(&self, prefix: &str) -> StorageResult<()> {
        Self::check_key(prefix)?;
        let path = self.local_path(prefix);
        match tokio::fs::remove_dir_all(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
