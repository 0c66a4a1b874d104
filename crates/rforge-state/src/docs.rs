//! Low-level JSON document store.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::StateResult;

/// Directory-backed JSON document store with atomic writes.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    root: PathBuf,
}

impl DocumentStore {
    /// Open (and create) a document store rooted at `root`.
    pub async fn open(root: impl Into<PathBuf>) -> StateResult<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn doc_path(&self, collection: &str, id: &str) -> PathBuf {
        self.root.join(collection).join(format!("{id}.json"))
    }

    /// Write a document atomically: serialize to a temp file in the same
    /// directory, then rename over the destination.
    pub async fn put<T: Serialize>(&self, collection: &str, id: &str, doc: &T) -> StateResult<()> {
        let dest = self.doc_path(collection, id);
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = dest.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(doc)?;
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &dest).await?;
        debug!(collection, id, "wrote document");
        Ok(())
    }

    /// Read a document; `Ok(None)` when it does not exist.
    pub async fn get<T: DeserializeOwned>(
        &self,
        collection: &str,
        id: &str,
    ) -> StateResult<Option<T>> {
        let path = self.doc_path(collection, id);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    /// Read every document in a collection. Unparseable files are skipped;
    /// a half-written record must never wedge the worker's resume scan.
    pub async fn list<T: DeserializeOwned>(&self, collection: &str) -> StateResult<Vec<T>> {
        let dir = self.root.join(collection);
        let mut docs = Vec::new();

        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(docs),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let bytes = tokio::fs::read(&path).await?;
            match serde_json::from_slice(&bytes) {
                Ok(doc) => docs.push(doc),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable document");
                }
            }
        }
        Ok(docs)
    }

    /// Delete a document if it exists.
    pub async fn delete(&self, collection: &str, id: &str) -> StateResult<()> {
        match tokio::fs::remove_file(self.doc_path(collection, id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
