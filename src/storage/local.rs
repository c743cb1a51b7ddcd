//! Filesystem object store: `(container, key)` lives at `<root>/<container>/<key>`

use super::ObjectStore;
use crate::error::{PipelineError, Result};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Object store backed by a local directory tree
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    /// Create a store rooted at `root`; the directory is created on first write
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve an object path, rejecting names that escape the root
    fn object_path(&self, container: &str, key: &str) -> Result<PathBuf> {
        for part in [container, key] {
            let relative = Path::new(part);
            let escapes = part.is_empty()
                || relative
                    .components()
                    .any(|c| !matches!(c, Component::Normal(_)));
            if escapes {
                return Err(PipelineError::StorageAccess(format!(
                    "invalid object name {:?}",
                    part
                )));
            }
        }
        Ok(self.root.join(container).join(key))
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn get(&self, container: &str, key: &str) -> Result<Vec<u8>> {
        let path = self.object_path(container, key)?;
        debug!(path = %path.display(), "Reading object");
        tokio::fs::read(&path).await.map_err(|e| {
            PipelineError::StorageAccess(format!("read {}: {}", path.display(), e))
        })
    }

    async fn put(&self, container: &str, key: &str, bytes: Vec<u8>) -> Result<()> {
        let path = self.object_path(container, key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        debug!(path = %path.display(), bytes = bytes.len(), "Writing object");
        tokio::fs::write(&path, bytes).await.map_err(|e| {
            PipelineError::StorageAccess(format!("write {}: {}", path.display(), e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_round_trip_on_disk() {
        let dir = tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path());

        store.put("models", "forest.bin", vec![1, 2, 3]).await.unwrap();
        assert!(dir.path().join("models").join("forest.bin").exists());
        assert_eq!(store.get("models", "forest.bin").await.unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_nested_key() {
        let dir = tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path());
        store.put("data", "2024/raw.csv", b"a\n".to_vec()).await.unwrap();
        assert_eq!(store.get("data", "2024/raw.csv").await.unwrap(), b"a\n");
    }

    #[tokio::test]
    async fn test_missing_file_is_storage_error() {
        let dir = tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path());
        let err = store.get("models", "absent.bin").await.unwrap_err();
        assert!(matches!(err, PipelineError::StorageAccess(_)));
    }

    #[tokio::test]
    async fn test_rejects_parent_traversal() {
        let dir = tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path());
        assert!(store.get("..", "etc").await.is_err());
        assert!(store.put("models", "../escape", vec![]).await.is_err());
    }
}
