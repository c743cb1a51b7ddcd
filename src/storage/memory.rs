//! In-memory object store.
//!
//! Objects are lost when the store is dropped.

use super::ObjectStore;
use crate::error::{PipelineError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// In-memory object store for tests
#[derive(Debug, Default)]
pub struct InMemoryObjectStore {
    objects: RwLock<HashMap<(String, String), Vec<u8>>>,
}

impl InMemoryObjectStore {
    /// Create a new, empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    /// Whether nothing has been stored
    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }

    /// Whether an object exists under `(container, key)`
    pub async fn contains(&self, container: &str, key: &str) -> bool {
        self.objects
            .read()
            .await
            .contains_key(&(container.to_string(), key.to_string()))
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn get(&self, container: &str, key: &str) -> Result<Vec<u8>> {
        self.objects
            .read()
            .await
            .get(&(container.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| {
                PipelineError::StorageAccess(format!("object {}/{} not found", container, key))
            })
    }

    async fn put(&self, container: &str, key: &str, bytes: Vec<u8>) -> Result<()> {
        self.objects
            .write()
            .await
            .insert((container.to_string(), key.to_string()), bytes);
        Ok(())
    }
}
