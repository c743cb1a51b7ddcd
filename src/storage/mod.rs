//! Object storage
//!
//! Pipeline stages read and write whole objects addressed by
//! `(container, key)`. Backends:
//! - [`LocalObjectStore`] maps objects onto files under a root directory
//! - [`InMemoryObjectStore`] keeps objects in a map, for tests

mod local;
mod memory;

pub use local::LocalObjectStore;
pub use memory::InMemoryObjectStore;

use crate::error::Result;
use async_trait::async_trait;

/// Whole-object read/write access keyed by container and key
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch the bytes stored under `(container, key)`.
    ///
    /// A missing object is a [`crate::error::PipelineError::StorageAccess`].
    async fn get(&self, container: &str, key: &str) -> Result<Vec<u8>>;

    /// Store `bytes` under `(container, key)`, replacing any previous object.
    async fn put(&self, container: &str, key: &str, bytes: Vec<u8>) -> Result<()>;
}
