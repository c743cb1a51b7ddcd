//! Lazily loaded, process-lifetime model cache

use super::config::ModelLocation;
use crate::error::{PipelineError, Result};
use crate::storage::ObjectStore;
use crate::training::ModelArtifact;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::OnceCell;
use tracing::{error, info};

/// Holds at most one deserialized artifact.
///
/// The first [`ModelCache::ensure_loaded`] call fetches and decodes the
/// artifact; concurrent first callers wait on that single load. A failed
/// load leaves the cache empty so the next call retries. Once populated the
/// model is never replaced.
pub struct ModelCache {
    store: Arc<dyn ObjectStore>,
    location: ModelLocation,
    model: OnceCell<Arc<ModelArtifact>>,
}

impl std::fmt::Debug for ModelCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelCache")
            .field("location", &self.location)
            .field("is_loaded", &self.is_loaded())
            .finish()
    }
}

impl ModelCache {
    /// Create an empty cache for the artifact at `location`
    pub fn new(store: Arc<dyn ObjectStore>, location: ModelLocation) -> Self {
        Self {
            store,
            location,
            model: OnceCell::new(),
        }
    }

    /// Artifact location
    pub fn location(&self) -> &ModelLocation {
        &self.location
    }

    /// Whether a model has been loaded
    pub fn is_loaded(&self) -> bool {
        self.model.initialized()
    }

    /// Return the cached model, loading it on first use
    pub async fn ensure_loaded(&self) -> Result<Arc<ModelArtifact>> {
        self.model
            .get_or_try_init(|| self.load())
            .await
            .map(Arc::clone)
    }

    async fn load(&self) -> Result<Arc<ModelArtifact>> {
        let start = Instant::now();
        info!(location = %self.location, "Loading model artifact");

        let bytes = self
            .store
            .get(&self.location.container, &self.location.key)
            .await
            .map_err(|e| {
                error!(location = %self.location, error = %e, "Model fetch failed");
                PipelineError::ModelLoad(format!("fetch {}: {}", self.location, e))
            })?;

        let artifact = ModelArtifact::from_bytes(&bytes).map_err(|e| {
            error!(location = %self.location, error = %e, "Model decode failed");
            e
        })?;

        info!(
            location = %self.location,
            bytes = bytes.len(),
            trees = artifact.forest.n_trees(),
            trained_at = %artifact.trained_at,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Model loaded"
        );
        Ok(Arc::new(artifact))
    }
}
