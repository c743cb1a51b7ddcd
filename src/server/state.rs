//! Application state management

use crate::inference::{ModelCache, Predictor};
use std::sync::Arc;

use super::ServerConfig;

/// Application state shared across handlers
#[derive(Debug)]
pub struct AppState {
    pub config: ServerConfig,
    pub predictor: Predictor,
}

impl AppState {
    pub fn new(config: ServerConfig, cache: Arc<ModelCache>) -> Self {
        Self {
            config,
            predictor: Predictor::new(cache),
        }
    }

    /// Whether the model has been loaded into the cache
    pub fn model_loaded(&self) -> bool {
        self.predictor.cache().is_loaded()
    }
}
