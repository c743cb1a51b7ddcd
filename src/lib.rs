//! cardiorisk - Heart disease risk pipeline
//!
//! Turns raw patient survey records into a deployed binary classifier and
//! serves predictions:
//!
//! raw CSV → [`preprocessing`] → encoded CSV → [`synthetic`] (SMOTE) →
//! balanced CSV → [`training`] (random forest) → model artifact →
//! [`inference`] (lazy model cache) → prediction
//!
//! # Modules
//!
//! ## Core
//! - [`preprocessing`] - Survey field encoding
//! - [`synthetic`] - Class balancing with SMOTE
//! - [`training`] - Random forest training, evaluation, artifacts
//! - [`inference`] - Model cache and predictor
//!
//! ## Infrastructure
//! - [`storage`] - Object storage trait and backends
//! - [`pipeline`] - Preprocess and training stages
//! - [`config`] - Environment-sourced settings
//! - [`utils`] - CSV encoding
//!
//! ## Services
//! - [`server`] - HTTP prediction server
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;
pub mod config;

// Core modules
pub mod preprocessing;
pub mod synthetic;
pub mod training;
pub mod inference;

// Infrastructure
pub mod storage;
pub mod pipeline;
pub mod utils;

// Services
pub mod server;
pub mod cli;

pub use error::{PipelineError, Result};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{PipelineError, Result};
    pub use crate::inference::{FeatureVector, ModelCache, ModelLocation, Prediction, Predictor};
    pub use crate::pipeline::{run_preprocess, run_training, PreprocessConfig, PreprocessSummary};
    pub use crate::preprocessing::{encode_dataframe, encode_record, EncodedRecord, FeatureEncoder, RawRecord};
    pub use crate::storage::{InMemoryObjectStore, LocalObjectStore, ObjectStore};
    pub use crate::synthetic::{balance_dataset, Sampler, SMOTE};
    pub use crate::training::{MaxFeatures, ModelArtifact, RandomForest, TrainEngine, TrainingConfig, TrainingReport};
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
