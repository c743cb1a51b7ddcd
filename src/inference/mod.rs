//! Inference module
//!
//! Serving side of the pipeline:
//! - [`ModelCache`] loads the artifact once per process, on first use
//! - [`Predictor`] turns a [`FeatureVector`] into a [`Prediction`]

mod cache;
mod config;
mod engine;

pub use cache::ModelCache;
pub use config::ModelLocation;
pub use engine::{FeatureVector, Prediction, Predictor};
