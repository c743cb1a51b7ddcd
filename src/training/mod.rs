//! Model training module
//!
//! Random forest classification over the balanced dataset:
//! - Decision trees with Gini or entropy splits and per-split feature sampling
//! - Bootstrap-aggregated forests with seeded, parallel tree building
//! - Held-out evaluation and bincode model artifacts

mod config;
mod engine;
mod models;
pub mod decision_tree;
pub mod random_forest;

pub use config::{TrainingConfig, DEFAULT_RANDOM_SEED};
pub use decision_tree::{Criterion, DecisionTree, TreeNode};
pub use engine::{ModelArtifact, TrainEngine};
pub use models::{ModelMetrics, TrainingReport};
pub use random_forest::{MaxFeatures, RandomForest};
