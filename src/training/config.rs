//! Training configuration

use super::random_forest::MaxFeatures;
use crate::config::{
    env_lookup, optional_or, parse_bool, parse_optional_positive, parse_usize_at_least,
    parse_value, required,
};
use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};

/// Default seed for the train/test split and the forest
pub const DEFAULT_RANDOM_SEED: u64 = 42;

/// Hyperparameters and destination of one training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Fraction of rows held out for evaluation, in (0, 1)
    pub test_size: f64,

    /// Number of trees
    pub tree_count: usize,

    /// Minimum samples to split a node (>= 2)
    pub min_samples_split: usize,

    /// Minimum samples per leaf (>= 1)
    pub min_samples_leaf: usize,

    /// Features considered per split
    pub max_features: MaxFeatures,

    /// Maximum tree depth; `None` grows until leaves are pure
    pub max_depth: Option<usize>,

    /// Draw bootstrap samples per tree
    pub bootstrap: bool,

    /// Seed for the split and the forest
    pub random_seed: u64,

    /// Container the artifact is written to
    pub export_bucket: String,

    /// Key the artifact is written under
    pub export_filename: String,
}

impl TrainingConfig {
    /// Read the configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(env_lookup)
    }

    /// Read the configuration through `lookup`; every hyperparameter is required
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let export_bucket = required(&lookup, "EXPORT_BUCKET")?;
        let export_filename = required(&lookup, "EXPORT_FILENAME")?;

        let test_size: f64 = parse_value("TEST_SIZE", &required(&lookup, "TEST_SIZE")?)?;
        let tree_count = parse_usize_at_least("N_ESTIMATORS", &required(&lookup, "N_ESTIMATORS")?, 1)?;
        let min_samples_split =
            parse_usize_at_least("MIN_SAMPLES_SPLIT", &required(&lookup, "MIN_SAMPLES_SPLIT")?, 2)?;
        let min_samples_leaf =
            parse_usize_at_least("MIN_SAMPLES_LEAF", &required(&lookup, "MIN_SAMPLES_LEAF")?, 1)?;
        let max_features = required(&lookup, "MAX_FEATURES")?
            .parse::<MaxFeatures>()
            .map_err(|reason| PipelineError::config("MAX_FEATURES", reason))?;
        let max_depth = parse_optional_positive("MAX_DEPTH", &required(&lookup, "MAX_DEPTH")?)?;
        let bootstrap = parse_bool("BOOTSTRAP", &required(&lookup, "BOOTSTRAP")?)?;
        let random_seed: u64 = parse_value(
            "RANDOM_SEED",
            &optional_or(&lookup, "RANDOM_SEED", &DEFAULT_RANDOM_SEED.to_string()),
        )?;

        let config = Self {
            test_size,
            tree_count,
            min_samples_split,
            min_samples_leaf,
            max_features,
            max_depth,
            bootstrap,
            random_seed,
            export_bucket,
            export_filename,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges that the parsers alone cannot express
    pub fn validate(&self) -> Result<()> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(PipelineError::config(
                "TEST_SIZE",
                format!("must be strictly between 0 and 1, got {}", self.test_size),
            ));
        }
        if self.tree_count == 0 {
            return Err(PipelineError::config("N_ESTIMATORS", "must be at least 1"));
        }
        if self.min_samples_split < 2 {
            return Err(PipelineError::config("MIN_SAMPLES_SPLIT", "must be at least 2"));
        }
        if self.min_samples_leaf == 0 {
            return Err(PipelineError::config("MIN_SAMPLES_LEAF", "must be at least 1"));
        }
        if self.max_depth == Some(0) {
            return Err(PipelineError::config("MAX_DEPTH", "must be None or at least 1"));
        }
        Ok(())
    }
}
