//! Pipeline stages
//!
//! Each stage reads its input object, does its work, and writes its output
//! objects. Nothing is written when a stage fails before its first `put`.

use crate::config::{env_lookup, optional_or, parse_usize_at_least, parse_value};
use crate::error::Result;
use crate::preprocessing::{FeatureEncoder, DEFAULT_LABEL_COLUMN};
use crate::storage::ObjectStore;
use crate::synthetic::{balance_dataset, SMOTE};
use crate::training::{TrainEngine, TrainingConfig, TrainingReport};
use crate::utils::{read_csv_bytes, write_csv_bytes};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// Settings of the preprocess stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessConfig {
    /// Key of the encoded table
    pub eda_file: String,
    /// Container both outputs are written to
    pub destination_bucket: String,
    /// Key of the balanced table
    pub upsampled_file: String,
    /// Label column
    pub target_column: String,
    /// SMOTE neighbour count
    pub k_neighbors: usize,
    /// SMOTE seed; unseeded runs draw from entropy
    pub seed: Option<u64>,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            eda_file: "for_EDA.csv".to_string(),
            destination_bucket: "processed-med-data".to_string(),
            upsampled_file: "balanced_data.csv".to_string(),
            target_column: DEFAULT_LABEL_COLUMN.to_string(),
            k_neighbors: 5,
            seed: None,
        }
    }
}

impl PreprocessConfig {
    /// Read from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(env_lookup)
    }

    /// Read through `lookup`; every setting falls back to its default
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let k_neighbors = parse_usize_at_least(
            "SMOTE_K_NEIGHBORS",
            &optional_or(&lookup, "SMOTE_K_NEIGHBORS", &defaults.k_neighbors.to_string()),
            1,
        )?;
        let seed = match lookup("SMOTE_SEED").filter(|v| !v.trim().is_empty()) {
            Some(raw) => Some(parse_value("SMOTE_SEED", raw.trim())?),
            None => None,
        };

        Ok(Self {
            eda_file: optional_or(&lookup, "EDA_FILE", &defaults.eda_file),
            destination_bucket: optional_or(&lookup, "DESTINATION_BUCKET", &defaults.destination_bucket),
            upsampled_file: optional_or(&lookup, "UPSAMPLED_FILE", &defaults.upsampled_file),
            target_column: optional_or(&lookup, "TARGET_COL", &defaults.target_column),
            k_neighbors,
            seed,
        })
    }

    fn sampler(&self) -> SMOTE {
        let smote = SMOTE::new().with_k_neighbors(self.k_neighbors);
        match self.seed {
            Some(seed) => smote.with_seed(seed),
            None => smote,
        }
    }
}

/// Row counts produced by the preprocess stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreprocessSummary {
    pub encoded_rows: usize,
    pub balanced_rows: usize,
}

/// Encode the raw table at `(container, key)`, store it as the EDA file,
/// balance it and store the balanced table.
///
/// The EDA file is written before balancing, so a balancing failure still
/// leaves it in place. Failures are logged at error level on the stage span.
#[instrument(err, skip(store, config))]
pub async fn run_preprocess(
    store: &dyn ObjectStore,
    config: &PreprocessConfig,
    container: &str,
    key: &str,
) -> Result<PreprocessSummary> {
    let raw = read_csv_bytes(&store.get(container, key).await?)?;
    info!(rows = raw.height(), "Raw table loaded");

    let encoder = FeatureEncoder::new(config.target_column.as_str());
    let mut encoded = encoder.transform(&raw)?;
    store
        .put(&config.destination_bucket, &config.eda_file, write_csv_bytes(&mut encoded)?)
        .await?;
    info!(
        container = %config.destination_bucket,
        key = %config.eda_file,
        "Encoded table stored"
    );

    let mut sampler = config.sampler();
    let mut balanced = balance_dataset(&encoded, &config.target_column, &mut sampler)?;
    store
        .put(&config.destination_bucket, &config.upsampled_file, write_csv_bytes(&mut balanced)?)
        .await?;
    info!(
        container = %config.destination_bucket,
        key = %config.upsampled_file,
        rows = balanced.height(),
        "Balanced table stored"
    );

    Ok(PreprocessSummary {
        encoded_rows: encoded.height(),
        balanced_rows: balanced.height(),
    })
}

/// Train on the balanced table at `(container, key)` and store the artifact
/// at the configured export location. No artifact is written on failure.
#[instrument(err, skip(store, config))]
pub async fn run_training(
    store: &dyn ObjectStore,
    config: &TrainingConfig,
    container: &str,
    key: &str,
    label_column: &str,
) -> Result<TrainingReport> {
    config.validate()?;
    let df = read_csv_bytes(&store.get(container, key).await?)?;

    let mut engine = TrainEngine::new(config.clone(), label_column);
    let report = engine.fit(&df)?.clone();
    let bytes = engine.artifact()?.to_bytes()?;

    store
        .put(&config.export_bucket, &config.export_filename, bytes)
        .await?;
    info!(
        container = %config.export_bucket,
        key = %config.export_filename,
        accuracy = report.metrics.accuracy,
        "Model artifact stored"
    );
    Ok(report)
}
