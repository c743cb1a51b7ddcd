//! Training engine: split, fit, evaluate, serialize

use super::config::TrainingConfig;
use super::models::{ModelMetrics, TrainingReport};
use super::random_forest::RandomForest;
use crate::error::{PipelineError, Result};
use ndarray::{Array1, Array2, Axis};
use polars::prelude::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

/// Serialized form of a fitted model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    /// Fitted forest
    pub forest: RandomForest,
    /// Feature column names in matrix order
    pub feature_names: Vec<String>,
    /// Label column the model predicts
    pub label_column: String,
    /// RFC 3339 timestamp of the training run
    pub trained_at: String,
}

impl ModelArtifact {
    /// Encode as bincode bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| PipelineError::Training(format!("artifact serialization failed: {}", e)))
    }

    /// Decode from bincode bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes)
            .map_err(|e| PipelineError::ModelLoad(format!("artifact deserialization failed: {}", e)))
    }

    /// Number of input features the model expects
    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }
}

/// Training engine for the heart disease forest
#[derive(Debug)]
pub struct TrainEngine {
    config: TrainingConfig,
    label_column: String,
    feature_names: Vec<String>,
    model: Option<RandomForest>,
    report: Option<TrainingReport>,
}

impl TrainEngine {
    /// Create a new training engine
    pub fn new(config: TrainingConfig, label_column: impl Into<String>) -> Self {
        Self {
            config,
            label_column: label_column.into(),
            feature_names: Vec::new(),
            model: None,
            report: None,
        }
    }

    /// Fit on a balanced table and evaluate on the held-out partition
    pub fn fit(&mut self, df: &DataFrame) -> Result<&TrainingReport> {
        let start = Instant::now();

        let (x, y) = self.prepare_data(df)?;
        let (x_train, x_test, y_train, y_test) = self.train_test_split(&x, &y)?;

        let mut forest = RandomForest::new_classifier(self.config.tree_count)
            .with_min_samples_split(self.config.min_samples_split)
            .with_min_samples_leaf(self.config.min_samples_leaf)
            .with_max_features(self.config.max_features)
            .with_bootstrap(self.config.bootstrap)
            .with_random_state(self.config.random_seed);
        forest.max_depth = self.config.max_depth;

        info!(
            trees = self.config.tree_count,
            train_rows = x_train.nrows(),
            test_rows = x_test.nrows(),
            max_features = %self.config.max_features,
            "Fitting random forest"
        );
        forest.fit(&x_train, &y_train)?;

        let y_pred = forest.predict(&x_test)?;
        let metrics = ModelMetrics::compute_classification(&y_test, &y_pred);

        let feature_importances = forest
            .feature_importances()
            .map(|imp| {
                self.feature_names
                    .iter()
                    .cloned()
                    .zip(imp.iter().copied())
                    .collect()
            })
            .unwrap_or_default();

        let report = TrainingReport {
            metrics,
            n_train: x_train.nrows(),
            n_test: x_test.nrows(),
            feature_importances,
            training_time_secs: start.elapsed().as_secs_f64(),
        };

        info!(
            accuracy = report.metrics.accuracy,
            precision = report.metrics.precision,
            recall = report.metrics.recall,
            f1 = report.metrics.f1_score,
            secs = report.training_time_secs,
            "Held-out evaluation complete"
        );

        self.model = Some(forest);
        Ok(&*self.report.insert(report))
    }

    /// Fitted forest, if any
    pub fn model(&self) -> Option<&RandomForest> {
        self.model.as_ref()
    }

    /// Report of the last fit
    pub fn report(&self) -> Option<&TrainingReport> {
        self.report.as_ref()
    }

    /// Get feature names
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Package the fitted forest for persistence
    pub fn artifact(&self) -> Result<ModelArtifact> {
        let forest = self
            .model
            .clone()
            .ok_or_else(|| PipelineError::Training("model not fitted".to_string()))?;
        Ok(ModelArtifact {
            forest,
            feature_names: self.feature_names.clone(),
            label_column: self.label_column.clone(),
            trained_at: chrono::Utc::now().to_rfc3339(),
        })
    }

    fn prepare_data(&mut self, df: &DataFrame) -> Result<(Array2<f64>, Array1<f64>)> {
        if df.height() == 0 {
            return Err(PipelineError::Training("training table has no rows".to_string()));
        }

        let label = df.column(&self.label_column).map_err(|_| {
            PipelineError::Training(format!("label column `{}` not found", self.label_column))
        })?;

        self.feature_names = df
            .get_column_names()
            .into_iter()
            .filter(|name| name.as_str() != self.label_column)
            .map(|s| s.to_string())
            .collect();
        if self.feature_names.is_empty() {
            return Err(PipelineError::Training("training table has no feature columns".to_string()));
        }

        let x = columns_to_array2(df, &self.feature_names)?;
        let y = Array1::from_vec(numeric_values(label)?);

        if y.iter().any(|&v| v != 0.0 && v != 1.0) {
            return Err(PipelineError::Training(format!(
                "label column `{}` must hold only 0 and 1",
                self.label_column
            )));
        }
        let positives = y.iter().filter(|&&v| v == 1.0).count();
        if positives == 0 || positives == y.len() {
            return Err(PipelineError::Training(
                "training data contains a single class".to_string(),
            ));
        }

        debug!(rows = x.nrows(), features = x.ncols(), positives, "Training matrix prepared");
        Ok((x, y))
    }

    /// Shuffled split with the configured seed; the test part gets
    /// `ceil(n * test_size)` rows and both parts must be non-empty
    fn train_test_split(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
    ) -> Result<(Array2<f64>, Array2<f64>, Array1<f64>, Array1<f64>)> {
        let n = x.nrows();
        let n_test = (n as f64 * self.config.test_size).ceil() as usize;
        if n_test == 0 || n_test >= n {
            return Err(PipelineError::Training(format!(
                "test_size {} leaves an empty partition for {} rows",
                self.config.test_size, n
            )));
        }

        let mut indices: Vec<usize> = (0..n).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.random_seed);
        indices.shuffle(&mut rng);

        let (test_idx, train_idx) = indices.split_at(n_test);

        let x_train = x.select(Axis(0), train_idx);
        let x_test = x.select(Axis(0), test_idx);
        let y_train = y.select(Axis(0), train_idx);
        let y_test = y.select(Axis(0), test_idx);

        Ok((x_train, x_test, y_train, y_test))
    }
}

/// Extract named columns into a row-major matrix; nulls and non-numeric
/// values are training errors
fn columns_to_array2(df: &DataFrame, col_names: &[String]) -> Result<Array2<f64>> {
    let n_rows = df.height();
    let col_data: Vec<Vec<f64>> = col_names
        .iter()
        .map(|name| {
            let column = df
                .column(name)
                .map_err(|_| PipelineError::Training(format!("feature column `{}` not found", name)))?;
            numeric_values(column)
        })
        .collect::<Result<_>>()?;

    Ok(Array2::from_shape_fn((n_rows, col_names.len()), |(r, c)| col_data[c][r]))
}

fn numeric_values(column: &Column) -> Result<Vec<f64>> {
    let name = column.name().to_string();
    if !column.dtype().is_primitive_numeric() && column.dtype() != &DataType::Boolean {
        return Err(PipelineError::Training(format!(
            "column `{}` is not numeric ({})",
            name,
            column.dtype()
        )));
    }
    let as_f64 = column
        .cast(&DataType::Float64)
        .map_err(|e| PipelineError::Training(format!("column `{}`: {}", name, e)))?;
    let values = as_f64
        .as_materialized_series()
        .f64()
        .map_err(|e| PipelineError::Training(format!("column `{}`: {}", name, e)))?
        .into_iter()
        .enumerate()
        .map(|(row, v)| match v {
            Some(v) if v.is_finite() => Ok(v),
            _ => Err(PipelineError::Training(format!(
                "column `{}` has a missing or non-finite value at row {}",
                name, row
            ))),
        })
        .collect::<Result<Vec<f64>>>()?;
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::MaxFeatures;

    fn config() -> TrainingConfig {
        TrainingConfig {
            test_size: 0.25,
            tree_count: 10,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
            max_depth: None,
            bootstrap: true,
            random_seed: 42,
            export_bucket: "models".to_string(),
            export_filename: "forest.bin".to_string(),
        }
    }

    fn balanced_frame(n_per_class: usize) -> DataFrame {
        let mut bmi = Vec::new();
        let mut age = Vec::new();
        let mut label = Vec::new();
        for i in 0..n_per_class {
            bmi.push(20.0 + (i % 5) as f64);
            age.push(25 + (i % 10) as i64);
            label.push(0i64);
            bmi.push(35.0 + (i % 5) as f64);
            age.push(65 + (i % 10) as i64);
            label.push(1i64);
        }
        DataFrame::new(vec![
            Series::new("BMI".into(), bmi).into(),
            Series::new("Age".into(), age).into(),
            Series::new("HeartDisease".into(), label).into(),
        ])
        .unwrap()
    }

    #[test]
    fn test_fit_reports_held_out_metrics() {
        let mut engine = TrainEngine::new(config(), "HeartDisease");
        let report = engine.fit(&balanced_frame(20)).unwrap().clone();

        assert_eq!(report.n_test, 10);
        assert_eq!(report.n_train, 30);
        assert!(report.metrics.accuracy > 0.9);
        assert_eq!(engine.feature_names(), &["BMI".to_string(), "Age".to_string()]);
    }

    #[test]
    fn test_artifact_round_trip_predicts_identically() {
        let mut engine = TrainEngine::new(config(), "HeartDisease");
        engine.fit(&balanced_frame(20)).unwrap();

        let artifact = engine.artifact().unwrap();
        let restored = ModelArtifact::from_bytes(&artifact.to_bytes().unwrap()).unwrap();

        let queries = ndarray::array![[22.0, 30.0], [36.0, 70.0], [28.0, 50.0]];
        assert_eq!(
            artifact.forest.predict_proba(&queries).unwrap(),
            restored.forest.predict_proba(&queries).unwrap()
        );
        assert_eq!(restored.feature_names, artifact.feature_names);
    }

    #[test]
    fn test_single_class_is_training_error() {
        let df = DataFrame::new(vec![
            Series::new("BMI".into(), vec![20.0, 21.0, 22.0, 23.0]).into(),
            Series::new("HeartDisease".into(), vec![0i64, 0, 0, 0]).into(),
        ])
        .unwrap();
        let err = TrainEngine::new(config(), "HeartDisease").fit(&df).unwrap_err();
        assert!(matches!(err, PipelineError::Training(_)));
    }

    #[test]
    fn test_non_numeric_feature_is_training_error() {
        let df = DataFrame::new(vec![
            Series::new("Sex".into(), vec!["Female", "Male", "Female", "Male"]).into(),
            Series::new("HeartDisease".into(), vec![0i64, 1, 0, 1]).into(),
        ])
        .unwrap();
        let err = TrainEngine::new(config(), "HeartDisease").fit(&df).unwrap_err();
        assert!(matches!(err, PipelineError::Training(_)));
    }

    #[test]
    fn test_artifact_before_fit_fails() {
        let engine = TrainEngine::new(config(), "HeartDisease");
        assert!(engine.artifact().is_err());
    }

    #[test]
    fn test_garbage_bytes_are_load_errors() {
        let err = ModelArtifact::from_bytes(b"not a model").unwrap_err();
        assert!(matches!(err, PipelineError::ModelLoad(_)));
    }
}
