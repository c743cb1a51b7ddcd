//! Integration test: balanced table → forest → evaluated, persisted artifact

use cardiorisk::pipeline::run_training;
use cardiorisk::storage::{InMemoryObjectStore, ObjectStore};
use cardiorisk::training::{MaxFeatures, ModelArtifact, TrainEngine, TrainingConfig};
use cardiorisk::utils::write_csv_bytes;
use cardiorisk::PipelineError;
use ndarray::Array2;
use polars::prelude::*;
use std::collections::HashMap;

fn config() -> TrainingConfig {
    TrainingConfig {
        test_size: 0.25,
        tree_count: 20,
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

/// Balanced table where BMI and Age separate the classes
fn balanced_df(n_per_class: usize) -> DataFrame {
    let mut bmi = Vec::new();
    let mut smoking = Vec::new();
    let mut age = Vec::new();
    let mut label = Vec::new();
    for i in 0..n_per_class * 2 {
        let positive = i % 2 == 1;
        bmi.push((if positive { 33.0 } else { 21.0 }) + (i % 6) as f64 * 0.4);
        smoking.push((positive && i % 3 != 0) as i64);
        age.push((if positive { 70 } else { 30 }) + (i % 3) as i64 * 5);
        label.push(positive as i64);
    }
    df!(
        "BMI" => &bmi,
        "Smoking" => &smoking,
        "Age" => &age,
        "HeartDisease" => &label
    )
    .unwrap()
}

fn env_config(overrides: &[(&'static str, &'static str)]) -> cardiorisk::Result<TrainingConfig> {
    let mut vars: HashMap<&str, &str> = HashMap::from([
        ("EXPORT_BUCKET", "models"),
        ("EXPORT_FILENAME", "forest.bin"),
        ("TEST_SIZE", "0.2"),
        ("N_ESTIMATORS", "10"),
        ("MIN_SAMPLES_SPLIT", "2"),
        ("MIN_SAMPLES_LEAF", "1"),
        ("MAX_FEATURES", "sqrt"),
        ("MAX_DEPTH", "None"),
        ("BOOTSTRAP", "True"),
    ]);
    vars.extend(overrides.iter().copied());
    TrainingConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()))
}

// ============================================================================
// Engine
// ============================================================================

#[test]
fn test_engine_fit_and_evaluate() {
    let mut engine = TrainEngine::new(config(), "HeartDisease");
    let report = engine.fit(&balanced_df(40)).unwrap().clone();

    assert_eq!(report.n_test, 20);
    assert_eq!(report.n_train, 60);
    assert!(report.metrics.accuracy >= 0.9, "accuracy {}", report.metrics.accuracy);
    assert_eq!(report.feature_importances.len(), 3);
    let total: f64 = report.feature_importances.iter().map(|(_, v)| v).sum();
    assert!((total - 1.0).abs() < 1e-6);

    assert_eq!(engine.feature_names(), &["BMI", "Smoking", "Age"]);
    assert_eq!(engine.model().unwrap().n_trees(), 20);
}

#[test]
fn test_same_seed_same_forest() {
    let df = balanced_df(30);
    let mut first = TrainEngine::new(config(), "HeartDisease");
    let mut second = TrainEngine::new(config(), "HeartDisease");
    first.fit(&df).unwrap();
    second.fit(&df).unwrap();

    let queries = Array2::from_shape_vec((2, 3), vec![27.0, 1.0, 50.0, 22.0, 0.0, 35.0]).unwrap();
    let a = first.model().unwrap().predict_proba(&queries).unwrap();
    let b = second.model().unwrap().predict_proba(&queries).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_artifact_round_trip_predicts_identically() {
    let mut engine = TrainEngine::new(config(), "HeartDisease");
    engine.fit(&balanced_df(30)).unwrap();

    let artifact = engine.artifact().unwrap();
    let restored = ModelArtifact::from_bytes(&artifact.to_bytes().unwrap()).unwrap();
    assert_eq!(restored.feature_names, artifact.feature_names);
    assert_eq!(restored.label_column, "HeartDisease");

    let queries = Array2::from_shape_vec((3, 3), vec![35.0, 1.0, 75.0, 21.0, 0.0, 30.0, 28.0, 0.0, 50.0]).unwrap();
    assert_eq!(
        artifact.forest.predict(&queries).unwrap(),
        restored.forest.predict(&queries).unwrap()
    );
}

#[test]
fn test_single_class_table_is_rejected() {
    let df = df!(
        "BMI" => &[20.0, 21.0, 22.0, 23.0],
        "HeartDisease" => &[0i64, 0, 0, 0]
    )
    .unwrap();
    let mut engine = TrainEngine::new(config(), "HeartDisease");
    assert!(matches!(engine.fit(&df), Err(PipelineError::Training(_))));
    assert!(engine.artifact().is_err());
}

#[test]
fn test_null_feature_is_rejected() {
    let df = df!(
        "BMI" => &[Some(20.0), None, Some(30.0), Some(31.0)],
        "HeartDisease" => &[0i64, 0, 1, 1]
    )
    .unwrap();
    let mut engine = TrainEngine::new(config(), "HeartDisease");
    let err = engine.fit(&df).unwrap_err();
    assert!(err.to_string().contains("BMI"));
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_config_from_environment_values() {
    let config = env_config(&[("MAX_DEPTH", "12"), ("BOOTSTRAP", "false")]).unwrap();
    assert_eq!(config.max_depth, Some(12));
    assert!(!config.bootstrap);
    assert_eq!(config.max_features, MaxFeatures::Sqrt);
    assert_eq!(config.random_seed, 42);
}

#[test]
fn test_config_errors_name_the_setting() {
    for (key, value) in [
        ("TEST_SIZE", "1.5"),
        ("N_ESTIMATORS", "0"),
        ("MIN_SAMPLES_SPLIT", "1"),
        ("MAX_FEATURES", "most"),
        ("BOOTSTRAP", "perhaps"),
    ] {
        match env_config(&[(key, value)]) {
            Err(PipelineError::Configuration { key: reported, .. }) => assert_eq!(reported, key),
            other => panic!("{}={} should be a configuration error, got {:?}", key, value, other),
        }
    }
}

// ============================================================================
// Training stage
// ============================================================================

#[tokio::test]
async fn test_training_stage_stores_artifact() {
    let store = InMemoryObjectStore::new();
    let bytes = write_csv_bytes(&mut balanced_df(30)).unwrap();
    store.put("processed", "balanced.csv", bytes).await.unwrap();

    let report = run_training(&store, &config(), "processed", "balanced.csv", "HeartDisease")
        .await
        .unwrap();
    assert!(report.metrics.accuracy > 0.8);

    let stored = store.get("models", "forest.bin").await.unwrap();
    let artifact = ModelArtifact::from_bytes(&stored).unwrap();
    assert_eq!(artifact.n_features(), 3);
}

#[tokio::test]
async fn test_training_stage_writes_nothing_on_failure() {
    let store = InMemoryObjectStore::new();
    let mut single_class = df!(
        "BMI" => &[20.0, 21.0, 22.0, 23.0, 24.0],
        "HeartDisease" => &[1i64, 1, 1, 1, 1]
    )
    .unwrap();
    store
        .put("processed", "balanced.csv", write_csv_bytes(&mut single_class).unwrap())
        .await
        .unwrap();

    let result = run_training(&store, &config(), "processed", "balanced.csv", "HeartDisease").await;
    assert!(matches!(result, Err(PipelineError::Training(_))));
    assert!(!store.contains("models", "forest.bin").await);
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn test_training_stage_missing_input() {
    let store = InMemoryObjectStore::new();
    let result = run_training(&store, &config(), "processed", "absent.csv", "HeartDisease").await;
    assert!(matches!(result, Err(PipelineError::StorageAccess(_))));
}

#[tokio::test]
async fn test_training_stage_rejects_oversized_max_features() {
    let store = InMemoryObjectStore::new();
    let bytes = write_csv_bytes(&mut balanced_df(30)).unwrap();
    store.put("processed", "balanced.csv", bytes).await.unwrap();

    let config = TrainingConfig {
        max_features: "20".parse().unwrap(),
        ..config()
    };
    let result = run_training(&store, &config, "processed", "balanced.csv", "HeartDisease").await;
    assert!(matches!(result, Err(PipelineError::Training(_))));
    assert!(!store.contains("models", "forest.bin").await);
}
