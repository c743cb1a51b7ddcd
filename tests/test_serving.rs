//! Integration test: prediction serving over HTTP
//! Tests: health → cold predict → cached predict → validation errors → load retry

use axum::body::Body;
use axum::http::{Request, StatusCode};
use cardiorisk::inference::{ModelCache, ModelLocation};
use cardiorisk::preprocessing::FEATURE_COLUMNS;
use cardiorisk::server::{create_router, AppState, ServerConfig};
use cardiorisk::storage::{InMemoryObjectStore, ObjectStore};
use cardiorisk::training::{MaxFeatures, TrainEngine, TrainingConfig};
use polars::prelude::*;
use std::sync::Arc;
use tower::ServiceExt;

const MODEL_BUCKET: &str = "models";
const MODEL_KEY: &str = "forest.bin";

fn training_config() -> TrainingConfig {
    TrainingConfig {
        test_size: 0.2,
        tree_count: 15,
        min_samples_split: 2,
        min_samples_leaf: 1,
        max_features: MaxFeatures::Sqrt,
        max_depth: Some(8),
        bootstrap: true,
        random_seed: 42,
        export_bucket: MODEL_BUCKET.to_string(),
        export_filename: MODEL_KEY.to_string(),
    }
}

/// Balanced encoded table where high BMI, old age and smoking mark the positive class
fn encoded_frame() -> DataFrame {
    let mut columns: Vec<Vec<f64>> = vec![Vec::new(); FEATURE_COLUMNS.len()];
    let mut label = Vec::new();
    for i in 0..60 {
        let positive = i % 2 == 1;
        let row = [
            (if positive { 34.0 } else { 22.0 }) + (i % 7) as f64 * 0.5,
            if positive { 1.0 } else { (i % 5 == 0) as u8 as f64 },
            if positive && i % 3 == 0 { 1.0 } else { 0.0 },
            (i % 10) as f64,
            (i % 2 == 0) as u8 as f64,
            (if positive { 70.0 } else { 30.0 }) + (i % 4) as f64 * 5.0,
            if positive && i % 4 == 1 { 1.0 } else { 0.0 },
            0.0,
        ];
        for (column, value) in columns.iter_mut().zip(row) {
            column.push(value);
        }
        label.push(positive as i64);
    }

    let mut series: Vec<Column> = FEATURE_COLUMNS
        .iter()
        .zip(columns)
        .map(|(name, values)| Series::new((*name).into(), values).into())
        .collect();
    series.push(Series::new("HeartDisease".into(), label).into());
    DataFrame::new(series).unwrap()
}

async fn store_model(store: &InMemoryObjectStore) {
    let mut engine = TrainEngine::new(training_config(), "HeartDisease");
    engine.fit(&encoded_frame()).unwrap();
    let bytes = engine.artifact().unwrap().to_bytes().unwrap();
    store.put(MODEL_BUCKET, MODEL_KEY, bytes).await.unwrap();
}

fn serve_test_app(store: Arc<InMemoryObjectStore>) -> (axum::Router, Arc<AppState>) {
    let config = ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origin: None,
        model: ModelLocation::new(MODEL_BUCKET, MODEL_KEY),
    };
    let cache = Arc::new(ModelCache::new(store, config.model.clone()));
    let state = Arc::new(AppState::new(config.clone(), cache));
    let app = create_router(state.clone(), &config);
    (app, state)
}

async fn get_json(app: &axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 64).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}

const HIGH_RISK: &str = "/predict?bmi=36.5&score=4&smoke=1&stroke=0&sex=0&age=75&diabetic=1&kidney=0";
const LOW_RISK: &str = "/predict?bmi=22.0&score=0&smoke=0&stroke=0&sex=1&age=30&diabetic=0&kidney=0";

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_health_reports_cold_then_warm_cache() {
    let store = Arc::new(InMemoryObjectStore::new());
    store_model(&store).await;
    let (app, state) = serve_test_app(store);

    let (status, json) = get_json(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["model_loaded"], false);

    let (status, _) = get_json(&app, LOW_RISK).await;
    assert_eq!(status, StatusCode::OK);

    let (_, json) = get_json(&app, "/health").await;
    assert_eq!(json["model_loaded"], true);
    assert!(state.model_loaded());
}

// ============================================================================
// Prediction
// ============================================================================

#[tokio::test]
async fn test_predict_returns_class_and_probability() {
    let store = Arc::new(InMemoryObjectStore::new());
    store_model(&store).await;
    let (app, _) = serve_test_app(store);

    let (status, json) = get_json(&app, HIGH_RISK).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["predicted_class"], 1);
    let probability = json["probability"].as_f64().unwrap();
    assert!((0.5..=1.0).contains(&probability), "probability {} out of range", probability);

    let (status, json) = get_json(&app, LOW_RISK).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["predicted_class"], 0);
}

#[tokio::test]
async fn test_repeated_predictions_are_stable() {
    let store = Arc::new(InMemoryObjectStore::new());
    store_model(&store).await;
    let (app, _) = serve_test_app(store);

    let (_, first) = get_json(&app, HIGH_RISK).await;
    for _ in 0..5 {
        let (status, again) = get_json(&app, HIGH_RISK).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(again, first);
    }
}

#[tokio::test]
async fn test_missing_field_is_bad_request() {
    let store = Arc::new(InMemoryObjectStore::new());
    store_model(&store).await;
    let (app, state) = serve_test_app(store);

    let (status, json) = get_json(&app, "/predict?bmi=30&score=1&smoke=0&stroke=0&sex=1&age=50&diabetic=0").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("kidney"));
    // Validation happens before the model is touched
    assert!(!state.model_loaded());
}

#[tokio::test]
async fn test_non_numeric_field_is_bad_request() {
    let store = Arc::new(InMemoryObjectStore::new());
    store_model(&store).await;
    let (app, _) = serve_test_app(store);

    let (status, json) = get_json(
        &app,
        "/predict?bmi=thirty&score=1&smoke=0&stroke=0&sex=1&age=50&diabetic=0&kidney=0",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("bmi"));
}

#[tokio::test]
async fn test_fractional_flag_is_bad_request() {
    let store = Arc::new(InMemoryObjectStore::new());
    store_model(&store).await;
    let (app, state) = serve_test_app(store);

    let (status, json) = get_json(
        &app,
        "/predict?bmi=30&score=1&smoke=0.9&stroke=0&sex=1&age=50&diabetic=0&kidney=0",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("smoke"));
    assert!(!state.model_loaded());

    // Age alone accepts decimal text
    let (status, _) = get_json(
        &app,
        "/predict?bmi=30&score=1&smoke=0&stroke=0&sex=1&age=50.5&diabetic=0&kidney=0",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

// ============================================================================
// Load failures
// ============================================================================

#[tokio::test]
async fn test_missing_model_is_server_error_then_recovers() {
    let store = Arc::new(InMemoryObjectStore::new());
    let (app, state) = serve_test_app(store.clone());

    let (status, json) = get_json(&app, LOW_RISK).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json["error"].as_str().unwrap().contains("Model load error"));
    assert!(!state.model_loaded());

    store_model(&store).await;
    let (status, _) = get_json(&app, LOW_RISK).await;
    assert_eq!(status, StatusCode::OK);
    assert!(state.model_loaded());
}

// ============================================================================
// Routing
// ============================================================================

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let (app, _) = serve_test_app(Arc::new(InMemoryObjectStore::new()));
    let (status, json) = get_json(&app, "/api/models").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn test_post_predict_not_allowed() {
    let (app, _) = serve_test_app(Arc::new(InMemoryObjectStore::new()));
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/predict")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}
