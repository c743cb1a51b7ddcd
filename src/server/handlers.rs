//! HTTP request handlers

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Query, State},
    Json,
};
use tracing::info;

use crate::inference::{FeatureVector, Prediction};

use super::error::Result;
use super::state::AppState;

/// Predict heart disease from query parameters
pub async fn predict(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Prediction>> {
    let start = Instant::now();
    let features = FeatureVector::from_query(&params)?;
    let prediction = state.predictor.predict(&features).await?;

    info!(
        predicted_class = prediction.predicted_class,
        probability = prediction.probability,
        latency_us = start.elapsed().as_micros() as u64,
        "Prediction request served"
    );
    Ok(Json(prediction))
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "model_loaded": state.model_loaded(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
