//! Prediction over the cached model

use super::cache::ModelCache;
use crate::error::{PipelineError, Result};
use crate::preprocessing::FEATURE_COLUMNS;
use crate::training::decision_tree::argmax;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// The eight model inputs of one prediction request
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub bmi: f64,
    /// Physical health score (days of poor physical health)
    pub score: f64,
    pub smoke: i64,
    pub stroke: i64,
    pub sex: i64,
    pub age: i64,
    pub diabetic: i64,
    pub kidney: i64,
}

impl FeatureVector {
    /// Build from request parameters. Every field is required; flag fields
    /// must be integers, while age accepts decimal text truncated toward zero.
    pub fn from_query(params: &HashMap<String, String>) -> Result<Self> {
        Ok(Self {
            bmi: float_param(params, "bmi")?,
            score: float_param(params, "score")?,
            smoke: int_param(params, "smoke")?,
            stroke: int_param(params, "stroke")?,
            sex: int_param(params, "sex")?,
            age: truncated_param(params, "age")?,
            diabetic: int_param(params, "diabetic")?,
            kidney: int_param(params, "kidney")?,
        })
    }

    /// Values in training column order
    pub fn to_array(&self) -> [f64; 8] {
        [
            self.bmi,
            self.smoke as f64,
            self.stroke as f64,
            self.score,
            self.sex as f64,
            self.age as f64,
            self.diabetic as f64,
            self.kidney as f64,
        ]
    }
}

fn raw_param<'a>(params: &'a HashMap<String, String>, field: &str) -> Result<&'a str> {
    params
        .get(field)
        .map(|raw| raw.as_str())
        .ok_or_else(|| PipelineError::input(field, "missing"))
}

fn float_param(params: &HashMap<String, String>, field: &str) -> Result<f64> {
    let raw = raw_param(params, field)?;
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| PipelineError::input(field, format!("{:?} is not a number", raw)))?;
    if !value.is_finite() {
        return Err(PipelineError::input(field, format!("{:?} is not a finite number", raw)));
    }
    Ok(value)
}

fn int_param(params: &HashMap<String, String>, field: &str) -> Result<i64> {
    let raw = raw_param(params, field)?;
    raw.trim()
        .parse()
        .map_err(|_| PipelineError::input(field, format!("{:?} is not an integer", raw)))
}

fn truncated_param(params: &HashMap<String, String>, field: &str) -> Result<i64> {
    let value = float_param(params, field)?;
    if value.abs() >= i64::MAX as f64 {
        return Err(PipelineError::input(field, "out of range"));
    }
    Ok(value.trunc() as i64)
}

/// Model answer for one feature vector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// 0 or 1
    pub predicted_class: u8,
    /// Estimated probability of `predicted_class`
    pub probability: f64,
}

/// Answers predictions from the model held by a [`ModelCache`]
#[derive(Debug, Clone)]
pub struct Predictor {
    cache: Arc<ModelCache>,
}

impl Predictor {
    pub fn new(cache: Arc<ModelCache>) -> Self {
        Self { cache }
    }

    /// Underlying cache
    pub fn cache(&self) -> &Arc<ModelCache> {
        &self.cache
    }

    /// Predict a single feature vector, loading the model on first use
    pub async fn predict(&self, features: &FeatureVector) -> Result<Prediction> {
        let model = self.cache.ensure_loaded().await?;

        if !model.feature_names.iter().map(String::as_str).eq(FEATURE_COLUMNS.iter().copied()) {
            return Err(PipelineError::ModelLoad(format!(
                "model was trained on columns {:?}, requests carry {:?}",
                model.feature_names, FEATURE_COLUMNS
            )));
        }

        let x = Array2::from_shape_vec((1, FEATURE_COLUMNS.len()), features.to_array().to_vec())?;
        let proba = model.forest.predict_proba(&x)?;
        let row = proba.row(0);

        let best = argmax(row);
        let class = model.forest.classes().get(best).copied().unwrap_or(0.0);

        let prediction = Prediction {
            predicted_class: u8::from(class >= 0.5),
            probability: row[best],
        };
        debug!(?features, ?prediction, "Prediction served");
        Ok(prediction)
    }
}
