//! Synthetic data generation module
//!
//! Class balancing for the encoded dataset via SMOTE. The label column is
//! kept out of the feature space and reattached after resampling.

mod smote;

pub use smote::SMOTE;

use crate::error::{PipelineError, Result};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use std::collections::BTreeMap;
use tracing::info;

/// Result of resampling
#[derive(Debug, Clone)]
pub struct ResampleResult {
    /// Resampled features: original rows first, synthetic rows appended
    pub x: Array2<f64>,
    /// Resampled labels
    pub y: Array1<i64>,
    /// Number of synthetic samples generated per class
    pub n_synthetic: BTreeMap<i64, usize>,
}

/// Trait for samplers
pub trait Sampler: Send + Sync {
    /// Fit the sampler on data
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<i64>) -> Result<()>;

    /// Resample data
    fn resample(&self, x: &Array2<f64>, y: &Array1<i64>) -> Result<ResampleResult>;

    /// Fit and resample in one step
    fn fit_resample(&mut self, x: &Array2<f64>, y: &Array1<i64>) -> Result<ResampleResult> {
        self.fit(x, y)?;
        self.resample(x, y)
    }
}

/// Get class distribution
pub fn class_counts(y: &Array1<i64>) -> BTreeMap<i64, usize> {
    let mut counts = BTreeMap::new();
    for &label in y.iter() {
        *counts.entry(label).or_insert(0) += 1;
    }
    counts
}

/// Get indices for each class
pub fn class_indices(y: &Array1<i64>) -> BTreeMap<i64, Vec<usize>> {
    let mut indices = BTreeMap::new();
    for (i, &label) in y.iter().enumerate() {
        indices.entry(label).or_insert_with(Vec::new).push(i);
    }
    indices
}

/// Balance an encoded table on `label_column`.
///
/// Column order and integer dtypes are preserved; integer columns in
/// synthetic rows are rounded to the nearest integer.
pub fn balance_dataset<S: Sampler>(
    df: &DataFrame,
    label_column: &str,
    sampler: &mut S,
) -> Result<DataFrame> {
    let label = df.column(label_column).map_err(|_| PipelineError::MalformedInput {
        column: label_column.to_string(),
        row: None,
        reason: "label column not found".to_string(),
    })?;

    let y: Array1<i64> = label
        .cast(&DataType::Int64)?
        .as_materialized_series()
        .i64()?
        .into_iter()
        .enumerate()
        .map(|(row, v)| v.ok_or_else(|| PipelineError::malformed(label_column, row, "label is not an integer")))
        .collect::<Result<Vec<i64>>>()?
        .into();

    let feature_columns: Vec<&Column> = df
        .get_columns()
        .iter()
        .filter(|c| c.name().as_str() != label_column)
        .collect();

    let mut feature_data: Vec<Vec<f64>> = Vec::with_capacity(feature_columns.len());
    for column in &feature_columns {
        let values = column
            .cast(&DataType::Float64)?
            .as_materialized_series()
            .f64()?
            .into_iter()
            .enumerate()
            .map(|(row, v)| v.ok_or_else(|| PipelineError::malformed(column.name().as_str(), row, "not a number")))
            .collect::<Result<Vec<f64>>>()?;
        feature_data.push(values);
    }

    let n_rows = df.height();
    let x = Array2::from_shape_fn((n_rows, feature_data.len()), |(r, c)| feature_data[c][r]);

    let resampled = sampler.fit_resample(&x, &y)?;

    let mut columns: Vec<Column> = Vec::with_capacity(df.width());
    let mut feature_idx = 0;
    for column in df.get_columns() {
        let name = column.name().clone();
        if name.as_str() == label_column {
            let labels: Vec<i64> = resampled.y.to_vec();
            columns.push(Series::new(name, labels).into());
            continue;
        }

        let values = resampled.x.column(feature_idx);
        feature_idx += 1;
        if column.dtype().is_integer() {
            let ints: Vec<i64> = values.iter().map(|v| v.round() as i64).collect();
            columns.push(Series::new(name, ints).into());
        } else {
            let floats: Vec<f64> = values.to_vec();
            columns.push(Series::new(name, floats).into());
        }
    }

    let balanced = DataFrame::new(columns)?;
    info!(
        original_rows = n_rows,
        balanced_rows = balanced.height(),
        synthetic = ?resampled.n_synthetic,
        "Dataset balanced"
    );
    Ok(balanced)
}
