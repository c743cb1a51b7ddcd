//! Evaluation metrics and training reports

use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Binary classification metrics; class 1 is the positive class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    /// Fraction of correct predictions
    pub accuracy: f64,
    /// Precision for the positive class
    pub precision: f64,
    /// Recall for the positive class
    pub recall: f64,
    /// F1 score for the positive class
    pub f1_score: f64,
    /// Number of evaluated samples
    pub n_samples: usize,
}

impl ModelMetrics {
    /// Compute classification metrics
    pub fn compute_classification(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Self {
        let n_samples = y_true.len();

        let correct = y_true
            .iter()
            .zip(y_pred.iter())
            .filter(|(t, p)| (*t - *p).abs() < 0.5)
            .count();
        let accuracy = if n_samples > 0 {
            correct as f64 / n_samples as f64
        } else {
            0.0
        };

        let (tp, fp, _, fn_) = Self::confusion_counts(y_true, y_pred);

        let precision = ratio(tp, tp + fp);
        let recall = ratio(tp, tp + fn_);
        let f1_score = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        Self {
            accuracy,
            precision,
            recall,
            f1_score,
            n_samples,
        }
    }

    fn confusion_counts(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> (usize, usize, usize, usize) {
        let mut tp = 0;
        let mut fp = 0;
        let mut tn = 0;
        let mut fn_ = 0;

        for (t, p) in y_true.iter().zip(y_pred.iter()) {
            match (*t > 0.5, *p > 0.5) {
                (true, true) => tp += 1,
                (false, true) => fp += 1,
                (false, false) => tn += 1,
                (true, false) => fn_ += 1,
            }
        }

        (tp, fp, tn, fn_)
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den > 0 {
        num as f64 / den as f64
    } else {
        0.0
    }
}

/// Outcome of one training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    /// Metrics on the held-out partition
    pub metrics: ModelMetrics,
    /// Rows used for fitting
    pub n_train: usize,
    /// Rows held out for evaluation
    pub n_test: usize,
    /// Feature importances in column order
    pub feature_importances: Vec<(String, f64)>,
    /// Wall time spent fitting and evaluating
    pub training_time_secs: f64,
}
