//! Error types for the cardiorisk pipeline

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Main error type for the pipeline
///
/// Each variant is one failure category; the payload carries the original
/// cause as context text.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(
        "Malformed input in column `{column}`{}: {reason}",
        .row.map(|r| format!(" at row {}", r)).unwrap_or_default()
    )]
    MalformedInput {
        column: String,
        row: Option<usize>,
        reason: String,
    },

    #[error("Insufficient minority class: {minority_count} rows of class {class}, need at least {required}")]
    InsufficientMinorityClass {
        class: i64,
        minority_count: usize,
        required: usize,
    },

    #[error("Configuration error: {key}: {reason}")]
    Configuration { key: String, reason: String },

    #[error("Training error: {0}")]
    Training(String),

    #[error("Model load error: {0}")]
    ModelLoad(String),

    #[error("Invalid input for field `{field}`: {reason}")]
    InputValidation { field: String, reason: String },

    #[error("Storage access error: {0}")]
    StorageAccess(String),
}

impl PipelineError {
    /// Malformed value in a specific row
    pub fn malformed(column: impl Into<String>, row: usize, reason: impl Into<String>) -> Self {
        PipelineError::MalformedInput {
            column: column.into(),
            row: Some(row),
            reason: reason.into(),
        }
    }

    /// Configuration problem for a named setting
    pub fn config(key: impl Into<String>, reason: impl Into<String>) -> Self {
        PipelineError::Configuration {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Prediction input problem for a named field
    pub fn input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        PipelineError::InputValidation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Short machine-readable name of the failure category
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::MalformedInput { .. } => "malformed_input",
            PipelineError::InsufficientMinorityClass { .. } => "insufficient_minority_class",
            PipelineError::Configuration { .. } => "configuration",
            PipelineError::Training(_) => "training",
            PipelineError::ModelLoad(_) => "model_load",
            PipelineError::InputValidation { .. } => "input_validation",
            PipelineError::StorageAccess(_) => "storage_access",
        }
    }
}

impl From<polars::error::PolarsError> for PipelineError {
    fn from(err: polars::error::PolarsError) -> Self {
        PipelineError::MalformedInput {
            column: "<table>".to_string(),
            row: None,
            reason: err.to_string(),
        }
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::StorageAccess(err.to_string())
    }
}

impl From<ndarray::ShapeError> for PipelineError {
    fn from(err: ndarray::ShapeError) -> Self {
        PipelineError::Training(format!("invalid feature matrix shape: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_display_includes_row() {
        let err = PipelineError::malformed("AgeCategory", 7, "expected two leading digits");
        assert_eq!(
            err.to_string(),
            "Malformed input in column `AgeCategory` at row 7: expected two leading digits"
        );
    }

    #[test]
    fn test_malformed_display_without_row() {
        let err = PipelineError::MalformedInput {
            column: "BMI".to_string(),
            row: None,
            reason: "column missing".to_string(),
        };
        assert_eq!(err.to_string(), "Malformed input in column `BMI`: column missing");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: PipelineError = io_err.into();
        assert!(matches!(err, PipelineError::StorageAccess(_)));
        assert_eq!(err.kind(), "storage_access");
    }
}
