//! Error types for Journey Flux

use thiserror::Error;

/// Errors that abort an analytics request.
///
/// Empty results are not errors; analyzers report them through
/// [`AnalysisOutcome::Empty`](crate::types::AnalysisOutcome).
#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("Missing required columns: {}", missing_columns.join(", "))]
    SchemaValidation { missing_columns: Vec<String> },

    #[error("Invalid value in column '{column}': {reason}")]
    DataType { column: String, reason: String },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Failed to parse input: {0}")]
    ParseError(String),
}

impl AnalyticsError {
    pub(crate) fn data_type(column: &str, reason: impl Into<String>) -> Self {
        AnalyticsError::DataType {
            column: column.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_parameter(reason: impl Into<String>) -> Self {
        AnalyticsError::InvalidParameter(reason.into())
    }
}
