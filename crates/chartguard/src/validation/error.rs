//! Structured validation error returned to callers.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Category of a validation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// Generic request-shape or type failure.
    ValidationError,
    MissingField,
    InvalidType,
    InvalidValue,
    InvalidChartType,
    DatasetNotFound,
    ColumnNotFound,
    InvalidAggregation,
    FilterContradiction,
    EmptyResult,
    PerformanceWarning,
    IncompatibleConfiguration,
    GenerationFailed,
    /// Unexpected failure inside the validator itself.
    ValidationSystemError,
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::ValidationError => "validation_error",
            ErrorType::MissingField => "missing_field",
            ErrorType::InvalidType => "invalid_type",
            ErrorType::InvalidValue => "invalid_value",
            ErrorType::InvalidChartType => "invalid_chart_type",
            ErrorType::DatasetNotFound => "dataset_not_found",
            ErrorType::ColumnNotFound => "column_not_found",
            ErrorType::InvalidAggregation => "invalid_aggregation",
            ErrorType::FilterContradiction => "filter_contradiction",
            ErrorType::EmptyResult => "empty_result",
            ErrorType::PerformanceWarning => "performance_warning",
            ErrorType::IncompatibleConfiguration => "incompatible_configuration",
            ErrorType::GenerationFailed => "generation_failed",
            ErrorType::ValidationSystemError => "validation_system_error",
        }
    }
}

impl std::fmt::Display for ErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rejection of a chart request.
///
/// Every error names what is wrong and carries concrete next steps in
/// `suggestions`, so an automated caller can retry without another round
/// trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{message} [{error_code}]")]
pub struct ValidationError {
    pub error_type: ErrorType,
    pub message: String,
    pub details: String,
    pub suggestions: Vec<String>,
    pub error_code: String,
    /// Per-item errors when one rejection covers several problems.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_errors: Option<Vec<ValidationError>>,
}

impl ValidationError {
    /// Attach per-item errors. An empty list leaves the field unset.
    pub fn with_validation_errors(mut self, errors: Vec<ValidationError>) -> Self {
        self.validation_errors = if errors.is_empty() { None } else { Some(errors) };
        self
    }

    pub fn has_code(&self, code: &str) -> bool {
        self.error_code == code
    }
}
