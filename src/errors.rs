//! Structured error types with machine-readable codes
//!
//! Only truly invalid input becomes a caller-visible 4xx. Downstream
//! degradations (context lookups, reranker, generative synonyms) are
//! absorbed inside the pipeline and never reach this type.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Structured error response for API clients
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable error code
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Additional error context
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Application error types with proper categorization
#[derive(Debug)]
pub enum AppError {
    // Validation errors (400)
    InvalidInput { field: String, reason: String },
    InvalidExerciseName(String),
    InvalidUserId(String),
    InvalidThreshold(f32),

    // Not found (404)
    ExerciseNotFound(String),
    FlagNotFound(String),

    // Internal (500)
    StorageError(String),
    SerializationError(String),
    IndexError(String),

    // Service errors (503)
    ServiceUnavailable(String),

    // Generic wrapper for external errors
    Internal(anyhow::Error),
}

impl AppError {
    /// Get error code for client identification
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput { .. } => "INVALID_INPUT",
            Self::InvalidExerciseName(_) => "INVALID_EXERCISE_NAME",
            Self::InvalidUserId(_) => "INVALID_USER_ID",
            Self::InvalidThreshold(_) => "INVALID_THRESHOLD",
            Self::ExerciseNotFound(_) => "EXERCISE_NOT_FOUND",
            Self::FlagNotFound(_) => "FLAG_NOT_FOUND",
            Self::StorageError(_) => "STORAGE_ERROR",
            Self::SerializationError(_) => "SERIALIZATION_ERROR",
            Self::IndexError(_) => "INDEX_ERROR",
            Self::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Get HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidInput { .. }
            | Self::InvalidExerciseName(_)
            | Self::InvalidUserId(_)
            | Self::InvalidThreshold(_) => StatusCode::BAD_REQUEST,

            Self::ExerciseNotFound(_) | Self::FlagNotFound(_) => StatusCode::NOT_FOUND,

            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,

            Self::StorageError(_)
            | Self::SerializationError(_)
            | Self::IndexError(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get detailed error message
    pub fn message(&self) -> String {
        match self {
            Self::InvalidInput { field, reason } => {
                format!("Invalid input for field '{field}': {reason}")
            }
            Self::InvalidExerciseName(msg) => format!("Invalid exercise name: {msg}"),
            Self::InvalidUserId(msg) => format!("Invalid user ID: {msg}"),
            Self::InvalidThreshold(v) => {
                format!("Invalid fuzzy threshold {v}: must be within [0, 1]")
            }
            Self::ExerciseNotFound(name) => format!("Exercise not found: {name}"),
            Self::FlagNotFound(name) => format!("Feature flag not found: {name}"),
            Self::StorageError(msg) => format!("Storage error: {msg}"),
            Self::SerializationError(msg) => format!("Serialization error: {msg}"),
            Self::IndexError(msg) => format!("Identity index error: {msg}"),
            Self::ServiceUnavailable(msg) => format!("Service unavailable: {msg}"),
            Self::Internal(err) => format!("Internal error: {err}"),
        }
    }

    /// Convert to structured error response
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.code().to_string(),
            message: self.message(),
            details: None,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for AppError {}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

/// Axum IntoResponse implementation for proper HTTP responses
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = self.to_response();

        (status, Json(body)).into_response()
    }
}

/// Helper trait to convert validation errors
pub trait ValidationErrorExt<T> {
    fn map_validation_err(self, field: &str) -> Result<T>;
}

impl<T> ValidationErrorExt<T> for anyhow::Result<T> {
    fn map_validation_err(self, field: &str) -> Result<T> {
        self.map_err(|e| AppError::InvalidInput {
            field: field.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Type alias for Results using AppError
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            AppError::InvalidExerciseName("".to_string()).code(),
            "INVALID_EXERCISE_NAME"
        );
        assert_eq!(
            AppError::ExerciseNotFound("leg day".to_string()).code(),
            "EXERCISE_NOT_FOUND"
        );
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            AppError::InvalidThreshold(1.5).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::ExerciseNotFound("x".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::StorageError("rocksdb".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_response_serialization() {
        let err = AppError::InvalidUserId("u/1".to_string());
        let response = err.to_response();

        assert_eq!(response.code, "INVALID_USER_ID");
        assert!(response.message.contains("u/1"));
    }
}
