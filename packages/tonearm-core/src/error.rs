//! Centralized error types for the Tonearm core library.
//!
//! This module provides a unified error handling system that:
//! - Defines structured error types using `thiserror`
//! - Maps errors to appropriate HTTP status codes
//! - Implements `IntoResponse` for automatic JSON error responses

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::model::ValidationError;

/// Trait for error types that provide machine-readable error codes.
///
/// Implement this trait to provide consistent error codes across different
/// error conversion paths.
pub trait ErrorCode {
    /// Returns a machine-readable error code for API responses.
    fn code(&self) -> &'static str;
}

impl ErrorCode for ValidationError {
    fn code(&self) -> &'static str {
        "validation_failed"
    }
}

/// Application-wide error type for the Tonearm server.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "details")]
pub enum TonearmError {
    /// An incoming payload failed schema validation. Carries every field
    /// issue found, not just the first.
    #[error("Validation failed: {0}")]
    Validation(ValidationError),

    /// No hierarchy root has been declared yet.
    #[error("No browse root declared")]
    NoRoot,

    /// Requested media item does not exist.
    #[error("Media item not found: {0}")]
    ItemNotFound(String),

    /// Requested artwork key is not registered or could not be fetched.
    #[error("Artwork not available: {0}")]
    ArtworkUnavailable(String),

    /// Client sent an invalid or malformed request.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Server configuration error (missing required settings).
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl TonearmError {
    /// Returns a machine-readable error code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_failed",
            Self::NoRoot => "no_root",
            Self::ItemNotFound(_) => "item_not_found",
            Self::ArtworkUnavailable(_) => "artwork_unavailable",
            Self::InvalidRequest(_) => "invalid_request",
            Self::Internal(_) => "internal_error",
            Self::Configuration(_) => "configuration_error",
        }
    }

    /// Maps the error to an appropriate HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NoRoot | Self::ItemNotFound(_) | Self::ArtworkUnavailable(_) => {
                StatusCode::NOT_FOUND
            }
            Self::Validation(_) | Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Configuration(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Convenient Result alias for application-wide operations.
pub type TonearmResult<T> = Result<T, TonearmError>;

/// JSON response body for error responses.
#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    message: String,
    status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    issues: Option<Vec<crate::model::FieldIssue>>,
}

impl IntoResponse for TonearmError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let issues = match &self {
            TonearmError::Validation(err) => Some(err.issues.clone()),
            _ => None,
        };
        let body = ErrorResponse {
            error: self.code(),
            message: self.to_string(),
            status: status.as_u16(),
            issues,
        };
        (status, Json(body)).into_response()
    }
}

impl From<ValidationError> for TonearmError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FieldIssue;

    #[test]
    fn item_not_found_maps_to_404() {
        let err = TonearmError::ItemNotFound("x".into());
        assert_eq!(err.code(), "item_not_found");
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn validation_maps_to_400_and_keeps_issues() {
        let err: TonearmError = ValidationError {
            issues: vec![FieldIssue {
                path: "root[0].playableOrBrowsable".into(),
                message: "missing required field".into(),
            }],
        }
        .into();
        assert_eq!(err.code(), "validation_failed");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
