//! Error handling for the Weather Dashboard server
//!
//! Every failure maps to one category with a stable code and a single
//! human-readable message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::{StorageError, ValidationError};
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    // Weather provider errors
    #[error("Network error: {0}")]
    Network(String),

    #[error("Weather provider rejected the API key ({status}): {message}")]
    AuthenticationFailed { status: u16, message: String },

    #[error("Location not found ({status}): {message}")]
    LocationNotFound { status: u16, message: String },

    #[error("Weather provider rate limit exceeded ({status}): {message}")]
    RateLimited { status: u16, message: String },

    #[error("Weather service unavailable ({status}): {message}")]
    ServiceUnavailable { status: u16, message: String },

    #[error("Weather provider error {status}: {message}")]
    ProviderHttp { status: u16, message: String },

    // Persistence errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl AppError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Network(_) => "NETWORK_ERROR",
            AppError::AuthenticationFailed { .. } => "AUTHENTICATION_FAILED",
            AppError::LocationNotFound { .. } => "LOCATION_NOT_FOUND",
            AppError::RateLimited { .. } => "RATE_LIMITED",
            AppError::ServiceUnavailable { .. } => "SERVICE_UNAVAILABLE",
            AppError::ProviderHttp { .. } => "PROVIDER_ERROR",
            AppError::Storage(StorageError::QuotaExceeded(_)) => "STORAGE_QUOTA_EXCEEDED",
            AppError::Storage(_) => "STORAGE_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Configuration(_) => "CONFIGURATION_ERROR",
            AppError::Internal(_) | AppError::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Network(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::AuthenticationFailed { .. } => StatusCode::BAD_GATEWAY,
            AppError::LocationNotFound { .. } | AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::ServiceUnavailable { .. } | AppError::Storage(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::ProviderHttp { .. } => StatusCode::BAD_GATEWAY,
            AppError::Configuration(_) | AppError::Internal(_) | AppError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// One message per failure category, suitable for showing to a user
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation(e) => e.to_string(),
            AppError::Network(_) => {
                "Could not reach the weather service. Check your connection and try again.".into()
            }
            AppError::AuthenticationFailed { .. } => {
                "The weather service rejected the API key. Check your configuration.".into()
            }
            AppError::LocationNotFound { .. } => {
                "Location not found. Check the spelling and try again.".into()
            }
            AppError::RateLimited { .. } => "Too many requests. Please wait a moment and try again.".into(),
            AppError::ServiceUnavailable { .. } => {
                "The weather service is temporarily unavailable. Please try again later.".into()
            }
            AppError::ProviderHttp { status, message } => {
                format!("Weather service error ({status}): {message}")
            }
            AppError::Storage(StorageError::QuotaExceeded(_)) => {
                "Storage is full. Remove some favorites or alerts and try again.".into()
            }
            AppError::Storage(_) => "Saved data could not be updated.".into(),
            AppError::NotFound(resource) => format!("{resource} not found"),
            AppError::Configuration(msg) => format!("Configuration error: {msg}"),
            AppError::Internal(_) | AppError::InternalError(_) => {
                "An internal server error occurred".into()
            }
        }
    }

    fn field(&self) -> Option<String> {
        match self {
            AppError::Validation(
                ValidationError::EmptyField(field) | ValidationError::MissingField(field),
            ) => Some(field.to_string()),
            AppError::Validation(
                ValidationError::LatitudeOutOfRange(_) | ValidationError::InvalidCoordinate,
            ) => Some("lat".to_string()),
            AppError::Validation(ValidationError::LongitudeOutOfRange(_)) => Some("lon".to_string()),
            AppError::Validation(
                ValidationError::NoConditions
                | ValidationError::UnknownCondition(_)
                | ValidationError::MissingThreshold(_)
                | ValidationError::ThresholdOutOfRange(_),
            ) => Some("conditions".to_string()),
            AppError::Validation(ValidationError::MissingLocation) => Some("location".to_string()),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_detail = ErrorDetail {
            code: self.code().to_string(),
            message: self.user_message(),
            field: self.field(),
        };

        // Log the error for debugging
        tracing::error!("Error: {:?}", self);

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
