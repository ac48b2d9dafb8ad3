//! Validation utilities for the Weather Dashboard
//!
//! Every entity constructor funnels through these checks so that an invalid
//! entity is never partially built.

use rust_decimal::Decimal;
use thiserror::Error;

/// Construction-time validation failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    #[error("Latitude must be between -90 and 90, got {0}")]
    LatitudeOutOfRange(String),

    #[error("Longitude must be between -180 and 180, got {0}")]
    LongitudeOutOfRange(String),

    #[error("Coordinate is not a finite number")]
    InvalidCoordinate,

    #[error("Payload is missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid weather data: {0}")]
    InvalidWeatherData(String),

    #[error("Forecast must contain at least one entry")]
    EmptyForecast,

    #[error("Notification requires a location")]
    MissingLocation,

    #[error("Notification requires at least one condition")]
    NoConditions,

    #[error("Unknown condition type: {0}")]
    UnknownCondition(String),

    #[error("Condition {0} requires a temperature value")]
    MissingThreshold(&'static str),

    #[error("Temperature threshold must be between -50 and 60°C, got {0}")]
    ThresholdOutOfRange(Decimal),
}

/// Lowest accepted temperature threshold in °C
pub const MIN_TEMPERATURE_THRESHOLD: i64 = -50;

/// Highest accepted temperature threshold in °C
pub const MAX_TEMPERATURE_THRESHOLD: i64 = 60;

/// Trim a required text field, rejecting blank input
pub fn validate_required_text(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField(field));
    }
    Ok(trimmed.to_string())
}

/// Validate latitude is within -90..=90
pub fn validate_latitude(latitude: Decimal) -> Result<(), ValidationError> {
    if latitude < Decimal::from(-90) || latitude > Decimal::from(90) {
        return Err(ValidationError::LatitudeOutOfRange(latitude.to_string()));
    }
    Ok(())
}

/// Validate longitude is within -180..=180
pub fn validate_longitude(longitude: Decimal) -> Result<(), ValidationError> {
    if longitude < Decimal::from(-180) || longitude > Decimal::from(180) {
        return Err(ValidationError::LongitudeOutOfRange(longitude.to_string()));
    }
    Ok(())
}

/// Validate a temperature threshold is within -50..=60 °C
pub fn validate_temperature_threshold(value: Decimal) -> Result<(), ValidationError> {
    if value < Decimal::from(MIN_TEMPERATURE_THRESHOLD)
        || value > Decimal::from(MAX_TEMPERATURE_THRESHOLD)
    {
        return Err(ValidationError::ThresholdOutOfRange(value));
    }
    Ok(())
}

/// Validate the weather provider API key (non-empty after trimming)
pub fn validate_api_key(api_key: &str) -> Result<String, ValidationError> {
    validate_required_text("API key", api_key)
}
