//! Common types used across the dashboard

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::validation::ValidationError;

/// Decimal places kept for stored coordinates
pub const COORDINATE_PRECISION: u32 = 4;

/// Decimal places kept for temperatures
pub const TEMPERATURE_PRECISION: u32 = 1;

/// GPS coordinates
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct GpsCoordinates {
    pub latitude: Decimal,
    pub longitude: Decimal,
}

impl GpsCoordinates {
    pub fn new(latitude: Decimal, longitude: Decimal) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Coordinates rounded to the stored precision
    pub fn rounded(&self) -> Self {
        Self {
            latitude: round_dp(self.latitude, COORDINATE_PRECISION),
            longitude: round_dp(self.longitude, COORDINATE_PRECISION),
        }
    }

    pub fn latitude_f64(&self) -> f64 {
        self.latitude.to_f64().unwrap_or_default()
    }

    pub fn longitude_f64(&self) -> f64 {
        self.longitude.to_f64().unwrap_or_default()
    }
}

/// Round half away from zero and drop trailing zeros, so that
/// `51.50740` and `51.5074` render identically.
pub fn round_dp(value: Decimal, dp: u32) -> Decimal {
    value
        .round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
        .normalize()
}

/// Convert a provider float into a Decimal rounded to `dp` places
pub fn decimal_from_f64(value: f64, dp: u32) -> Result<Decimal, ValidationError> {
    Decimal::from_f64(value)
        .map(|d| round_dp(d, dp))
        .ok_or(ValidationError::InvalidCoordinate)
}

/// Temperature rounded to the nearest 0.1 °C
pub fn round_temperature(value: f64) -> Decimal {
    Decimal::from_f64(value)
        .map(|d| round_dp(d, TEMPERATURE_PRECISION))
        .unwrap_or_default()
}
