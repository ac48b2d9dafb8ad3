//! Location models

use chrono::{DateTime, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::geo::haversine_km;
use crate::types::{round_dp, GpsCoordinates, COORDINATE_PRECISION};
use crate::validation::{
    validate_latitude, validate_longitude, validate_required_text, ValidationError,
};

/// A validated, immutable geographic point that can be bookmarked
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    name: String,
    country: String,
    lat: Decimal,
    lon: Decimal,
    key: String,
    created_at: DateTime<Utc>,
}

/// Storage projection of a [`Location`]; the identity key is recomputed on load
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationData {
    pub name: String,
    pub country: String,
    pub lat: Decimal,
    pub lon: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Identity key for a pair of coordinates, rounded to 4 decimal places
pub fn location_key(lat: Decimal, lon: Decimal) -> String {
    format!(
        "{}_{}",
        round_dp(lat, COORDINATE_PRECISION),
        round_dp(lon, COORDINATE_PRECISION)
    )
}

impl Location {
    /// Create a location from user input
    pub fn new(
        name: &str,
        country: &str,
        lat: Decimal,
        lon: Decimal,
    ) -> Result<Self, ValidationError> {
        Self::build(name, country, lat, lon, Utc::now())
    }

    /// Create a location from float coordinates
    pub fn from_degrees(
        name: &str,
        country: &str,
        lat: f64,
        lon: f64,
    ) -> Result<Self, ValidationError> {
        let lat = Decimal::from_f64(lat).ok_or(ValidationError::InvalidCoordinate)?;
        let lon = Decimal::from_f64(lon).ok_or(ValidationError::InvalidCoordinate)?;
        Self::new(name, country, lat, lon)
    }

    /// Build a location from a current-weather or forecast provider payload
    pub fn from_provider_payload(payload: &Value) -> Result<Self, ValidationError> {
        // Forecast payloads nest the place under `city`
        let (place, country) = match payload.get("city") {
            Some(city) if city.is_object() => (city, city.get("country")),
            _ => (payload, payload.get("sys").and_then(|sys| sys.get("country"))),
        };

        let coord = place
            .get("coord")
            .ok_or(ValidationError::MissingField("coord"))?;
        let lat = coord
            .get("lat")
            .and_then(Value::as_f64)
            .ok_or(ValidationError::MissingField("coord.lat"))?;
        let lon = coord
            .get("lon")
            .and_then(Value::as_f64)
            .ok_or(ValidationError::MissingField("coord.lon"))?;
        let name = place
            .get("name")
            .and_then(Value::as_str)
            .ok_or(ValidationError::MissingField("name"))?;
        let country = country
            .and_then(Value::as_str)
            .ok_or(ValidationError::MissingField("country"))?;

        Self::from_degrees(name, country, lat, lon)
    }

    /// Rebuild a stored location, re-running every validation rule
    pub fn from_record(record: &LocationData) -> Result<Self, ValidationError> {
        Self::build(
            &record.name,
            &record.country,
            record.lat,
            record.lon,
            record.created_at,
        )
    }

    fn build(
        name: &str,
        country: &str,
        lat: Decimal,
        lon: Decimal,
        created_at: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let name = validate_required_text("Name", name)?;
        let country = validate_required_text("Country", country)?;
        validate_latitude(lat)?;
        validate_longitude(lon)?;

        let lat = round_dp(lat, COORDINATE_PRECISION);
        let lon = round_dp(lon, COORDINATE_PRECISION);

        Ok(Self {
            key: location_key(lat, lon),
            name,
            country,
            lat,
            lon,
            created_at,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn country(&self) -> &str {
        &self.country
    }

    pub fn lat(&self) -> Decimal {
        self.lat
    }

    pub fn lon(&self) -> Decimal {
        self.lon
    }

    /// Identity key, `"{lat}_{lon}"`
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn coordinates(&self) -> GpsCoordinates {
        GpsCoordinates::new(self.lat, self.lon)
    }

    /// "Name, Country"
    pub fn full_name(&self) -> String {
        format!("{}, {}", self.name, self.country)
    }

    /// Coordinates with hemisphere letters, e.g. `51.5074°N, 0.1278°W`
    pub fn display_coordinates(&self) -> String {
        let ns = if self.lat.is_sign_negative() { 'S' } else { 'N' };
        let ew = if self.lon.is_sign_negative() { 'W' } else { 'E' };
        format!("{}°{}, {}°{}", self.lat.abs(), ns, self.lon.abs(), ew)
    }

    /// Great-circle distance in kilometres
    pub fn distance_to(&self, other: &Location) -> f64 {
        let a = self.coordinates();
        let b = other.coordinates();
        haversine_km(
            a.latitude_f64(),
            a.longitude_f64(),
            b.latitude_f64(),
            b.longitude_f64(),
        )
    }

    pub fn to_record(&self) -> LocationData {
        LocationData {
            name: self.name.clone(),
            country: self.country.clone(),
            lat: self.lat,
            lon: self.lon,
            created_at: self.created_at,
        }
    }
}

impl PartialEq for Location {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Location {}

impl std::hash::Hash for Location {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {}", self.name, self.country)
    }
}
