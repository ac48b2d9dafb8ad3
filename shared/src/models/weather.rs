//! Weather data models

use chrono::{DateTime, FixedOffset, Offset, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::geo::compass_direction;
use crate::models::location::Location;
use crate::types::{round_dp, round_temperature, GpsCoordinates};
use crate::validation::ValidationError;

/// Icon URL template base used by the provider
pub const ICON_BASE_URL: &str = "https://openweathermap.org/img/wn";

/// Normalized current conditions for one place
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherSnapshot {
    pub city_name: String,
    pub country: String,
    pub coordinates: GpsCoordinates,
    pub temperature: Decimal,
    pub feels_like: Decimal,
    pub temp_min: Decimal,
    pub temp_max: Decimal,
    pub humidity_percent: i32,
    pub pressure_hpa: i32,
    pub wind_speed_mps: Decimal,
    pub wind_direction_deg: i32,
    pub wind_direction: &'static str,
    pub cloud_coverage_percent: i32,
    pub visibility_meters: Option<i32>,
    pub condition: String,
    pub description: String,
    pub icon: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rain_1h_mm: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snow_1h_mm: Option<Decimal>,
    pub observed_at: DateTime<Utc>,
    pub sunrise: DateTime<Utc>,
    pub sunset: DateTime<Utc>,
    pub timezone_offset_seconds: i32,
}

/// Provider current-weather payload
#[derive(Debug, Deserialize)]
struct RawCurrent {
    #[serde(default)]
    coord: Option<RawCoord>,
    #[serde(default)]
    weather: Vec<RawCondition>,
    main: Option<RawMain>,
    #[serde(default)]
    visibility: Option<i32>,
    #[serde(default)]
    wind: Option<RawWind>,
    #[serde(default)]
    clouds: Option<RawClouds>,
    #[serde(default)]
    rain: Option<RawPrecipitation>,
    #[serde(default)]
    snow: Option<RawPrecipitation>,
    #[serde(default)]
    dt: Option<i64>,
    #[serde(default)]
    sys: Option<RawSys>,
    #[serde(default)]
    timezone: i32,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub(crate) struct RawCoord {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawCondition {
    pub main: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub(crate) struct RawMain {
    pub temp: f64,
    #[serde(default)]
    pub feels_like: Option<f64>,
    #[serde(default)]
    pub temp_min: Option<f64>,
    #[serde(default)]
    pub temp_max: Option<f64>,
    #[serde(default)]
    pub pressure: Option<i32>,
    #[serde(default)]
    pub humidity: Option<i32>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub(crate) struct RawWind {
    #[serde(default)]
    pub speed: f64,
    #[serde(default)]
    pub deg: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub(crate) struct RawClouds {
    #[serde(default)]
    pub all: i32,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub(crate) struct RawPrecipitation {
    #[serde(rename = "1h", default)]
    pub one_hour: Option<f64>,
    #[serde(rename = "3h", default)]
    pub three_hour: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RawSys {
    #[serde(default)]
    country: String,
    #[serde(default)]
    sunrise: Option<i64>,
    #[serde(default)]
    sunset: Option<i64>,
}

pub(crate) fn timestamp(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}

pub(crate) fn fixed_offset(seconds: i32) -> FixedOffset {
    FixedOffset::east_opt(seconds).unwrap_or_else(|| Utc.fix())
}

fn precipitation_mm(raw: Option<RawPrecipitation>) -> Option<Decimal> {
    raw.and_then(|p| p.one_hour.or(p.three_hour))
        .and_then(Decimal::from_f64)
        .map(|d| round_dp(d, 2))
}

impl WeatherSnapshot {
    /// Normalize a raw provider payload
    pub fn from_payload(payload: &Value) -> Result<Self, ValidationError> {
        let raw = RawCurrent::deserialize(payload)
            .map_err(|e| ValidationError::InvalidWeatherData(e.to_string()))?;

        let main = raw
            .main
            .ok_or_else(|| ValidationError::InvalidWeatherData("missing main block".into()))?;
        let condition = raw
            .weather
            .first()
            .cloned()
            .ok_or_else(|| ValidationError::InvalidWeatherData("missing conditions".into()))?;

        let wind = raw.wind.unwrap_or_default();
        let wind_deg = wind.deg.unwrap_or(0.0);
        let sys = raw.sys.unwrap_or_default();
        let coordinates = raw
            .coord
            .map(|c| {
                GpsCoordinates::new(
                    Decimal::from_f64(c.lat).unwrap_or_default(),
                    Decimal::from_f64(c.lon).unwrap_or_default(),
                )
                .rounded()
            })
            .unwrap_or_else(|| GpsCoordinates::new(Decimal::ZERO, Decimal::ZERO));
        let observed_at = raw.dt.map(timestamp).unwrap_or_else(Utc::now);

        Ok(Self {
            city_name: raw.name,
            country: sys.country,
            coordinates,
            temperature: round_temperature(main.temp),
            feels_like: round_temperature(main.feels_like.unwrap_or(main.temp)),
            temp_min: round_temperature(main.temp_min.unwrap_or(main.temp)),
            temp_max: round_temperature(main.temp_max.unwrap_or(main.temp)),
            humidity_percent: main.humidity.unwrap_or(0),
            pressure_hpa: main.pressure.unwrap_or(0),
            wind_speed_mps: Decimal::from_f64(wind.speed)
                .map(|d| round_dp(d, 1))
                .unwrap_or_default(),
            wind_direction_deg: wind_deg.round() as i32,
            wind_direction: compass_direction(wind_deg),
            cloud_coverage_percent: raw.clouds.unwrap_or_default().all,
            visibility_meters: raw.visibility,
            condition: condition.main,
            description: condition.description,
            icon: condition.icon,
            rain_1h_mm: precipitation_mm(raw.rain),
            snow_1h_mm: precipitation_mm(raw.snow),
            observed_at,
            sunrise: sys.sunrise.map(timestamp).unwrap_or(observed_at),
            sunset: sys.sunset.map(timestamp).unwrap_or(observed_at),
            timezone_offset_seconds: raw.timezone,
        })
    }

    /// Icon URL on the provider's CDN
    pub fn icon_url(&self) -> String {
        self.icon_url_with_base(ICON_BASE_URL)
    }

    pub fn icon_url_with_base(&self, base_url: &str) -> String {
        icon_url(base_url, &self.icon)
    }

    fn offset(&self) -> FixedOffset {
        fixed_offset(self.timezone_offset_seconds)
    }

    /// e.g. "Friday, January 5, 2024", in the observed place's timezone
    pub fn formatted_date(&self) -> String {
        self.observed_at
            .with_timezone(&self.offset())
            .format("%A, %B %-d, %Y")
            .to_string()
    }

    /// e.g. "14:30"
    pub fn formatted_time(&self) -> String {
        format_clock(self.observed_at, self.offset())
    }

    pub fn formatted_sunrise(&self) -> String {
        format_clock(self.sunrise, self.offset())
    }

    pub fn formatted_sunset(&self) -> String {
        format_clock(self.sunset, self.offset())
    }

    /// e.g. "15.2°C"
    pub fn temperature_display(&self) -> String {
        format!("{}°C", self.temperature)
    }

    /// e.g. "3.6 m/s NE"
    pub fn wind_display(&self) -> String {
        format!("{} m/s {}", self.wind_speed_mps, self.wind_direction)
    }

    /// The place this reading belongs to
    pub fn location(&self) -> Result<Location, ValidationError> {
        Location::new(
            &self.city_name,
            &self.country,
            self.coordinates.latitude,
            self.coordinates.longitude,
        )
    }
}

/// Provider icon URL for an icon identifier
pub fn icon_url(base_url: &str, icon: &str) -> String {
    format!("{}/{}@2x.png", base_url.trim_end_matches('/'), icon)
}

fn format_clock(at: DateTime<Utc>, offset: FixedOffset) -> String {
    at.with_timezone(&offset).format("%H:%M").to_string()
}
