//! Forecast models and day-bucketing

use chrono::{DateTime, FixedOffset, NaiveDate, Timelike, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::geo::compass_direction;
use crate::models::weather::{
    fixed_offset, icon_url, timestamp, RawClouds, RawCondition, RawCoord, RawMain,
    RawPrecipitation, RawWind, ICON_BASE_URL,
};
use crate::types::{round_dp, round_temperature, GpsCoordinates};
use crate::validation::ValidationError;

/// Days kept by [`Forecast::daily_bucketed`]
pub const MAX_FORECAST_DAYS: usize = 5;

/// Readings before this local hour are too close to midnight to stand for "today"
pub const EARLIEST_TODAY_HOUR: u32 = 6;

/// Local hours (inclusive) whose readings best represent a day
pub const REPRESENTATIVE_HOURS: std::ops::RangeInclusive<u32> = 9..=18;

/// One point in the forecast time series
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastEntry {
    pub timestamp: DateTime<Utc>,
    pub local_time: DateTime<FixedOffset>,
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
    pub condition: String,
    pub description: String,
    pub icon: String,
    /// Probability of precipitation (0-1)
    pub pop: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rain_3h_mm: Option<Decimal>,
}

/// Normalized multi-day forecast
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Forecast {
    pub city_name: String,
    pub country: String,
    pub coordinates: Option<GpsCoordinates>,
    pub timezone_offset_seconds: i32,
    pub entries: Vec<ForecastEntry>,
}

#[derive(Debug, Deserialize)]
struct RawForecast {
    #[serde(default)]
    list: Vec<RawForecastItem>,
    #[serde(default)]
    city: Option<RawCity>,
}

#[derive(Debug, Deserialize)]
struct RawCity {
    #[serde(default)]
    name: String,
    #[serde(default)]
    country: String,
    #[serde(default)]
    coord: Option<RawCoord>,
    #[serde(default)]
    timezone: i32,
}

#[derive(Debug, Deserialize)]
struct RawForecastItem {
    dt: i64,
    main: RawMain,
    #[serde(default)]
    weather: Vec<RawCondition>,
    #[serde(default)]
    clouds: Option<RawClouds>,
    #[serde(default)]
    wind: Option<RawWind>,
    #[serde(default)]
    pop: Option<f64>,
    #[serde(default)]
    rain: Option<RawPrecipitation>,
}

impl ForecastEntry {
    fn from_raw(item: RawForecastItem, offset: FixedOffset) -> Result<Self, ValidationError> {
        let condition = item.weather.into_iter().next().ok_or_else(|| {
            ValidationError::InvalidWeatherData(format!("forecast entry {} has no conditions", item.dt))
        })?;
        let wind = item.wind.unwrap_or_default();
        let wind_deg = wind.deg.unwrap_or(0.0);
        let at = timestamp(item.dt);

        Ok(Self {
            timestamp: at,
            local_time: at.with_timezone(&offset),
            temperature: round_temperature(item.main.temp),
            feels_like: round_temperature(item.main.feels_like.unwrap_or(item.main.temp)),
            temp_min: round_temperature(item.main.temp_min.unwrap_or(item.main.temp)),
            temp_max: round_temperature(item.main.temp_max.unwrap_or(item.main.temp)),
            humidity_percent: item.main.humidity.unwrap_or(0),
            pressure_hpa: item.main.pressure.unwrap_or(0),
            wind_speed_mps: Decimal::from_f64(wind.speed)
                .map(|d| round_dp(d, 1))
                .unwrap_or_default(),
            wind_direction_deg: wind_deg.round() as i32,
            wind_direction: compass_direction(wind_deg),
            cloud_coverage_percent: item.clouds.unwrap_or_default().all,
            condition: condition.main,
            description: condition.description,
            icon: condition.icon,
            pop: item
                .pop
                .and_then(Decimal::from_f64)
                .map(|d| round_dp(d, 2))
                .unwrap_or_default(),
            rain_3h_mm: item
                .rain
                .and_then(|r| r.three_hour.or(r.one_hour))
                .and_then(Decimal::from_f64)
                .map(|d| round_dp(d, 2)),
        })
    }

    /// Calendar date in the forecast place's timezone
    pub fn local_date(&self) -> NaiveDate {
        self.local_time.date_naive()
    }

    pub fn local_hour(&self) -> u32 {
        self.local_time.hour()
    }

    /// Short weekday name, e.g. "Mon"
    pub fn day_name(&self) -> String {
        self.local_time.format("%a").to_string()
    }

    pub fn icon_url(&self) -> String {
        icon_url(ICON_BASE_URL, &self.icon)
    }
}

impl Forecast {
    /// Normalize a raw provider forecast payload; entries are sorted chronologically
    pub fn from_payload(payload: &Value) -> Result<Self, ValidationError> {
        let raw = RawForecast::deserialize(payload)
            .map_err(|e| ValidationError::InvalidWeatherData(e.to_string()))?;

        if raw.list.is_empty() {
            return Err(ValidationError::EmptyForecast);
        }

        let (city_name, country, coordinates, tz) = match raw.city {
            Some(city) => (
                city.name,
                city.country,
                city.coord.map(|c| {
                    GpsCoordinates::new(
                        Decimal::from_f64(c.lat).unwrap_or_default(),
                        Decimal::from_f64(c.lon).unwrap_or_default(),
                    )
                    .rounded()
                }),
                city.timezone,
            ),
            None => (String::new(), String::new(), None, 0),
        };
        let offset = fixed_offset(tz);

        let mut entries = raw
            .list
            .into_iter()
            .map(|item| ForecastEntry::from_raw(item, offset))
            .collect::<Result<Vec<_>, _>>()?;
        entries.sort_by_key(|e| e.timestamp);

        Ok(Self {
            city_name,
            country,
            coordinates,
            timezone_offset_seconds: tz,
            entries,
        })
    }

    /// One representative entry per calendar day, relative to the current time
    pub fn daily_bucketed(&self) -> Vec<&ForecastEntry> {
        self.daily_bucketed_at(Utc::now())
    }

    /// One representative entry per calendar day, at most [`MAX_FORECAST_DAYS`].
    ///
    /// Leading entries from "today" before 06:00 local time are dropped. For each
    /// remaining date the first entry between 09:00 and 18:00 wins; a date with no
    /// such entry falls back to its first entry.
    pub fn daily_bucketed_at(&self, now: DateTime<Utc>) -> Vec<&ForecastEntry> {
        let today = now.with_timezone(&fixed_offset(self.timezone_offset_seconds)).date_naive();

        let remaining = self.entries.iter().skip_while(|entry| {
            entry.local_date() == today && entry.local_hour() < EARLIEST_TODAY_HOUR
        });

        // (date, chosen entry, chosen entry is within representative hours)
        let mut days: Vec<(NaiveDate, &ForecastEntry, bool)> = Vec::with_capacity(MAX_FORECAST_DAYS);

        for entry in remaining {
            let date = entry.local_date();
            let preferred = REPRESENTATIVE_HOURS.contains(&entry.local_hour());

            if let Some(last) = days.last_mut().filter(|(day, _, _)| *day == date) {
                if preferred && !last.2 {
                    last.1 = entry;
                    last.2 = true;
                }
                continue;
            }
            if days.len() == MAX_FORECAST_DAYS {
                break;
            }
            days.push((date, entry, preferred));
        }

        days.into_iter().map(|(_, entry, _)| entry).collect()
    }

    /// Lowest and highest temperature across all entries
    pub fn temperature_range(&self) -> Option<(Decimal, Decimal)> {
        let min = self.entries.iter().map(|e| e.temp_min).min()?;
        let max = self.entries.iter().map(|e| e.temp_max).max()?;
        Some((min, max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn entry_json(at: DateTime<Utc>, temp: f64, main: &str) -> Value {
        json!({
            "dt": at.timestamp(),
            "main": { "temp": temp, "feels_like": temp, "temp_min": temp - 1.0,
                      "temp_max": temp + 1.0, "pressure": 1010, "humidity": 70 },
            "weather": [{ "main": main, "description": main.to_lowercase(), "icon": "01d" }],
            "wind": { "speed": 2.0, "deg": 180 },
            "clouds": { "all": 10 },
            "pop": 0.2
        })
    }

    /// Three-hourly series starting at `start`, `count` entries long
    fn payload_from(start: DateTime<Utc>, count: usize, tz: i32) -> Value {
        let list: Vec<Value> = (0..count)
            .map(|i| entry_json(start + chrono::Duration::hours(3 * i as i64), 10.0 + i as f64, "Clouds"))
            .collect();
        json!({
            "list": list,
            "city": { "name": "London", "country": "GB",
                      "coord": { "lat": 51.5085, "lon": -0.1257 }, "timezone": tz }
        })
    }

    #[test]
    fn test_empty_list_fails() {
        let payload = json!({ "list": [], "city": { "name": "X", "country": "Y" } });
        assert_eq!(Forecast::from_payload(&payload).unwrap_err(), ValidationError::EmptyForecast);
        assert_eq!(
            Forecast::from_payload(&json!({})).unwrap_err(),
            ValidationError::EmptyForecast
        );
    }

    #[test]
    fn test_entry_without_conditions_fails() {
        let mut payload = payload_from(Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap(), 2, 0);
        payload["list"][1]["weather"] = json!([]);
        assert!(matches!(
            Forecast::from_payload(&payload),
            Err(ValidationError::InvalidWeatherData(_))
        ));
    }

    #[test]
    fn test_entries_sorted() {
        let start = Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap();
        let mut payload = payload_from(start, 4, 0);
        payload["list"].as_array_mut().unwrap().reverse();
        let forecast = Forecast::from_payload(&payload).unwrap();
        assert!(forecast.entries.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[test]
    fn test_bucketing_prefers_midday() {
        // 40 entries = 5 days of 3-hour readings from midnight
        let start = Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap();
        let forecast = Forecast::from_payload(&payload_from(start, 40, 0)).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 1, 4, 22, 0, 0).unwrap();

        let daily = forecast.daily_bucketed_at(now);
        assert_eq!(daily.len(), 5);
        for entry in &daily {
            assert_eq!(entry.local_hour(), 9);
        }
        let dates: Vec<_> = daily.iter().map(|e| e.local_date()).collect();
        let mut unique = dates.clone();
        unique.dedup();
        assert_eq!(dates, unique);
    }

    #[test]
    fn test_bucketing_skips_early_today() {
        // Only 00:00 and 03:00 today, then tomorrow onwards
        let start = Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap();
        let forecast = Forecast::from_payload(&payload_from(start, 40, 0)).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 1, 5, 1, 0, 0).unwrap();

        let mut trimmed = forecast.clone();
        trimmed.entries.retain(|e| {
            e.local_date() != now.date_naive() || e.local_hour() < EARLIEST_TODAY_HOUR
        });
        let daily = trimmed.daily_bucketed_at(now);
        assert_eq!(daily[0].local_date(), NaiveDate::from_ymd_opt(2024, 1, 6).unwrap());
    }

    #[test]
    fn test_bucketing_keeps_today_after_early_hours() {
        let start = Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap();
        let forecast = Forecast::from_payload(&payload_from(start, 40, 0)).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 1, 5, 1, 0, 0).unwrap();

        let daily = forecast.daily_bucketed_at(now);
        assert_eq!(daily[0].local_date(), NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
        assert_eq!(daily[0].local_hour(), 9);
    }

    #[test]
    fn test_bucketing_falls_back_to_first_entry() {
        // Late-evening start: the first day only has 21:00
        let start = Utc.with_ymd_and_hms(2024, 1, 5, 21, 0, 0).unwrap();
        let forecast = Forecast::from_payload(&payload_from(start, 40, 0)).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 1, 5, 20, 0, 0).unwrap();

        let daily = forecast.daily_bucketed_at(now);
        assert_eq!(daily.len(), 5);
        assert_eq!(daily[0].local_hour(), 21);
        assert_eq!(daily[1].local_hour(), 9);
    }

    #[test]
    fn test_bucketing_uses_city_timezone() {
        // 06:00 UTC is 15:00 in UTC+9
        let start = Utc.with_ymd_and_hms(2024, 1, 5, 6, 0, 0).unwrap();
        let forecast = Forecast::from_payload(&payload_from(start, 8, 9 * 3600)).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 1, 5, 5, 0, 0).unwrap();

        let daily = forecast.daily_bucketed_at(now);
        assert_eq!(daily[0].local_hour(), 15);
        assert_eq!(daily[0].day_name(), "Fri");
    }

    #[test]
    fn test_bucketing_is_idempotent() {
        let start = Utc.with_ymd_and_hms(2024, 1, 5, 2, 0, 0).unwrap();
        let forecast = Forecast::from_payload(&payload_from(start, 40, 0)).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 1, 5, 2, 0, 0).unwrap();

        let first: Vec<_> = forecast.daily_bucketed_at(now).iter().map(|e| e.timestamp).collect();
        let second: Vec<_> = forecast.daily_bucketed_at(now).iter().map(|e| e.timestamp).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_temperature_range() {
        let start = Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap();
        let forecast = Forecast::from_payload(&payload_from(start, 3, 0)).unwrap();
        let (min, max) = forecast.temperature_range().unwrap();
        assert_eq!(min, Decimal::from(9));
        assert_eq!(max, Decimal::from(13));
    }

    #[test]
    fn test_city_metadata() {
        let start = Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap();
        let forecast = Forecast::from_payload(&payload_from(start, 1, 3600)).unwrap();
        assert_eq!(forecast.city_name, "London");
        assert_eq!(forecast.country, "GB");
        assert_eq!(forecast.timezone_offset_seconds, 3600);
        assert_eq!(forecast.entries[0].local_hour(), 1);
    }
}
