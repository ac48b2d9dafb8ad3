//! WebAssembly module for the Weather Dashboard
//!
//! Provides client-side computation for:
//! - Normalizing provider payloads
//! - Forecast day-bucketing
//! - Notification rule matching
//! - Favorites and rules persisted in `localStorage`

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use shared::{
    decimal_from_f64, Forecast, ForecastEntry, NotificationData, NotificationRule,
    WeatherSnapshot, COORDINATE_PRECISION,
};
use wasm_bindgen::prelude::*;

mod storage;

pub use storage::{BrowserStorage, LocalStorageStore};

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    web_sys::console::debug_1(&JsValue::from_str("weather-dashboard wasm ready"));
}

/// One representative reading for a day
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DailyEntry<'a> {
    day: String,
    icon_url: String,
    #[serde(flatten)]
    entry: &'a ForecastEntry,
}

fn parse_json(raw: &str) -> Result<Value, String> {
    serde_json::from_str(raw).map_err(|e| format!("Invalid JSON: {e}"))
}

fn to_json<T: Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| format!("Serialization failed: {e}"))
}

fn parse_rule(rule_json: &str) -> Result<NotificationRule, String> {
    let record: NotificationData =
        serde_json::from_str(rule_json).map_err(|e| format!("Invalid rule JSON: {e}"))?;
    NotificationRule::from_record(&record).map_err(|e| e.to_string())
}

fn normalize_weather_json(payload_json: &str) -> Result<String, String> {
    let payload = parse_json(payload_json)?;
    let snapshot = WeatherSnapshot::from_payload(&payload).map_err(|e| e.to_string())?;
    to_json(&snapshot)
}

fn daily_forecast_json(payload_json: &str, now_ms: f64) -> Result<String, String> {
    let payload = parse_json(payload_json)?;
    let forecast = Forecast::from_payload(&payload).map_err(|e| e.to_string())?;
    let now = DateTime::<Utc>::from_timestamp_millis(now_ms as i64)
        .ok_or_else(|| format!("Invalid timestamp: {now_ms}"))?;

    let daily: Vec<DailyEntry> = forecast
        .daily_bucketed_at(now)
        .into_iter()
        .map(|entry| DailyEntry {
            day: entry.day_name(),
            icon_url: entry.icon_url(),
            entry,
        })
        .collect();
    to_json(&daily)
}

fn rule_matches_json(rule_json: &str, payload_json: &str) -> Result<bool, String> {
    let rule = parse_rule(rule_json)?;
    let payload = parse_json(payload_json)?;
    Ok(rule.matches(&payload))
}

fn rule_message_json(rule_json: &str, payload_json: &str) -> Result<String, String> {
    let rule = parse_rule(rule_json)?;
    let payload = parse_json(payload_json)?;
    Ok(rule.notification_message(&payload))
}

/// Normalize a current-weather payload into a snapshot
#[wasm_bindgen]
pub fn normalize_weather(payload_json: &str) -> Result<String, JsValue> {
    normalize_weather_json(payload_json).map_err(|e| JsValue::from_str(&e))
}

/// One reading per day from a forecast payload, relative to `now_ms`
#[wasm_bindgen]
pub fn daily_forecast(payload_json: &str, now_ms: f64) -> Result<String, JsValue> {
    daily_forecast_json(payload_json, now_ms).map_err(|e| JsValue::from_str(&e))
}

/// Whether a stored rule matches a current-weather payload
#[wasm_bindgen]
pub fn rule_matches(rule_json: &str, payload_json: &str) -> Result<bool, JsValue> {
    rule_matches_json(rule_json, payload_json).map_err(|e| JsValue::from_str(&e))
}

#[wasm_bindgen]
pub fn rule_message(rule_json: &str, payload_json: &str) -> Result<String, JsValue> {
    rule_message_json(rule_json, payload_json).map_err(|e| JsValue::from_str(&e))
}

#[wasm_bindgen]
pub fn describe_rule(rule_json: &str) -> Result<String, JsValue> {
    parse_rule(rule_json)
        .map(|rule| rule.describe())
        .map_err(|e| JsValue::from_str(&e))
}

/// Great-circle distance in kilometres
#[wasm_bindgen]
pub fn distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    shared::geo::haversine_km(lat1, lon1, lat2, lon2)
}

#[wasm_bindgen]
pub fn compass_direction(degrees: f64) -> String {
    shared::geo::compass_direction(degrees).to_string()
}

/// Identity key for a pair of coordinates; empty for non-finite input
#[wasm_bindgen]
pub fn location_key(lat: f64, lon: f64) -> String {
    match (
        decimal_from_f64(lat, COORDINATE_PRECISION),
        decimal_from_f64(lon, COORDINATE_PRECISION),
    ) {
        (Ok(lat), Ok(lon)) => shared::location_key(lat, lon),
        _ => String::new(),
    }
}
