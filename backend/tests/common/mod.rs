//! Shared fixtures: provider payloads and a local stand-in for the weather provider

#![allow(dead_code)]

use std::collections::HashMap;
use std::time::Duration;

use axum::{
    extract::Query,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};

/// API key the fake provider accepts
pub const TEST_API_KEY: &str = "test-key";

/// Current-weather payload shaped like the provider's
pub fn current_payload(name: &str, country: &str, lat: f64, lon: f64, main: &str, temp: f64) -> Value {
    json!({
        "coord": { "lon": lon, "lat": lat },
        "weather": [{ "id": 800, "main": main, "description": main.to_lowercase(), "icon": "01d" }],
        "main": {
            "temp": temp, "feels_like": temp - 0.5, "temp_min": temp - 1.0, "temp_max": temp + 1.0,
            "pressure": 1013, "humidity": 60
        },
        "visibility": 10000,
        "wind": { "speed": 4.1, "deg": 250 },
        "clouds": { "all": 20 },
        "dt": 1704465000,
        "sys": { "country": country, "sunrise": 1704441900, "sunset": 1704470700 },
        "timezone": 0,
        "name": name
    })
}

pub fn london_payload(main: &str, temp: f64) -> Value {
    current_payload("London", "GB", 51.5074, -0.1278, main, temp)
}

/// Five days of three-hourly entries starting at 2024-01-05 00:00 UTC
pub fn forecast_payload(name: &str) -> Value {
    let start = 1704412800_i64;
    let list: Vec<Value> = (0..40)
        .map(|i| {
            let temp = 8.0 + (i % 8) as f64;
            json!({
                "dt": start + i * 3 * 3600,
                "main": { "temp": temp, "feels_like": temp, "temp_min": temp - 1.0,
                          "temp_max": temp + 1.0, "pressure": 1010, "humidity": 70 },
                "weather": [{ "main": "Clouds", "description": "broken clouds", "icon": "04d" }],
                "clouds": { "all": 75 },
                "wind": { "speed": 3.0, "deg": 200 },
                "pop": 0.1
            })
        })
        .collect();

    json!({
        "cod": "200",
        "list": list,
        "city": { "name": name, "country": "GB",
                  "coord": { "lat": 51.5074, "lon": -0.1278 }, "timezone": 0 }
    })
}

fn provider_error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "cod": status.as_u16(), "message": message }))).into_response()
}

/// Map special city names onto provider failures
async fn check_request(params: &HashMap<String, String>) -> Option<Response> {
    if params.get("appid").map(String::as_str) != Some(TEST_API_KEY) {
        return Some(provider_error(StatusCode::UNAUTHORIZED, "Invalid API key"));
    }
    if params.get("units").map(String::as_str) != Some("metric") {
        return Some(provider_error(StatusCode::BAD_REQUEST, "units must be metric"));
    }
    match params.get("q").map(String::as_str) {
        Some("Nowhere") => Some(provider_error(StatusCode::NOT_FOUND, "city not found")),
        Some("Busy") => Some(provider_error(StatusCode::TOO_MANY_REQUESTS, "slow down")),
        Some("Broken") => Some(provider_error(StatusCode::SERVICE_UNAVAILABLE, "maintenance")),
        Some("Teapot") => Some(provider_error(StatusCode::IM_A_TEAPOT, "short and stout")),
        Some("Slow") => {
            tokio::time::sleep(Duration::from_secs(3)).await;
            None
        }
        _ => None,
    }
}

async fn current_handler(Query(params): Query<HashMap<String, String>>) -> Response {
    if let Some(response) = check_request(&params).await {
        return response;
    }
    let payload = match params.get("q") {
        Some(city) => current_payload(city, "GB", 51.5074, -0.1278, "Rain", 14.0),
        None => {
            let lat = params.get("lat").and_then(|v| v.parse().ok()).unwrap_or(0.0);
            let lon = params.get("lon").and_then(|v| v.parse().ok()).unwrap_or(0.0);
            current_payload("Somewhere", "XX", lat, lon, "Clear", 22.0)
        }
    };
    Json(payload).into_response()
}

async fn forecast_handler(Query(params): Query<HashMap<String, String>>) -> Response {
    if let Some(response) = check_request(&params).await {
        return response;
    }
    let name = params.get("q").cloned().unwrap_or_else(|| "Somewhere".to_string());
    Json(forecast_payload(&name)).into_response()
}

pub fn provider_router() -> Router {
    Router::new()
        .route("/weather", get(current_handler))
        .route("/forecast", get(forecast_handler))
}

/// Serve `router` on an ephemeral local port and return its base URL
pub async fn spawn_server(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

pub async fn spawn_provider() -> String {
    spawn_server(provider_router()).await
}
