//! Weather provider client tests
//!
//! Runs the client against a local stand-in for the provider and checks
//! payload normalization and the error category for each failure.

mod common;

use std::time::Duration;

use common::{spawn_provider, TEST_API_KEY};
use rust_decimal::Decimal;
use std::str::FromStr;
use weather_dashboard_backend::external::{WeatherClient, WeatherQuery};
use weather_dashboard_backend::AppError;

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

async fn client() -> WeatherClient {
    let base_url = spawn_provider().await;
    WeatherClient::with_base_url(TEST_API_KEY, &base_url, Duration::from_secs(5)).unwrap()
}

// ============================================================================
// Construction
// ============================================================================

#[test]
fn test_blank_api_key_rejected() {
    for key in ["", "   "] {
        let err = WeatherClient::with_base_url(key, "http://localhost", Duration::from_secs(1))
            .unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
    }
}

// ============================================================================
// Successful Lookups
// ============================================================================

#[tokio::test]
async fn test_current_by_city() {
    let client = client().await;
    let payload = client.current_by_city("London").await.unwrap();
    assert_eq!(payload["name"], "London");

    let snapshot = client
        .current_weather(&WeatherQuery::city("London").unwrap())
        .await
        .unwrap();
    assert_eq!(snapshot.city_name, "London");
    assert_eq!(snapshot.temperature, dec("14"));
    assert_eq!(snapshot.condition, "Rain");
    assert_eq!(snapshot.wind_direction, "WSW");
}

#[tokio::test]
async fn test_current_by_coordinates() {
    let client = client().await;
    let payload = client
        .current_by_coordinates(dec("48.8566"), dec("2.3522"))
        .await
        .unwrap();
    assert_eq!(payload["coord"]["lat"].as_f64(), Some(48.8566));
    assert_eq!(payload["coord"]["lon"].as_f64(), Some(2.3522));
}

#[tokio::test]
async fn test_forecast_normalized() {
    let client = client().await;
    let raw = client.forecast_by_city("London").await.unwrap();
    assert_eq!(raw["list"].as_array().map(Vec::len), Some(40));

    let forecast = client
        .forecast(&WeatherQuery::city("London").unwrap())
        .await
        .unwrap();
    assert_eq!(forecast.city_name, "London");
    assert_eq!(forecast.entries.len(), 40);

    let coords = client
        .forecast_by_coordinates(dec("51.5074"), dec("-0.1278"))
        .await
        .unwrap();
    assert_eq!(coords["city"]["name"], "Somewhere");
}

// ============================================================================
// Error Mapping
// ============================================================================

#[tokio::test]
async fn test_not_found() {
    let client = client().await;
    let err = client.current_by_city("Nowhere").await.unwrap_err();
    match err {
        AppError::LocationNotFound { status, message } => {
            assert_eq!(status, 404);
            assert_eq!(message, "city not found");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_rate_limited() {
    let client = client().await;
    let err = client.current_by_city("Busy").await.unwrap_err();
    assert!(matches!(err, AppError::RateLimited { status: 429, ref message } if message == "slow down"));
}

#[tokio::test]
async fn test_service_unavailable() {
    let client = client().await;
    let err = client.forecast_by_city("Broken").await.unwrap_err();
    assert!(matches!(err, AppError::ServiceUnavailable { status: 503, ref message } if message == "maintenance"));
}

#[tokio::test]
async fn test_other_status_carries_message() {
    let client = client().await;
    match client.current_by_city("Teapot").await.unwrap_err() {
        AppError::ProviderHttp { status, message } => {
            assert_eq!(status, 418);
            assert_eq!(message, "short and stout");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_wrong_api_key() {
    let base_url = spawn_provider().await;
    let client = WeatherClient::with_base_url("wrong", &base_url, Duration::from_secs(5)).unwrap();
    let err = client.current_by_city("London").await.unwrap_err();
    assert!(matches!(err, AppError::AuthenticationFailed { status: 401, .. }));
}

#[tokio::test]
async fn test_timeout_is_network_error() {
    let base_url = spawn_provider().await;
    let client =
        WeatherClient::with_base_url(TEST_API_KEY, &base_url, Duration::from_millis(200)).unwrap();
    let err = client.current_by_city("Slow").await.unwrap_err();
    assert!(matches!(err, AppError::Network(_)), "got {err:?}");
}

#[tokio::test]
async fn test_unreachable_provider_is_network_error() {
    // Nothing listens on port 9 locally
    let client =
        WeatherClient::with_base_url(TEST_API_KEY, "http://127.0.0.1:9", Duration::from_secs(2))
            .unwrap();
    let err = client.current_by_city("London").await.unwrap_err();
    assert!(matches!(err, AppError::Network(_)), "got {err:?}");
}

#[tokio::test]
async fn test_blank_city_is_validation_error() {
    let client = client().await;
    let err = client.current_by_city("  ").await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}
