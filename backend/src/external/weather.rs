//! Weather API client for fetching weather data
//!
//! Integrates with OpenWeatherMap API for current conditions and forecasts

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde_json::Value;
use shared::{validate_api_key, Forecast, ValidationError, WeatherSnapshot};

use crate::error::{AppError, AppResult};

/// Default OpenWeatherMap endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

/// Per-request timeout used unless configured otherwise
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// What to look weather up for
#[derive(Debug, Clone, PartialEq)]
pub enum WeatherQuery {
    City(String),
    Coordinates { lat: Decimal, lon: Decimal },
}

impl WeatherQuery {
    /// A city query; blank names are rejected
    pub fn city(name: &str) -> AppResult<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyField("city").into());
        }
        Ok(Self::City(name.to_string()))
    }

    fn params(&self) -> Vec<(&'static str, String)> {
        match self {
            Self::City(name) => vec![("q", name.clone())],
            Self::Coordinates { lat, lon } => vec![("lat", lat.to_string()), ("lon", lon.to_string())],
        }
    }
}

/// Source of current-conditions payloads, keyed by coordinates
#[async_trait]
pub trait WeatherSource: Send + Sync {
    async fn fetch_current(&self, lat: Decimal, lon: Decimal) -> AppResult<Value>;
}

/// Weather API client
#[derive(Clone)]
pub struct WeatherClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl std::fmt::Debug for WeatherClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl WeatherClient {
    /// Create a new WeatherClient against the public endpoint
    pub fn new(api_key: &str) -> AppResult<Self> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL, DEFAULT_TIMEOUT)
    }

    /// Create a new WeatherClient with custom base URL and timeout (for testing)
    pub fn with_base_url(api_key: &str, base_url: &str, timeout: Duration) -> AppResult<Self> {
        let api_key = validate_api_key(api_key)
            .map_err(|_| AppError::Configuration("weather API key is not set".to_string()))?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Raw current-weather payload
    pub async fn current(&self, query: &WeatherQuery) -> AppResult<Value> {
        self.get_json("weather", query).await
    }

    /// Raw 5-day / 3-hour forecast payload
    pub async fn forecast_raw(&self, query: &WeatherQuery) -> AppResult<Value> {
        self.get_json("forecast", query).await
    }

    pub async fn current_by_city(&self, city: &str) -> AppResult<Value> {
        self.current(&WeatherQuery::city(city)?).await
    }

    pub async fn current_by_coordinates(&self, lat: Decimal, lon: Decimal) -> AppResult<Value> {
        self.current(&WeatherQuery::Coordinates { lat, lon }).await
    }

    pub async fn forecast_by_city(&self, city: &str) -> AppResult<Value> {
        self.forecast_raw(&WeatherQuery::city(city)?).await
    }

    pub async fn forecast_by_coordinates(&self, lat: Decimal, lon: Decimal) -> AppResult<Value> {
        self.forecast_raw(&WeatherQuery::Coordinates { lat, lon }).await
    }

    /// Fetch and normalize current conditions
    pub async fn current_weather(&self, query: &WeatherQuery) -> AppResult<WeatherSnapshot> {
        let payload = self.current(query).await?;
        Ok(WeatherSnapshot::from_payload(&payload)?)
    }

    /// Fetch and normalize the forecast
    pub async fn forecast(&self, query: &WeatherQuery) -> AppResult<Forecast> {
        let payload = self.forecast_raw(query).await?;
        Ok(Forecast::from_payload(&payload)?)
    }

    async fn get_json(&self, endpoint: &str, query: &WeatherQuery) -> AppResult<Value> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let mut params = query.params();
        params.push(("units", "metric".to_string()));
        params.push(("appid", self.api_key.clone()));

        let response = self
            .client
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(|e| AppError::Network(transport_message(&e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_status(status, &body));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to parse weather response: {e}")))
    }
}

#[async_trait]
impl WeatherSource for WeatherClient {
    async fn fetch_current(&self, lat: Decimal, lon: Decimal) -> AppResult<Value> {
        self.current_by_coordinates(lat, lon).await
    }
}

fn transport_message(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        "request timed out".to_string()
    } else if error.is_connect() {
        "could not connect to weather service".to_string()
    } else {
        error.to_string()
    }
}

/// Map a non-success provider response onto an error category
pub fn map_status(status: StatusCode, body: &str) -> AppError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string()
        });

    let code = status.as_u16();
    match status {
        StatusCode::UNAUTHORIZED => AppError::AuthenticationFailed { status: code, message },
        StatusCode::NOT_FOUND => AppError::LocationNotFound { status: code, message },
        StatusCode::TOO_MANY_REQUESTS => AppError::RateLimited { status: code, message },
        s if s.is_server_error() => AppError::ServiceUnavailable { status: code, message },
        _ => AppError::ProviderHttp { status: code, message },
    }
}
