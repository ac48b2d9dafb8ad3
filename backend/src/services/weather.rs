//! Weather service for interactive lookups

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use shared::{Forecast, ForecastEntry, KeyValueStore, Location, Storage, WeatherSnapshot};

use crate::error::AppResult;
use crate::external::weather::{WeatherClient, WeatherQuery};
use crate::services::with_storage;

/// Weather service combining provider lookups with favorite state
pub struct WeatherService<K> {
    client: WeatherClient,
    storage: Arc<Storage<K>>,
    icon_base_url: String,
}

/// Current conditions for a search
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub weather: WeatherSnapshot,
    pub location: Location,
    pub is_favorite: bool,
    pub icon_url: String,
    pub formatted_date: String,
    pub formatted_time: String,
    pub sunrise: String,
    pub sunset: String,
}

/// One representative reading for a day
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyForecastEntry {
    pub day: String,
    pub icon_url: String,
    #[serde(flatten)]
    pub entry: ForecastEntry,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyForecast {
    pub city: String,
    pub country: String,
    pub generated_at: DateTime<Utc>,
    pub daily: Vec<DailyForecastEntry>,
}

impl<K: KeyValueStore + Send + Sync + 'static> WeatherService<K> {
    /// Create a new WeatherService instance
    pub fn new(client: WeatherClient, storage: Arc<Storage<K>>, icon_base_url: &str) -> Self {
        Self {
            client,
            storage,
            icon_base_url: icon_base_url.to_string(),
        }
    }

    /// Current conditions plus the location they belong to
    pub async fn search(&self, query: &WeatherQuery) -> AppResult<SearchResult> {
        let payload = self.client.current(query).await?;
        let weather = WeatherSnapshot::from_payload(&payload)?;
        let location = Location::from_provider_payload(&payload)?;
        let key = location.key().to_string();
        let is_favorite =
            with_storage(&self.storage, move |storage| Ok(storage.is_favorite(&key))).await?;

        tracing::debug!(location = %location, is_favorite, "Weather search resolved");

        Ok(SearchResult {
            icon_url: weather.icon_url_with_base(&self.icon_base_url),
            formatted_date: weather.formatted_date(),
            formatted_time: weather.formatted_time(),
            sunrise: weather.formatted_sunrise(),
            sunset: weather.formatted_sunset(),
            weather,
            location,
            is_favorite,
        })
    }

    /// One reading per day for the next days
    pub async fn daily_forecast(&self, query: &WeatherQuery) -> AppResult<DailyForecast> {
        let forecast = self.client.forecast(query).await?;
        Ok(self.bucket(&forecast, Utc::now()))
    }

    fn bucket(&self, forecast: &Forecast, now: DateTime<Utc>) -> DailyForecast {
        let daily = forecast
            .daily_bucketed_at(now)
            .into_iter()
            .map(|entry| DailyForecastEntry {
                day: entry.day_name(),
                icon_url: shared::icon_url(&self.icon_base_url, &entry.icon),
                entry: entry.clone(),
            })
            .collect();

        DailyForecast {
            city: forecast.city_name.clone(),
            country: forecast.country.clone(),
            generated_at: now,
            daily,
        }
    }
}
