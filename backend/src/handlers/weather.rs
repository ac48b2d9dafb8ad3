//! HTTP handlers for weather lookup endpoints

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use shared::{decimal_from_f64, validate_latitude, validate_longitude, ValidationError};

use crate::error::AppResult;
use crate::external::WeatherQuery;
use crate::services::weather::{DailyForecast, SearchResult};
use crate::AppState;

/// Either `?city=` or `?lat=&lon=`
#[derive(Debug, Deserialize)]
pub struct LookupParams {
    pub city: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

impl LookupParams {
    pub fn into_query(self) -> AppResult<WeatherQuery> {
        match (self.city, self.lat, self.lon) {
            (Some(city), _, _) => WeatherQuery::city(&city),
            (None, Some(lat), Some(lon)) => {
                let lat = decimal_from_f64(lat, shared::COORDINATE_PRECISION)?;
                let lon = decimal_from_f64(lon, shared::COORDINATE_PRECISION)?;
                validate_latitude(lat)?;
                validate_longitude(lon)?;
                Ok(WeatherQuery::Coordinates { lat, lon })
            }
            (None, None, _) => Err(ValidationError::MissingField("lat").into()),
            (None, Some(_), None) => Err(ValidationError::MissingField("lon").into()),
        }
    }
}

/// Current conditions for a city or coordinates
pub async fn get_current_weather(
    State(state): State<AppState>,
    Query(params): Query<LookupParams>,
) -> AppResult<Json<SearchResult>> {
    let query = params.into_query()?;
    let result = state.weather_service().search(&query).await?;
    Ok(Json(result))
}

/// One representative forecast reading per day
pub async fn get_daily_forecast(
    State(state): State<AppState>,
    Query(params): Query<LookupParams>,
) -> AppResult<Json<DailyForecast>> {
    let query = params.into_query()?;
    let forecast = state.weather_service().daily_forecast(&query).await?;
    Ok(Json(forecast))
}
