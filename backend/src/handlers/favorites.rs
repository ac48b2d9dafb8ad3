//! HTTP handlers for favorite locations

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use shared::Location;

use crate::error::AppResult;
use crate::services::favorites::{AddFavoriteResult, LocationInput};
use crate::AppState;

pub async fn list_favorites(State(state): State<AppState>) -> AppResult<Json<Vec<Location>>> {
    Ok(Json(state.favorites_service().list().await?))
}

/// Bookmark a location; 201 when added, 200 when it already existed
pub async fn add_favorite(
    State(state): State<AppState>,
    Json(input): Json<LocationInput>,
) -> AppResult<(StatusCode, Json<AddFavoriteResult>)> {
    let result = state.favorites_service().add(input).await?;
    let status = if result.added {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(result)))
}

pub async fn remove_favorite(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> AppResult<StatusCode> {
    state.favorites_service().remove(&key).await?;
    Ok(StatusCode::NO_CONTENT)
}
