//! HTTP handlers for notification rule endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use shared::StorageStats;
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::notification::{
    CreateNotificationInput, NotificationFilter, NotificationView, UpdateNotificationInput,
};
use crate::AppState;

// ============================================================================
// Notification Rules
// ============================================================================

/// List rules, optionally filtered by location key and active state
pub async fn list_notifications(
    State(state): State<AppState>,
    Query(filter): Query<NotificationFilter>,
) -> AppResult<Json<Vec<NotificationView>>> {
    Ok(Json(state.notification_service().list(filter).await?))
}

pub async fn create_notification(
    State(state): State<AppState>,
    Json(input): Json<CreateNotificationInput>,
) -> AppResult<(StatusCode, Json<NotificationView>)> {
    let view = state.notification_service().create(input).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn update_notification(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateNotificationInput>,
) -> AppResult<Json<NotificationView>> {
    let view = state.notification_service().update(id, input).await?;
    Ok(Json(view))
}

pub async fn toggle_notification(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<NotificationView>> {
    let view = state.notification_service().toggle(id).await?;
    Ok(Json(view))
}

pub async fn delete_notification(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.notification_service().delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Saved Data
// ============================================================================

pub async fn get_stats(State(state): State<AppState>) -> AppResult<Json<StorageStats>> {
    Ok(Json(state.notification_service().stats().await?))
}

pub async fn clear_all_data(State(state): State<AppState>) -> AppResult<StatusCode> {
    state.notification_service().clear_all().await?;
    Ok(StatusCode::NO_CONTENT)
}
