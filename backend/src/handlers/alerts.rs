//! HTTP handlers for the alert poller

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::services::alerts::{AlertEvent, PollerStatus};
use crate::AppState;

/// Default number of events returned by [`recent_alerts`]
const DEFAULT_RECENT_LIMIT: usize = 20;

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<usize>,
}

pub async fn get_alert_status(State(state): State<AppState>) -> Json<PollerStatus> {
    Json(state.poller.status().await)
}

pub async fn start_alerts(State(state): State<AppState>) -> Json<PollerStatus> {
    state.poller.start().await;
    Json(state.poller.status().await)
}

pub async fn stop_alerts(State(state): State<AppState>) -> Json<PollerStatus> {
    state.poller.stop().await;
    Json(state.poller.status().await)
}

/// Run one polling round immediately
pub async fn check_alerts(State(state): State<AppState>) -> Json<Vec<AlertEvent>> {
    Json(state.poller.check_now().await)
}

pub async fn recent_alerts(
    State(state): State<AppState>,
    Query(query): Query<RecentQuery>,
) -> Json<Vec<AlertEvent>> {
    let limit = query.limit.unwrap_or(DEFAULT_RECENT_LIMIT);
    Json(state.poller.recent_events(limit).await)
}
