//! Route definitions for the Weather Dashboard API

use axum::{
    routing::{delete, get, post, put},
    Router,
};

use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/weather", get(handlers::get_current_weather))
        .route("/forecast", get(handlers::get_daily_forecast))
        .nest("/favorites", favorite_routes())
        .nest("/notifications", notification_routes())
        .nest("/alerts", alert_routes())
        .route("/stats", get(handlers::get_stats))
        .route("/data", delete(handlers::clear_all_data))
}

/// Favorite location routes
fn favorite_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_favorites).post(handlers::add_favorite))
        .route("/:key", delete(handlers::remove_favorite))
}

/// Notification rule routes
fn notification_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_notifications).post(handlers::create_notification),
        )
        .route(
            "/:id",
            put(handlers::update_notification).delete(handlers::delete_notification),
        )
        .route("/:id/toggle", post(handlers::toggle_notification))
}

/// Alert poller routes
fn alert_routes() -> Router<AppState> {
    Router::new()
        .route("/status", get(handlers::get_alert_status))
        .route("/start", post(handlers::start_alerts))
        .route("/stop", post(handlers::stop_alerts))
        .route("/check", post(handlers::check_alerts))
        .route("/recent", get(handlers::recent_alerts))
}
