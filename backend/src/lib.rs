//! Weather Dashboard - Backend Server
//!
//! Serves weather lookups, favorite locations and notification rules to the
//! browser front-end, and polls the weather provider for alert conditions.

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod config;
pub mod error;
pub mod external;
pub mod handlers;
pub mod routes;
pub mod services;
pub mod storage;

pub use config::Config;
pub use error::{AppError, AppResult};

use external::WeatherClient;
use services::{AlertPoller, FavoritesService, NotificationService, PollerConfig, WeatherService};
use storage::FileStore;

/// Favorites and rules persisted on disk
pub type AppStorage = shared::Storage<FileStore>;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub weather: WeatherClient,
    pub storage: Arc<AppStorage>,
    pub poller: AlertPoller<WeatherClient>,
}

impl AppState {
    /// Build the weather client, storage and poller from configuration
    pub fn from_config(config: Config) -> AppResult<Self> {
        let weather = WeatherClient::with_base_url(
            &config.weather.api_key,
            &config.weather.api_endpoint,
            config.weather.timeout(),
        )?;
        let storage = Arc::new(shared::Storage::new(FileStore::open(&config.storage.data_dir)?));
        let poller = AlertPoller::new(
            Arc::new(weather.clone()),
            PollerConfig::from(config.alerts.clone()),
        );

        Ok(Self {
            config: Arc::new(config),
            weather,
            storage,
            poller,
        })
    }

    pub fn weather_service(&self) -> WeatherService<FileStore> {
        WeatherService::new(
            self.weather.clone(),
            Arc::clone(&self.storage),
            &self.config.weather.icon_base_url,
        )
    }

    pub fn favorites_service(&self) -> FavoritesService<FileStore> {
        FavoritesService::new(Arc::clone(&self.storage))
    }

    pub fn notification_service(&self) -> NotificationService<FileStore, WeatherClient> {
        NotificationService::new(Arc::clone(&self.storage), self.poller.clone())
    }
}

/// Initialize tracing; JSON output when `logging.json` is set
pub fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "wxd_server=debug,weather_dashboard_backend=debug,shared=info,tower_http=debug".into()
    });
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Create the application router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state)
}

/// Root endpoint
async fn root() -> &'static str {
    "Weather Dashboard API v1"
}
