//! Business logic services for the Weather Dashboard

pub mod alerts;
pub mod favorites;
pub mod notification;
pub mod weather;

pub use alerts::{AlertEvent, AlertPoller, PollerConfig, PollerStatus};
pub use favorites::FavoritesService;
pub use notification::NotificationService;
pub use weather::WeatherService;

use std::sync::Arc;

use shared::{KeyValueStore, Storage};

use crate::error::{AppError, AppResult};

/// Run a storage call on the blocking thread pool; `FileStore` does synchronous file I/O
pub(crate) async fn with_storage<K, T, F>(storage: &Arc<Storage<K>>, f: F) -> AppResult<T>
where
    K: KeyValueStore + Send + Sync + 'static,
    T: Send + 'static,
    F: FnOnce(&Storage<K>) -> AppResult<T> + Send + 'static,
{
    let storage = Arc::clone(storage);
    tokio::task::spawn_blocking(move || f(&storage))
        .await
        .map_err(|e| AppError::Internal(format!("Storage task failed: {e}")))?
}
