//! Favorite locations service

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{KeyValueStore, Location, Storage};

use crate::error::{AppError, AppResult};
use crate::services::with_storage;

pub struct FavoritesService<K> {
    storage: Arc<Storage<K>>,
}

/// Input for bookmarking a location
#[derive(Debug, Clone, Deserialize)]
pub struct LocationInput {
    pub name: String,
    pub country: String,
    pub lat: Decimal,
    pub lon: Decimal,
}

impl LocationInput {
    pub fn into_location(self) -> AppResult<Location> {
        Ok(Location::new(&self.name, &self.country, self.lat, self.lon)?)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddFavoriteResult {
    pub location: Location,
    /// `false` when the location was already a favorite
    pub added: bool,
}

impl<K: KeyValueStore + Send + Sync + 'static> FavoritesService<K> {
    pub fn new(storage: Arc<Storage<K>>) -> Self {
        Self { storage }
    }

    pub async fn list(&self) -> AppResult<Vec<Location>> {
        with_storage(&self.storage, |storage| Ok(storage.favorites())).await
    }

    /// Bookmark a location; adding an existing one is a no-op
    pub async fn add(&self, input: LocationInput) -> AppResult<AddFavoriteResult> {
        let location = input.into_location()?;
        let saved = location.clone();
        let added = with_storage(&self.storage, move |storage| {
            Ok(storage.add_favorite(&saved)?)
        })
        .await?;
        if added {
            tracing::info!(location = %location, key = location.key(), "Favorite added");
        }
        Ok(AddFavoriteResult { location, added })
    }

    pub async fn remove(&self, key: &str) -> AppResult<()> {
        let owned = key.to_string();
        let removed =
            with_storage(&self.storage, move |storage| Ok(storage.remove_favorite(&owned)?)).await?;
        if !removed {
            return Err(AppError::NotFound(format!("Favorite {key}")));
        }
        tracing::info!(key, "Favorite removed");
        Ok(())
    }
}
