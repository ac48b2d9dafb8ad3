//! Persistence contract: a key-value store abstraction and the favorite /
//! notification operations built on top of it.
//!
//! Reads never fail: a missing or corrupt value degrades to an empty result
//! and individual invalid records are skipped. Writes surface a typed
//! [`StorageError`] so callers can roll back.

use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Location, LocationData, NotificationData, NotificationRule};

/// Storage key for favorite locations
pub const FAVORITES_KEY: &str = "weather-dashboard.favorites.v1";

/// Storage key for notification rules
pub const NOTIFICATIONS_KEY: &str = "weather-dashboard.notifications.v1";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Storage quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(String),
}

/// Minimal string key-value store
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// In-memory store with an optional byte quota
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
    capacity_bytes: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject writes that would push the total stored bytes past `capacity_bytes`
    pub fn with_capacity_limit(capacity_bytes: usize) -> Self {
        Self {
            entries: RwLock::default(),
            capacity_bytes: Some(capacity_bytes),
        }
    }
}

fn poisoned<T>(_: T) -> StorageError {
    StorageError::Unavailable("store lock poisoned".to_string())
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.read().map_err(poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        if let Some(limit) = self.capacity_bytes {
            let others: usize = entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let needed = others + key.len() + value.len();
            if needed > limit {
                return Err(StorageError::QuotaExceeded(format!(
                    "{needed} bytes needed, {limit} available"
                )));
            }
        }
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.write().map_err(poisoned)?;
        entries.remove(key);
        Ok(())
    }
}

/// Counts reported by [`Storage::stats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageStats {
    pub favorites: usize,
    pub notifications: usize,
    pub active_notifications: usize,
}

/// Favorites and notification rules persisted in a [`KeyValueStore`]
#[derive(Debug)]
pub struct Storage<K> {
    store: K,
    // Serializes read-modify-write sequences
    write_lock: Mutex<()>,
}

impl<K: KeyValueStore> Storage<K> {
    pub fn new(store: K) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &K {
        &self.store
    }

    fn load_array<T: DeserializeOwned>(&self, key: &str) -> Vec<T> {
        let raw = match self.store.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::warn!(key, error = %e, "Failed to read from storage");
                return Vec::new();
            }
        };

        let items = match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Array(items)) => items,
            Ok(_) => {
                tracing::warn!(key, "Stored value is not an array, ignoring");
                return Vec::new();
            }
            Err(e) => {
                tracing::warn!(key, error = %e, "Stored value is not valid JSON, ignoring");
                return Vec::new();
            }
        };

        items
            .into_iter()
            .filter_map(|item| match serde_json::from_value(item) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!(key, error = %e, "Skipping malformed stored record");
                    None
                }
            })
            .collect()
    }

    fn save_array<T: Serialize>(&self, key: &str, items: &[T]) -> Result<(), StorageError> {
        let json =
            serde_json::to_string(items).map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.store.set(key, &json)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, ()>, StorageError> {
        self.write_lock.lock().map_err(poisoned)
    }

    pub fn load_locations(&self) -> Vec<LocationData> {
        self.load_array(FAVORITES_KEY)
    }

    pub fn save_locations(&self, locations: &[LocationData]) -> Result<(), StorageError> {
        self.save_array(FAVORITES_KEY, locations)
    }

    pub fn load_notifications(&self) -> Vec<NotificationData> {
        self.load_array(NOTIFICATIONS_KEY)
    }

    pub fn save_notifications(&self, notifications: &[NotificationData]) -> Result<(), StorageError> {
        self.save_array(NOTIFICATIONS_KEY, notifications)
    }

    /// Stored favorites that still pass validation
    pub fn favorites(&self) -> Vec<Location> {
        self.load_locations()
            .iter()
            .filter_map(|record| match Location::from_record(record) {
                Ok(location) => Some(location),
                Err(e) => {
                    tracing::warn!(name = %record.name, error = %e, "Skipping invalid favorite");
                    None
                }
            })
            .collect()
    }

    /// Add a favorite; returns `false` if one with the same key already exists
    pub fn add_favorite(&self, location: &Location) -> Result<bool, StorageError> {
        let _guard = self.lock()?;
        let mut favorites = self.favorites();
        if favorites.contains(location) {
            return Ok(false);
        }
        favorites.push(location.clone());
        let records: Vec<_> = favorites.iter().map(Location::to_record).collect();
        self.save_locations(&records)?;
        Ok(true)
    }

    /// Remove a favorite by identity key; returns whether anything was removed
    pub fn remove_favorite(&self, key: &str) -> Result<bool, StorageError> {
        let _guard = self.lock()?;
        let mut favorites = self.favorites();
        let before = favorites.len();
        favorites.retain(|f| f.key() != key);
        if favorites.len() == before {
            return Ok(false);
        }
        let records: Vec<_> = favorites.iter().map(Location::to_record).collect();
        self.save_locations(&records)?;
        Ok(true)
    }

    pub fn is_favorite(&self, key: &str) -> bool {
        self.favorites().iter().any(|f| f.key() == key)
    }

    /// Stored rules that still pass validation
    pub fn notifications(&self) -> Vec<NotificationRule> {
        self.load_notifications()
            .iter()
            .filter_map(|record| match NotificationRule::from_record(record) {
                Ok(rule) => Some(rule),
                Err(e) => {
                    tracing::warn!(id = %record.id, error = %e, "Skipping invalid notification");
                    None
                }
            })
            .collect()
    }

    fn write_notifications(&self, rules: &[NotificationRule]) -> Result<(), StorageError> {
        let records: Vec<_> = rules.iter().map(NotificationRule::to_record).collect();
        self.save_notifications(&records)
    }

    pub fn add_notification(&self, rule: &NotificationRule) -> Result<(), StorageError> {
        let _guard = self.lock()?;
        let mut rules = self.notifications();
        rules.retain(|r| r != rule);
        rules.push(rule.clone());
        self.write_notifications(&rules)
    }

    pub fn remove_notification(&self, id: Uuid) -> Result<bool, StorageError> {
        let _guard = self.lock()?;
        let mut rules = self.notifications();
        let before = rules.len();
        rules.retain(|r| r.id() != id);
        if rules.len() == before {
            return Ok(false);
        }
        self.write_notifications(&rules)?;
        Ok(true)
    }

    /// Replace the stored rule with the same id; returns `false` if none exists
    pub fn update_notification(&self, rule: &NotificationRule) -> Result<bool, StorageError> {
        let _guard = self.lock()?;
        let mut rules = self.notifications();
        let Some(slot) = rules.iter_mut().find(|r| r.id() == rule.id()) else {
            return Ok(false);
        };
        *slot = rule.clone();
        self.write_notifications(&rules)?;
        Ok(true)
    }

    /// Flip a rule's active flag; returns the new state, or `None` if not found
    pub fn toggle_notification(&self, id: Uuid) -> Result<Option<bool>, StorageError> {
        let _guard = self.lock()?;
        let mut rules = self.notifications();
        let Some(rule) = rules.iter_mut().find(|r| r.id() == id) else {
            return Ok(None);
        };
        let active = rule.toggle();
        self.write_notifications(&rules)?;
        Ok(Some(active))
    }

    pub fn notifications_for_location(&self, key: &str) -> Vec<NotificationRule> {
        self.notifications()
            .into_iter()
            .filter(|r| r.location().key() == key)
            .collect()
    }

    pub fn active_notifications(&self) -> Vec<NotificationRule> {
        self.notifications()
            .into_iter()
            .filter(NotificationRule::is_active)
            .collect()
    }

    pub fn clear_all(&self) -> Result<(), StorageError> {
        let _guard = self.lock()?;
        self.store.remove(FAVORITES_KEY)?;
        self.store.remove(NOTIFICATIONS_KEY)
    }

    pub fn stats(&self) -> StorageStats {
        let notifications = self.notifications();
        StorageStats {
            favorites: self.favorites().len(),
            active_notifications: notifications.iter().filter(|r| r.is_active()).count(),
            notifications: notifications.len(),
        }
    }
}
