//! Browser `localStorage` persistence

use shared::{
    KeyValueStore, Location, LocationData, NotificationData, NotificationRule, Storage,
    StorageError,
};
use uuid::Uuid;
use wasm_bindgen::prelude::*;

/// `KeyValueStore` over `window.localStorage`
pub struct LocalStorageStore {
    storage: web_sys::Storage,
}

impl LocalStorageStore {
    pub fn open() -> Result<Self, StorageError> {
        let window = web_sys::window()
            .ok_or_else(|| StorageError::Unavailable("no window object".to_string()))?;
        let storage = window
            .local_storage()
            .map_err(|e| StorageError::Unavailable(describe(&e)))?
            .ok_or_else(|| StorageError::Unavailable("localStorage is disabled".to_string()))?;
        Ok(Self { storage })
    }
}

fn describe(error: &JsValue) -> String {
    js_sys::Reflect::get(error, &JsValue::from_str("message"))
        .ok()
        .and_then(|m| m.as_string())
        .or_else(|| error.as_string())
        .unwrap_or_else(|| "unknown error".to_string())
}

fn is_quota_error(error: &JsValue) -> bool {
    js_sys::Reflect::get(error, &JsValue::from_str("name"))
        .ok()
        .and_then(|name| name.as_string())
        .is_some_and(|name| name == "QuotaExceededError" || name == "NS_ERROR_DOM_QUOTA_REACHED")
}

impl KeyValueStore for LocalStorageStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.storage
            .get_item(key)
            .map_err(|e| StorageError::Unavailable(describe(&e)))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.storage.set_item(key, value).map_err(|e| {
            if is_quota_error(&e) {
                StorageError::QuotaExceeded(describe(&e))
            } else {
                StorageError::Io(describe(&e))
            }
        })
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.storage
            .remove_item(key)
            .map_err(|e| StorageError::Io(describe(&e)))
    }
}

// ============================================================================
// Storage operations shared by the JS bindings
// ============================================================================

fn add_favorite_json<K: KeyValueStore>(
    storage: &Storage<K>,
    location_json: &str,
) -> Result<bool, String> {
    let record: LocationData =
        serde_json::from_str(location_json).map_err(|e| format!("Invalid location JSON: {e}"))?;
    let location = Location::from_record(&record).map_err(|e| e.to_string())?;
    storage.add_favorite(&location).map_err(|e| e.to_string())
}

fn add_notification_json<K: KeyValueStore>(
    storage: &Storage<K>,
    rule_json: &str,
) -> Result<(), String> {
    let record: NotificationData =
        serde_json::from_str(rule_json).map_err(|e| format!("Invalid rule JSON: {e}"))?;
    let rule = NotificationRule::from_record(&record).map_err(|e| e.to_string())?;
    storage.add_notification(&rule).map_err(|e| e.to_string())
}

fn parse_id(id: &str) -> Result<Uuid, String> {
    Uuid::parse_str(id).map_err(|e| format!("Invalid id {id}: {e}"))
}

fn records_json<K: KeyValueStore>(storage: &Storage<K>) -> Result<(String, String), String> {
    let favorites: Vec<LocationData> = storage.favorites().iter().map(Location::to_record).collect();
    let rules: Vec<NotificationData> = storage
        .notifications()
        .iter()
        .map(NotificationRule::to_record)
        .collect();
    let favorites = serde_json::to_string(&favorites).map_err(|e| e.to_string())?;
    let rules = serde_json::to_string(&rules).map_err(|e| e.to_string())?;
    Ok((favorites, rules))
}

fn js_error(message: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&message.to_string())
}

/// Favorites and notification rules saved in the browser
#[wasm_bindgen]
pub struct BrowserStorage {
    inner: Storage<LocalStorageStore>,
}

#[wasm_bindgen]
impl BrowserStorage {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Result<BrowserStorage, JsValue> {
        let store = LocalStorageStore::open().map_err(js_error)?;
        Ok(Self {
            inner: Storage::new(store),
        })
    }

    /// Valid favorites as a JSON array of location records
    pub fn favorites(&self) -> Result<String, JsValue> {
        records_json(&self.inner).map(|(favorites, _)| favorites).map_err(js_error)
    }

    /// Valid rules as a JSON array of rule records
    pub fn notifications(&self) -> Result<String, JsValue> {
        records_json(&self.inner).map(|(_, rules)| rules).map_err(js_error)
    }

    pub fn add_favorite(&self, location_json: &str) -> Result<bool, JsValue> {
        add_favorite_json(&self.inner, location_json).map_err(js_error)
    }

    pub fn remove_favorite(&self, key: &str) -> Result<bool, JsValue> {
        self.inner.remove_favorite(key).map_err(js_error)
    }

    pub fn is_favorite(&self, key: &str) -> bool {
        self.inner.is_favorite(key)
    }

    pub fn add_notification(&self, rule_json: &str) -> Result<(), JsValue> {
        add_notification_json(&self.inner, rule_json).map_err(js_error)
    }

    pub fn remove_notification(&self, id: &str) -> Result<bool, JsValue> {
        let id = parse_id(id).map_err(js_error)?;
        self.inner.remove_notification(id).map_err(js_error)
    }

    /// New active state, or `undefined` when no rule has this id
    pub fn toggle_notification(&self, id: &str) -> Result<Option<bool>, JsValue> {
        let id = parse_id(id).map_err(js_error)?;
        self.inner.toggle_notification(id).map_err(js_error)
    }

    pub fn clear_all(&self) -> Result<(), JsValue> {
        self.inner.clear_all().map_err(js_error)
    }

    pub fn stats(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.inner.stats()).map_err(js_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{ConditionClause, MemoryStore};

    fn london() -> Location {
        Location::from_degrees("London", "GB", 51.5074, -0.1278).unwrap()
    }

    #[test]
    fn test_add_favorite_from_json() {
        let storage = Storage::new(MemoryStore::new());
        let json = serde_json::to_string(&london().to_record()).unwrap();

        assert!(add_favorite_json(&storage, &json).unwrap());
        assert!(!add_favorite_json(&storage, &json).unwrap());
        assert!(add_favorite_json(&storage, "{}").is_err());

        let (favorites, rules) = records_json(&storage).unwrap();
        let favorites: Vec<LocationData> = serde_json::from_str(&favorites).unwrap();
        assert_eq!(favorites.len(), 1);
        assert_eq!(rules, "[]");
    }

    #[test]
    fn test_add_notification_from_json() {
        let storage = Storage::new(MemoryStore::new());
        let rule = NotificationRule::new(london(), vec![ConditionClause::Snow]).unwrap();
        let json = serde_json::to_string(&rule.to_record()).unwrap();

        add_notification_json(&storage, &json).unwrap();
        assert_eq!(storage.notifications().len(), 1);
        assert_eq!(parse_id(&rule.id().to_string()).unwrap(), rule.id());
        assert!(parse_id("not-a-uuid").is_err());
    }

    #[test]
    fn test_quota_exceeded_propagates() {
        let storage = Storage::new(MemoryStore::with_capacity_limit(16));
        let json = serde_json::to_string(&london().to_record()).unwrap();
        let err = add_favorite_json(&storage, &json).unwrap_err();
        assert!(err.to_lowercase().contains("quota"), "{err}");
    }
}
