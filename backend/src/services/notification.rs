//! Notification rule service
//!
//! Persists rules and keeps the alert poller's rule set in step with storage
//! after every mutation.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use shared::{
    ConditionClause, ConditionData, KeyValueStore, NotificationRule, Storage, StorageStats,
};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::external::WeatherSource;
use crate::services::alerts::AlertPoller;
use crate::services::favorites::LocationInput;
use crate::services::with_storage;

pub struct NotificationService<K, S> {
    storage: Arc<Storage<K>>,
    poller: AlertPoller<S>,
}

/// Input for creating a notification rule
#[derive(Debug, Clone, Deserialize)]
pub struct CreateNotificationInput {
    pub location: Option<LocationInput>,
    #[serde(default)]
    pub conditions: Vec<ConditionData>,
}

/// Input for replacing a rule's conditions
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateNotificationInput {
    #[serde(default)]
    pub conditions: Vec<ConditionData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationFilter {
    /// Location identity key
    pub location: Option<String>,
    pub active: Option<bool>,
}

/// A rule with its human-readable description
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationView {
    #[serde(flatten)]
    pub rule: NotificationRule,
    pub description: String,
}

impl From<NotificationRule> for NotificationView {
    fn from(rule: NotificationRule) -> Self {
        Self {
            description: rule.describe(),
            rule,
        }
    }
}

impl<K, S> NotificationService<K, S>
where
    K: KeyValueStore + Send + Sync + 'static,
    S: WeatherSource + 'static,
{
    pub fn new(storage: Arc<Storage<K>>, poller: AlertPoller<S>) -> Self {
        Self { storage, poller }
    }

    pub async fn list(&self, filter: NotificationFilter) -> AppResult<Vec<NotificationView>> {
        with_storage(&self.storage, move |storage| {
            let rules = match &filter.location {
                Some(key) => storage.notifications_for_location(key),
                None => storage.notifications(),
            };
            Ok(rules
                .into_iter()
                .filter(|r| filter.active.map_or(true, |active| r.is_active() == active))
                .map(NotificationView::from)
                .collect())
        })
        .await
    }

    pub async fn get(&self, id: Uuid) -> AppResult<NotificationRule> {
        with_storage(&self.storage, move |storage| {
            storage
                .notifications()
                .into_iter()
                .find(|r| r.id() == id)
                .ok_or_else(|| AppError::NotFound(format!("Notification {id}")))
        })
        .await
    }

    pub async fn create(&self, input: CreateNotificationInput) -> AppResult<NotificationView> {
        let location = input.location.map(LocationInput::into_location).transpose()?;
        let rule = NotificationRule::create(location, input.conditions)?;
        let saved = rule.clone();
        with_storage(&self.storage, move |storage| Ok(storage.add_notification(&saved)?)).await?;
        tracing::info!(id = %rule.id(), location = %rule.location(), rule = %rule.describe(), "Notification created");

        self.sync_poller().await?;
        Ok(rule.into())
    }

    /// Replace a rule's conditions, keeping its id, location and active state
    pub async fn update(&self, id: Uuid, input: UpdateNotificationInput) -> AppResult<NotificationView> {
        let clauses = input
            .conditions
            .into_iter()
            .map(ConditionClause::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        let rule = self.get(id).await?.edit(clauses)?;

        let saved = rule.clone();
        let updated =
            with_storage(&self.storage, move |storage| Ok(storage.update_notification(&saved)?))
                .await?;
        if !updated {
            return Err(AppError::NotFound(format!("Notification {id}")));
        }
        tracing::info!(%id, rule = %rule.describe(), "Notification updated");

        self.sync_poller().await?;
        Ok(rule.into())
    }

    pub async fn toggle(&self, id: Uuid) -> AppResult<NotificationView> {
        let active = with_storage(&self.storage, move |storage| Ok(storage.toggle_notification(id)?))
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Notification {id}")))?;
        tracing::info!(%id, active, "Notification toggled");

        self.sync_poller().await?;
        Ok(self.get(id).await?.into())
    }

    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let removed =
            with_storage(&self.storage, move |storage| Ok(storage.remove_notification(id)?)).await?;
        if !removed {
            return Err(AppError::NotFound(format!("Notification {id}")));
        }
        tracing::info!(%id, "Notification deleted");

        self.sync_poller().await?;
        Ok(())
    }

    pub async fn stats(&self) -> AppResult<StorageStats> {
        with_storage(&self.storage, |storage| Ok(storage.stats())).await
    }

    /// Remove every favorite and rule
    pub async fn clear_all(&self) -> AppResult<()> {
        with_storage(&self.storage, |storage| Ok(storage.clear_all()?)).await?;
        tracing::info!("All saved data cleared");
        self.sync_poller().await
    }

    /// Load the stored rules into the poller
    pub async fn sync_poller(&self) -> AppResult<()> {
        let rules = with_storage(&self.storage, |storage| Ok(storage.notifications())).await?;
        self.poller.reload_rules(rules).await;
        Ok(())
    }
}
