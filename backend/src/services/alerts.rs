//! Alert polling engine
//!
//! Periodically fetches current conditions for every location that has an
//! active notification rule and emits an [`AlertEvent`] when a rule matches.
//! Each location has its own cooldown: after it fires, no further alert is
//! emitted for that location until the cooldown has elapsed, whichever rule
//! would match.
//!
//! Runs on a fixed interval using `tokio::time::interval` and stops when its
//! [`CancellationToken`] is triggered. Results of a round that completes after
//! a stop are discarded.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use shared::{Location, NotificationRule, WeatherSnapshot};
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::AlertsConfig;
use crate::error::AppResult;
use crate::external::WeatherSource;

/// Events kept for [`AlertPoller::recent_events`]
const RECENT_EVENTS_CAPACITY: usize = 50;

/// Broadcast channel buffer
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// `tokio::time::interval` panics on a zero period
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerConfig {
    /// Time between polling rounds
    pub interval: Duration,
    /// Minimum time between two alerts for the same location
    pub cooldown: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        AlertsConfig::default().into()
    }
}

impl From<AlertsConfig> for PollerConfig {
    fn from(config: AlertsConfig) -> Self {
        Self {
            interval: config.poll_interval(),
            cooldown: config.cooldown(),
        }
    }
}

/// A rule matched the latest conditions at its location
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertEvent {
    pub rule: NotificationRule,
    pub weather: WeatherSnapshot,
    pub message: String,
    pub triggered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollerStatus {
    pub running: bool,
    pub rules: usize,
    pub active_rules: usize,
    pub interval_secs: u64,
    pub cooldown_secs: u64,
}

struct PollerTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

struct Inner<S> {
    source: Arc<S>,
    config: PollerConfig,
    rules: RwLock<Vec<NotificationRule>>,
    last_fired: Mutex<HashMap<String, DateTime<Utc>>>,
    recent: Mutex<VecDeque<AlertEvent>>,
    events: broadcast::Sender<AlertEvent>,
    task: Mutex<Option<PollerTask>>,
}

/// Polls the weather source for active notification rules
pub struct AlertPoller<S> {
    inner: Arc<Inner<S>>,
}

impl<S> Clone for AlertPoller<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: WeatherSource + 'static> AlertPoller<S> {
    pub fn new(source: Arc<S>, mut config: PollerConfig) -> Self {
        config.interval = config.interval.max(MIN_POLL_INTERVAL);
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                source,
                config,
                rules: RwLock::new(Vec::new()),
                last_fired: Mutex::new(HashMap::new()),
                recent: Mutex::new(VecDeque::with_capacity(RECENT_EVENTS_CAPACITY)),
                events,
                task: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> PollerConfig {
        self.inner.config
    }

    /// Receive every alert emitted from now on
    pub fn subscribe(&self) -> broadcast::Receiver<AlertEvent> {
        self.inner.events.subscribe()
    }

    /// Start polling; the first round runs immediately. Returns `false` if already running.
    pub async fn start(&self) -> bool {
        let mut task = self.inner.task.lock().await;
        if task.as_ref().is_some_and(|t| !t.cancel.is_cancelled()) {
            return false;
        }

        let cancel = CancellationToken::new();
        let inner = Arc::clone(&self.inner);
        let token = cancel.clone();
        let handle = tokio::spawn(async move { inner.run(token).await });

        *task = Some(PollerTask { cancel, handle });
        tracing::info!(
            interval_secs = self.inner.config.interval.as_secs(),
            cooldown_secs = self.inner.config.cooldown.as_secs(),
            "Alert polling started"
        );
        true
    }

    /// Stop polling. Returns `false` if it was not running.
    pub async fn stop(&self) -> bool {
        let Some(task) = self.inner.task.lock().await.take() else {
            return false;
        };
        task.cancel.cancel();
        // In-flight fetches are left to finish; their results are dropped
        drop(task.handle);
        tracing::info!("Alert polling stopped");
        true
    }

    pub async fn is_running(&self) -> bool {
        self.inner
            .task
            .lock()
            .await
            .as_ref()
            .is_some_and(|t| !t.cancel.is_cancelled() && !t.handle.is_finished())
    }

    pub async fn status(&self) -> PollerStatus {
        let rules = self.inner.rules.read().await;
        PollerStatus {
            running: self.is_running().await,
            rules: rules.len(),
            active_rules: rules.iter().filter(|r| r.is_active()).count(),
            interval_secs: self.inner.config.interval.as_secs(),
            cooldown_secs: self.inner.config.cooldown.as_secs(),
        }
    }

    /// Replace the rule set without restarting the interval
    pub async fn reload_rules(&self, rules: Vec<NotificationRule>) {
        let count = rules.len();
        *self.inner.rules.write().await = rules;
        tracing::debug!(count, "Alert rules reloaded");
    }

    /// Add a rule, replacing any rule with the same id
    pub async fn add_rule(&self, rule: NotificationRule) {
        let mut rules = self.inner.rules.write().await;
        rules.retain(|r| r != &rule);
        rules.push(rule);
    }

    pub async fn remove_rule(&self, id: Uuid) -> bool {
        let mut rules = self.inner.rules.write().await;
        let before = rules.len();
        rules.retain(|r| r.id() != id);
        rules.len() != before
    }

    pub async fn rules(&self) -> Vec<NotificationRule> {
        self.inner.rules.read().await.clone()
    }

    /// Run one polling round now and return the alerts it emitted
    pub async fn check_now(&self) -> Vec<AlertEvent> {
        self.inner.check_round(&CancellationToken::new()).await
    }

    /// Most recent alerts, newest first
    pub async fn recent_events(&self, limit: usize) -> Vec<AlertEvent> {
        self.inner
            .recent
            .lock()
            .await
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect()
    }
}

impl<S: WeatherSource + 'static> Inner<S> {
    async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.config.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {}
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                events = self.check_round(&cancel) => {
                    if !events.is_empty() {
                        tracing::info!(count = events.len(), "Alert round emitted events");
                    }
                }
            }
        }

        tracing::debug!("Alert polling loop exited");
    }

    async fn check_round(&self, cancel: &CancellationToken) -> Vec<AlertEvent> {
        let now = Utc::now();
        let mut groups = self.active_groups().await;

        // Locations still cooling down are not fetched at all
        {
            let last_fired = self.last_fired.lock().await;
            groups.retain(|(location, _)| !self.cooling_down(&last_fired, location.key(), now));
        }
        if groups.is_empty() {
            return Vec::new();
        }

        let payloads = self.fetch_all(&groups).await;

        let mut emitted = Vec::new();
        for ((location, rules), payload) in groups.iter().zip(payloads) {
            if cancel.is_cancelled() {
                tracing::debug!("Discarding alert round results after stop");
                return emitted;
            }

            let payload = match payload {
                Some(Ok(payload)) => payload,
                Some(Err(e)) => {
                    tracing::warn!(location = %location, error = %e, "Weather fetch failed, skipping location");
                    continue;
                }
                None => continue,
            };

            if let Some(event) = self.evaluate_location(location, rules, &payload).await {
                if cancel.is_cancelled() {
                    tracing::debug!(location = %location, "Dropping alert raised after stop");
                    return emitted;
                }
                let _ = self.events.send(event.clone());
                self.remember(event.clone()).await;
                emitted.push(event);
            }
        }

        emitted
    }

    /// Active rules grouped by location key, in rule order
    async fn active_groups(&self) -> Vec<(Location, Vec<NotificationRule>)> {
        let rules = self.rules.read().await;
        let mut groups: Vec<(Location, Vec<NotificationRule>)> = Vec::new();

        for rule in rules.iter().filter(|r| r.is_active()) {
            match groups.iter_mut().find(|(loc, _)| loc == rule.location()) {
                Some((_, group)) => group.push(rule.clone()),
                None => groups.push((rule.location().clone(), vec![rule.clone()])),
            }
        }
        groups
    }

    /// One fetch per location, concurrently; results are in `groups` order
    async fn fetch_all(
        &self,
        groups: &[(Location, Vec<NotificationRule>)],
    ) -> Vec<Option<AppResult<Value>>> {
        let mut set = JoinSet::new();
        for (index, (location, _)) in groups.iter().enumerate() {
            let source = Arc::clone(&self.source);
            let (lat, lon) = (location.lat(), location.lon());
            set.spawn(async move { (index, source.fetch_current(lat, lon).await) });
        }

        let mut results: Vec<Option<AppResult<Value>>> = (0..groups.len()).map(|_| None).collect();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, result)) => results[index] = Some(result),
                Err(e) => tracing::warn!(error = %e, "Weather fetch task failed"),
            }
        }
        results
    }

    /// First matching rule for a location, if the location is not cooling down
    async fn evaluate_location(
        &self,
        location: &Location,
        rules: &[NotificationRule],
        payload: &Value,
    ) -> Option<AlertEvent> {
        for rule in rules {
            match rule.evaluate(payload) {
                Ok(Some(_)) => {}
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!(rule_id = %rule.id(), error = %e, "Rule evaluation failed");
                    continue;
                }
            }

            let weather = match WeatherSnapshot::from_payload(payload) {
                Ok(weather) => weather,
                Err(e) => {
                    tracing::warn!(location = %location, error = %e, "Invalid weather payload");
                    return None;
                }
            };

            let now = Utc::now();
            if !self.claim(location.key(), now).await {
                tracing::debug!(location = %location, "Alert suppressed by cooldown");
                return None;
            }

            return Some(AlertEvent {
                message: rule.notification_message(payload),
                rule: rule.clone(),
                weather,
                triggered_at: now,
            });
        }
        None
    }

    fn cooling_down(
        &self,
        last_fired: &HashMap<String, DateTime<Utc>>,
        key: &str,
        now: DateTime<Utc>,
    ) -> bool {
        last_fired.get(key).is_some_and(|last| {
            // A last-fired time in the future counts as cooling down
            (now - *last)
                .to_std()
                .map_or(true, |elapsed| elapsed < self.config.cooldown)
        })
    }

    /// Record a firing for `key` unless it is cooling down
    async fn claim(&self, key: &str, now: DateTime<Utc>) -> bool {
        let mut last_fired = self.last_fired.lock().await;
        if self.cooling_down(&last_fired, key, now) {
            return false;
        }
        last_fired.insert(key.to_string(), now);
        true
    }

    async fn remember(&self, event: AlertEvent) {
        let mut recent = self.recent.lock().await;
        if recent.len() == RECENT_EVENTS_CAPACITY {
            recent.pop_front();
        }
        recent.push_back(event);
    }
}
