//! Publish status poller
//!
//! Tracks each (bot, target) publish until a terminal status is read back,
//! re-checking a pending publish every `Options::interval`. Every key owns at
//! most one timer task; a new publish, `cancel` or `shutdown` aborts it.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::errors::DeployError;
use crate::models::publish::{PublishStatus, PublishStatusKind, PublishTarget};
use crate::publish::fsm::{PollAction, PublishEvent, PublishFsm, PublishState};
use crate::publish::history::PublishHistoryStore;

/// Poller worker options
#[derive(Debug, Clone)]
pub struct Options {
    /// Delay before re-checking a pending publish
    pub interval: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(10_000),
        }
    }
}

/// A bot and one of its publish targets
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PublishKey {
    pub bot: String,
    pub target: String,
}

impl PublishKey {
    pub fn new(bot: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            bot: bot.into(),
            target: target.into(),
        }
    }
}

/// Status-check interface the poller calls
#[async_trait]
pub trait PublishStatusSource: Send + Sync {
    /// Latest status of the key, `None` when nothing was recorded yet
    async fn fetch_status(&self, key: &PublishKey) -> Result<Option<PublishStatus>, DeployError>;
}

/// Reads the latest snapshot from the project's publish history
pub struct HistoryStatusSource {
    store: PublishHistoryStore,
}

impl HistoryStatusSource {
    pub fn new(store: PublishHistoryStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl PublishStatusSource for HistoryStatusSource {
    async fn fetch_status(&self, key: &PublishKey) -> Result<Option<PublishStatus>, DeployError> {
        self.store.latest(&key.target).await
    }
}

/// User-facing notification
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: Uuid,
    pub kind: PublishStatusKind,
    pub title: String,
    pub description: String,
}

impl Notification {
    fn pending(keys: &[PublishKey]) -> Self {
        let targets: Vec<&str> = keys.iter().map(|k| k.target.as_str()).collect();
        Self {
            id: Uuid::new_v4(),
            kind: PublishStatusKind::Pending,
            title: "Publishing".to_string(),
            description: format!("Publishing to {}", targets.join(", ")),
        }
    }

    fn completed(key: &PublishKey, kind: PublishStatusKind, status: &PublishStatus) -> Self {
        let title = match kind {
            PublishStatusKind::Success => "Publish succeeded",
            _ => "Publish failed",
        };
        Self {
            id: Uuid::new_v4(),
            kind,
            title: title.to_string(),
            description: format!("{} to {}: {}", key.bot, key.target, status.message),
        }
    }
}

pub trait Notifier: Send + Sync {
    fn add(&self, notification: Notification);
    fn remove(&self, id: Uuid);
}

/// Writes notifications to the log
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn add(&self, notification: Notification) {
        match notification.kind {
            PublishStatusKind::Failure => {
                error!("{}: {}", notification.title, notification.description)
            }
            _ => info!("{}: {}", notification.title, notification.description),
        }
    }

    fn remove(&self, id: Uuid) {
        debug!("Dismissed notification {}", id);
    }
}

#[derive(Default)]
struct Tracker {
    fsm: PublishFsm,
    timer: Option<JoinHandle<()>>,
    /// Pending notification of the batch this publish belongs to
    batch: Option<Uuid>,
}

impl Tracker {
    fn abort_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

struct Inner {
    options: Options,
    source: Arc<dyn PublishStatusSource>,
    notifier: Arc<dyn Notifier>,
    trackers: Mutex<HashMap<PublishKey, Tracker>>,
    pending_batches: Mutex<HashSet<Uuid>>,
}

impl Inner {
    /// Fetch the status once and apply it. Never schedules.
    async fn fetch_and_apply(&self, key: &PublishKey) -> Result<PollAction, DeployError> {
        let Some(status) = self.source.fetch_status(key).await? else {
            return Ok(PollAction::Nothing);
        };
        Ok(self.apply(key, &status))
    }

    fn apply(&self, key: &PublishKey, status: &PublishStatus) -> PollAction {
        let kind = status.kind();
        let (action, batch) = {
            let mut trackers = self.trackers.lock().unwrap_or_else(|e| e.into_inner());
            let tracker = trackers.entry(key.clone()).or_default();
            let action = tracker.fsm.process(PublishEvent::Observed(kind));
            let batch = match action {
                PollAction::Notify(_) => tracker.batch.take(),
                _ => None,
            };
            (action, batch)
        };

        if let PollAction::Notify(kind) = action {
            info!("Publish of {} to {} finished: {:?}", key.bot, key.target, kind);
            if let Some(batch) = batch {
                let first_in_batch = self
                    .pending_batches
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .remove(&batch);
                if first_in_batch {
                    self.notifier.remove(batch);
                }
            }
            self.notifier.add(Notification::completed(key, kind, status));
        }
        action
    }
}

/// Polls publish status per (bot, target)
#[derive(Clone)]
pub struct StatusPoller {
    inner: Arc<Inner>,
}

impl StatusPoller {
    pub fn new(
        options: Options,
        source: Arc<dyn PublishStatusSource>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                options,
                source,
                notifier,
                trackers: Mutex::new(HashMap::new()),
                pending_batches: Mutex::new(HashSet::new()),
            }),
        }
    }

    /// Current state of a key
    pub fn state(&self, key: &PublishKey) -> PublishState {
        self.inner
            .trackers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .map(|t| t.fsm.state())
            .unwrap_or(PublishState::Idle)
    }

    /// Start tracking a batch publish. Raises one pending notification for
    /// the batch and resets every key, aborting timers left from earlier publishes.
    pub fn begin_publish(&self, keys: &[PublishKey]) -> Uuid {
        let notification = Notification::pending(keys);
        let batch = notification.id;
        self.inner
            .pending_batches
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(batch);
        self.inner.notifier.add(notification);

        let mut trackers = self.inner.trackers.lock().unwrap_or_else(|e| e.into_inner());
        for key in keys {
            let tracker = trackers.entry(key.clone()).or_default();
            tracker.abort_timer();
            tracker.fsm.process(PublishEvent::Publish);
            tracker.batch = Some(batch);
        }
        batch
    }

    /// Check the status of a key now, scheduling a re-check while it is pending
    pub async fn check(&self, key: &PublishKey) -> Result<PublishState, DeployError> {
        let action = self.inner.fetch_and_apply(key).await?;
        if action == PollAction::Recheck {
            self.schedule(key);
        }
        Ok(self.state(key))
    }

    /// Reconcile a target after a reload. An empty history with a
    /// `lastPublished` stamp is a publish still in flight: it is polled once.
    pub async fn observe(
        &self,
        key: &PublishKey,
        target: &PublishTarget,
    ) -> Result<PublishState, DeployError> {
        match self.inner.source.fetch_status(key).await? {
            Some(status) => {
                if self.inner.apply(key, &status) == PollAction::Recheck {
                    self.schedule(key);
                }
                Ok(self.state(key))
            }
            None if target.last_published.is_some() => {
                debug!("{} has no history for {}, polling once", key.bot, key.target);
                {
                    let mut trackers =
                        self.inner.trackers.lock().unwrap_or_else(|e| e.into_inner());
                    let tracker = trackers.entry(key.clone()).or_default();
                    if tracker.fsm.state() == PublishState::Idle {
                        tracker.fsm.process(PublishEvent::Publish);
                    }
                }
                match self.inner.fetch_and_apply(key).await? {
                    PollAction::Recheck => self.schedule(key),
                    PollAction::Nothing if self.state(key) == PublishState::Pending => {
                        // still nothing recorded: there is no publish to follow
                        debug!("No status for {} on {}, back to idle", key.bot, key.target);
                        self.reset(key);
                    }
                    _ => {}
                }
                Ok(self.state(key))
            }
            None => Ok(self.state(key)),
        }
    }

    /// Whether a re-check timer is live for the key
    pub fn is_polling(&self, key: &PublishKey) -> bool {
        self.inner
            .trackers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .and_then(|t| t.timer.as_ref())
            .is_some_and(|timer| !timer.is_finished())
    }

    fn reset(&self, key: &PublishKey) {
        let mut trackers = self.inner.trackers.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(tracker) = trackers.get_mut(key) {
            tracker.abort_timer();
            tracker.fsm.process(PublishEvent::Reset);
            tracker.batch = None;
        }
    }

    /// Stop tracking a key
    pub fn cancel(&self, key: &PublishKey) {
        let mut trackers = self.inner.trackers.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(mut tracker) = trackers.remove(key) {
            tracker.abort_timer();
        }
    }

    /// Abort every timer
    pub fn shutdown(&self) {
        info!("Poller worker shutting down...");
        let mut trackers = self.inner.trackers.lock().unwrap_or_else(|e| e.into_inner());
        for tracker in trackers.values_mut() {
            tracker.abort_timer();
            tracker.fsm.process(PublishEvent::Reset);
        }
    }

    fn schedule(&self, key: &PublishKey) {
        let inner = Arc::clone(&self.inner);
        let task_key = key.clone();
        let interval = self.inner.options.interval;

        let mut trackers = self.inner.trackers.lock().unwrap_or_else(|e| e.into_inner());
        let tracker = trackers.entry(key.clone()).or_default();
        tracker.abort_timer();
        tracker.timer = Some(tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                debug!("Re-checking {} on {}", task_key.bot, task_key.target);
                match inner.fetch_and_apply(&task_key).await {
                    Ok(PollAction::Recheck) => continue,
                    Ok(_) => break,
                    Err(e) => {
                        warn!("Status check of {} failed: {}", task_key.target, e);
                        break;
                    }
                }
            }
        }));
    }
}
