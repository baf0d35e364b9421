//! Publish status poller tests

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use botdeploy::errors::DeployError;
use botdeploy::filesys::file::File;
use botdeploy::models::publish::{PublishStatus, PublishStatusKind, PublishTarget};
use botdeploy::publish::fsm::PublishState;
use botdeploy::publish::history::PublishHistoryStore;
use botdeploy::workers::poller::{
    HistoryStatusSource, Notification, Notifier, Options, PublishKey, PublishStatusSource,
    StatusPoller,
};

/// Replays scripted status codes, repeating the last one
struct ScriptedSource {
    script: Mutex<VecDeque<Option<u16>>>,
    fetches: AtomicUsize,
}

impl ScriptedSource {
    fn new(script: &[Option<u16>]) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.iter().copied().collect()),
            fetches: AtomicUsize::new(0),
        })
    }

    fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PublishStatusSource for ScriptedSource {
    async fn fetch_status(&self, _key: &PublishKey) -> Result<Option<PublishStatus>, DeployError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock().unwrap();
        let code = if script.len() > 1 {
            script.pop_front().flatten()
        } else {
            script.front().copied().flatten()
        };
        Ok(code.map(|code| PublishStatus::new(PublishStatusKind::from_code(code), "status")))
    }
}

#[derive(Default)]
struct RecordingNotifier {
    added: Mutex<Vec<Notification>>,
    removed: Mutex<Vec<Uuid>>,
}

impl RecordingNotifier {
    fn completions(&self) -> Vec<PublishStatusKind> {
        self.added
            .lock()
            .unwrap()
            .iter()
            .filter(|n| n.kind.is_terminal())
            .map(|n| n.kind)
            .collect()
    }

    fn pending(&self) -> usize {
        self.added
            .lock()
            .unwrap()
            .iter()
            .filter(|n| n.kind == PublishStatusKind::Pending)
            .count()
    }
}

impl Notifier for RecordingNotifier {
    fn add(&self, notification: Notification) {
        self.added.lock().unwrap().push(notification);
    }

    fn remove(&self, id: Uuid) {
        self.removed.lock().unwrap().push(id);
    }
}

fn poller(source: Arc<ScriptedSource>, notifier: Arc<RecordingNotifier>) -> StatusPoller {
    StatusPoller::new(Options::default(), source, notifier)
}

fn key() -> PublishKey {
    PublishKey::new("bot1", "prod")
}

#[tokio::test(start_paused = true)]
async fn test_pending_schedules_one_recheck() {
    let source = ScriptedSource::new(&[Some(202), Some(200)]);
    let notifier = Arc::new(RecordingNotifier::default());
    let poller = poller(source.clone(), notifier.clone());

    let batch = poller.begin_publish(&[key()]);
    assert_eq!(notifier.pending(), 1);

    assert_eq!(poller.check(&key()).await.unwrap(), PublishState::Pending);
    assert_eq!(source.fetches(), 1);

    tokio::time::sleep(Duration::from_millis(9_999)).await;
    assert_eq!(source.fetches(), 1);

    tokio::time::sleep(Duration::from_millis(2)).await;
    assert_eq!(source.fetches(), 2);
    assert_eq!(poller.state(&key()), PublishState::Succeeded);
    assert_eq!(notifier.completions(), vec![PublishStatusKind::Success]);
    assert_eq!(*notifier.removed.lock().unwrap(), vec![batch]);

    // nothing left scheduled
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(source.fetches(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_keeps_polling_while_pending() {
    let source = ScriptedSource::new(&[Some(202), Some(202), Some(202), Some(500)]);
    let notifier = Arc::new(RecordingNotifier::default());
    let poller = poller(source.clone(), notifier.clone());

    poller.begin_publish(&[key()]);
    poller.check(&key()).await.unwrap();

    tokio::time::sleep(Duration::from_millis(20_001)).await;
    assert_eq!(source.fetches(), 3);
    assert_eq!(poller.state(&key()), PublishState::Pending);

    tokio::time::sleep(Duration::from_millis(10_000)).await;
    assert_eq!(source.fetches(), 4);
    assert_eq!(poller.state(&key()), PublishState::Failed);
    assert_eq!(notifier.completions(), vec![PublishStatusKind::Failure]);
}

#[tokio::test(start_paused = true)]
async fn test_terminal_status_notifies_once_until_republish() {
    let source = ScriptedSource::new(&[Some(200)]);
    let notifier = Arc::new(RecordingNotifier::default());
    let poller = poller(source.clone(), notifier.clone());

    poller.begin_publish(&[key()]);
    poller.check(&key()).await.unwrap();
    poller.check(&key()).await.unwrap();
    poller.check(&key()).await.unwrap();
    assert_eq!(notifier.completions().len(), 1);

    poller.begin_publish(&[key()]);
    assert_eq!(poller.state(&key()), PublishState::Pending);
    poller.check(&key()).await.unwrap();
    assert_eq!(notifier.completions().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_republish_aborts_previous_timer() {
    let source = ScriptedSource::new(&[Some(202)]);
    let notifier = Arc::new(RecordingNotifier::default());
    let poller = poller(source.clone(), notifier.clone());

    poller.begin_publish(&[key()]);
    poller.check(&key()).await.unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;

    poller.begin_publish(&[key()]);
    tokio::time::sleep(Duration::from_secs(6)).await;
    assert_eq!(source.fetches(), 1);

    poller.check(&key()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(10_001)).await;
    assert_eq!(source.fetches(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_and_shutdown_stop_timers() {
    let source = ScriptedSource::new(&[Some(202)]);
    let notifier = Arc::new(RecordingNotifier::default());
    let poller = poller(source.clone(), notifier.clone());
    let other = PublishKey::new("bot1", "test");

    poller.begin_publish(&[key(), other.clone()]);
    poller.check(&key()).await.unwrap();
    poller.check(&other).await.unwrap();
    assert_eq!(source.fetches(), 2);

    poller.cancel(&key());
    assert_eq!(poller.state(&key()), PublishState::Idle);
    tokio::time::sleep(Duration::from_millis(10_001)).await;
    assert_eq!(source.fetches(), 3);

    poller.shutdown();
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(source.fetches(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_batch_pending_notification_dismissed_once() {
    let source = ScriptedSource::new(&[Some(200)]);
    let notifier = Arc::new(RecordingNotifier::default());
    let poller = poller(source.clone(), notifier.clone());
    let other = PublishKey::new("bot1", "test");

    let batch = poller.begin_publish(&[key(), other.clone()]);
    assert_eq!(notifier.pending(), 1);

    poller.check(&key()).await.unwrap();
    poller.check(&other).await.unwrap();

    assert_eq!(notifier.completions().len(), 2);
    assert_eq!(*notifier.removed.lock().unwrap(), vec![batch]);
}

#[tokio::test(start_paused = true)]
async fn test_observe_polls_once_after_reload() {
    let source = ScriptedSource::new(&[None, Some(200)]);
    let notifier = Arc::new(RecordingNotifier::default());
    let poller = poller(source.clone(), notifier.clone());
    let target = PublishTarget {
        name: "prod".to_string(),
        target_type: "azurePublish".to_string(),
        last_published: Some(Utc::now()),
    };

    let state = poller.observe(&key(), &target).await.unwrap();

    assert_eq!(state, PublishState::Succeeded);
    assert_eq!(source.fetches(), 2);
    assert_eq!(notifier.completions(), vec![PublishStatusKind::Success]);
}

#[tokio::test(start_paused = true)]
async fn test_observe_without_any_status_returns_to_idle() {
    let source = ScriptedSource::new(&[None]);
    let notifier = Arc::new(RecordingNotifier::default());
    let poller = poller(source.clone(), notifier.clone());
    let target = PublishTarget {
        name: "prod".to_string(),
        target_type: "azurePublish".to_string(),
        last_published: Some(Utc::now()),
    };

    assert_eq!(
        poller.observe(&key(), &target).await.unwrap(),
        PublishState::Idle
    );
    assert_eq!(source.fetches(), 2);
    assert!(!poller.is_polling(&key()));

    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(poller.state(&key()), PublishState::Idle);
    assert_eq!(source.fetches(), 2);
    assert!(notifier.added.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_is_polling_follows_timer() {
    let source = ScriptedSource::new(&[Some(202), Some(200)]);
    let notifier = Arc::new(RecordingNotifier::default());
    let poller = poller(source.clone(), notifier.clone());

    poller.begin_publish(&[key()]);
    assert!(!poller.is_polling(&key()));

    poller.check(&key()).await.unwrap();
    assert!(poller.is_polling(&key()));

    tokio::time::sleep(Duration::from_millis(10_001)).await;
    tokio::task::yield_now().await;
    assert_eq!(poller.state(&key()), PublishState::Succeeded);
    assert!(!poller.is_polling(&key()));
}

#[tokio::test(start_paused = true)]
async fn test_observe_ignores_never_published_target() {
    let source = ScriptedSource::new(&[None]);
    let notifier = Arc::new(RecordingNotifier::default());
    let poller = poller(source.clone(), notifier.clone());
    let target = PublishTarget {
        name: "prod".to_string(),
        target_type: "azurePublish".to_string(),
        last_published: None,
    };

    assert_eq!(
        poller.observe(&key(), &target).await.unwrap(),
        PublishState::Idle
    );
    assert_eq!(source.fetches(), 1);
    assert!(notifier.added.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_observe_finished_history_does_not_notify() {
    let source = ScriptedSource::new(&[Some(500)]);
    let notifier = Arc::new(RecordingNotifier::default());
    let poller = poller(source.clone(), notifier.clone());
    let target = PublishTarget {
        name: "prod".to_string(),
        target_type: "azurePublish".to_string(),
        last_published: Some(Utc::now()),
    };

    assert_eq!(
        poller.observe(&key(), &target).await.unwrap(),
        PublishState::Failed
    );
    assert!(notifier.completions().is_empty());
}

#[tokio::test]
async fn test_history_status_source() {
    let dir = tempfile::tempdir().unwrap();
    let store = PublishHistoryStore::new(File::new(dir.path().join("publishHistory.json")));
    let notifier = Arc::new(RecordingNotifier::default());
    let poller = StatusPoller::new(
        Options::default(),
        Arc::new(HistoryStatusSource::new(store.clone())),
        notifier.clone(),
    );

    poller.begin_publish(&[key()]);
    store
        .append("prod", PublishStatus::new(PublishStatusKind::Success, "Done"))
        .await
        .unwrap();

    assert_eq!(poller.check(&key()).await.unwrap(), PublishState::Succeeded);
    assert_eq!(notifier.completions(), vec![PublishStatusKind::Success]);
    poller.shutdown();
}
