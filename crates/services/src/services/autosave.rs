use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use db::models::project::{Project, ProjectError};
use serde::Serialize;
use tokio::sync::{Mutex, Notify, OwnedMutexGuard, broadcast};
use ts_rs::TS;

use super::{
    config::{AutosaveConfig, DEFAULT_DEBOUNCE_MS, DEFAULT_WRITE_TIMEOUT_MS},
    store::ProjectStore,
};

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutosavePolicy {
    /// How long a burst of edits is coalesced before a write is issued.
    pub debounce: Duration,
    /// Upper bound on a single store write.
    pub write_timeout: Duration,
}

impl Default for AutosavePolicy {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            write_timeout: Duration::from_millis(DEFAULT_WRITE_TIMEOUT_MS),
        }
    }
}

impl From<&AutosaveConfig> for AutosavePolicy {
    fn from(config: &AutosaveConfig) -> Self {
        Self {
            debounce: config.debounce(),
            write_timeout: config.write_timeout(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum WriteFailure {
    Conflict,
    NotFound,
    Timeout,
    Store,
}

impl From<&ProjectError> for WriteFailure {
    fn from(err: &ProjectError) -> Self {
        match err {
            ProjectError::Conflict { .. } => Self::Conflict,
            ProjectError::ProjectNotFound => Self::NotFound,
            _ => Self::Store,
        }
    }
}

/// Outcome of one autosave write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export)]
pub enum SyncEvent {
    Saved {
        project_id: String,
        version: i32,
        #[ts(type = "Date")]
        updated_at: DateTime<Utc>,
    },
    Failed {
        project_id: String,
        failure: WriteFailure,
        message: String,
    },
}

/// Last write the store accepted for a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Confirmed {
    pub version: i32,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Slot {
    pending: Option<Project>,
    running: bool,
    confirmed: Option<Confirmed>,
    writer: Arc<Mutex<()>>,
}

/// Debounced background writer with one pending snapshot per document.
///
/// A newer snapshot replaces an older one that has not been written yet.
/// Writes for the same document never overlap, including direct writes made
/// under [`AutosaveQueue::lock_writes`]; each is bounded by the policy's
/// write timeout.
#[derive(Clone)]
pub struct AutosaveQueue {
    inner: Arc<QueueInner>,
}

struct QueueInner {
    store: Arc<dyn ProjectStore>,
    policy: AutosavePolicy,
    slots: DashMap<String, Slot>,
    events: broadcast::Sender<SyncEvent>,
    idle: Notify,
}

impl AutosaveQueue {
    pub fn new(store: Arc<dyn ProjectStore>, policy: AutosavePolicy) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(QueueInner {
                store,
                policy,
                slots: DashMap::new(),
                events,
                idle: Notify::new(),
            }),
        }
    }

    pub fn policy(&self) -> AutosavePolicy {
        self.inner.policy
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.inner.events.subscribe()
    }

    /// Queues `snapshot` for writing, superseding any pending snapshot of the
    /// same document.
    pub fn schedule(&self, snapshot: Project) {
        let project_id = snapshot.id.clone();
        let start_worker = {
            let mut slot = self.inner.slots.entry(project_id.clone()).or_default();
            if slot.pending.replace(snapshot).is_some() {
                tracing::trace!("Superseded pending snapshot of project {project_id}");
            }
            !std::mem::replace(&mut slot.running, true)
        };

        if start_worker {
            let inner = self.inner.clone();
            tokio::spawn(async move { inner.drain(project_id).await });
        }
    }

    /// Drops a snapshot that has not been written yet. An in-flight write is
    /// not interrupted.
    pub fn discard(&self, project_id: &str) -> bool {
        self.inner
            .slots
            .get_mut(project_id)
            .and_then(|mut slot| slot.pending.take())
            .is_some()
    }

    pub fn is_busy(&self, project_id: &str) -> bool {
        self.inner
            .slots
            .get(project_id)
            .is_some_and(|slot| slot.running || slot.pending.is_some())
    }

    pub fn confirmed(&self, project_id: &str) -> Option<Confirmed> {
        self.inner.slots.get(project_id).and_then(|slot| slot.confirmed)
    }

    /// Records a write made outside the queue so later snapshots build on it.
    pub fn record_confirmed(&self, project_id: &str, confirmed: Confirmed) {
        let mut slot = self.inner.slots.entry(project_id.to_string()).or_default();
        if slot.confirmed.is_none_or(|current| current.version < confirmed.version) {
            slot.confirmed = Some(confirmed);
        }
    }

    /// Blocks autosave writes of `project_id` until the guard is dropped.
    pub async fn lock_writes(&self, project_id: &str) -> OwnedMutexGuard<()> {
        self.inner.writer(project_id).lock_owned().await
    }

    /// Drops all bookkeeping for a document that no longer exists.
    pub fn forget(&self, project_id: &str) {
        self.inner.slots.remove(project_id);
    }

    /// Waits until nothing is pending or in flight for `project_id`.
    pub async fn flush(&self, project_id: &str) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if !self.is_busy(project_id) {
                return;
            }
            notified.await;
        }
    }

    pub async fn flush_all(&self) {
        let busy: Vec<String> = self
            .inner
            .slots
            .iter()
            .filter(|slot| slot.running || slot.pending.is_some())
            .map(|slot| slot.key().clone())
            .collect();
        for project_id in busy {
            self.flush(&project_id).await;
        }
    }
}

impl QueueInner {
    fn writer(&self, project_id: &str) -> Arc<Mutex<()>> {
        self.slots
            .entry(project_id.to_string())
            .or_default()
            .writer
            .clone()
    }

    async fn drain(self: Arc<Self>, project_id: String) {
        loop {
            tokio::time::sleep(self.policy.debounce).await;

            let writer = self.writer(&project_id);
            let _guard = writer.lock().await;
            let Some(snapshot) = self.take_pending(&project_id) else {
                break;
            };
            let event = self.write(snapshot).await;
            let _ = self.events.send(event);
        }
        self.idle.notify_waiters();
    }

    /// Takes the pending snapshot, raised to the last confirmed version when
    /// it was taken from an older copy, or marks the slot idle when there is
    /// none.
    fn take_pending(&self, project_id: &str) -> Option<Project> {
        let mut slot = self.slots.get_mut(project_id)?;
        match slot.pending.take() {
            Some(mut snapshot) => {
                if let Some(confirmed) = slot.confirmed {
                    snapshot.version = snapshot.version.max(confirmed.version);
                }
                Some(snapshot)
            }
            None => {
                slot.running = false;
                None
            }
        }
    }

    async fn write(&self, snapshot: Project) -> SyncEvent {
        let project_id = snapshot.id.clone();
        match tokio::time::timeout(self.policy.write_timeout, self.store.replace(&snapshot)).await
        {
            Ok(Ok(stored)) => {
                let confirmed = Confirmed {
                    version: stored.version,
                    updated_at: stored.updated_at,
                };
                if let Some(mut slot) = self.slots.get_mut(&project_id) {
                    slot.confirmed = Some(confirmed);
                }
                SyncEvent::Saved {
                    project_id,
                    version: confirmed.version,
                    updated_at: confirmed.updated_at,
                }
            }
            Ok(Err(err)) => {
                tracing::warn!("Autosave of project {project_id} failed: {err}");
                SyncEvent::Failed {
                    project_id,
                    failure: WriteFailure::from(&err),
                    message: err.to_string(),
                }
            }
            Err(_) => {
                tracing::warn!(
                    "Autosave of project {project_id} timed out after {:?}",
                    self.policy.write_timeout
                );
                SyncEvent::Failed {
                    project_id,
                    failure: WriteFailure::Timeout,
                    message: format!("write timed out after {:?}", self.policy.write_timeout),
                }
            }
        }
    }
}
