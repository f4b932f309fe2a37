//! Publishes the final statistics of each run to whoever is watching.
//!
//! The registry holds at most one subscriber. Subscribing again replaces the
//! previous subscriber, and the last published snapshot is kept so a viewer
//! that attaches late can still pull it.

use crate::state::stats::RunStatistics;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Weak};

type Callback = Arc<dyn Fn(&RunStatistics) + Send + Sync>;

#[derive(Default)]
struct Inner {
    next_id: u64,
    subscriber: Option<(u64, Callback)>,
    last: Option<RunStatistics>,
}

/// Shared, cloneable handle to the dashboard channel.
#[derive(Clone, Default)]
pub struct DashboardRegistry {
    inner: Arc<Mutex<Inner>>,
}

impl DashboardRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `callback`, replacing any current subscriber.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&RunStatistics) + Send + Sync + 'static,
    {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.next_id += 1;
        let id = inner.next_id;
        if inner.subscriber.replace((id, Arc::new(callback))).is_some() {
            tracing::debug!("dashboard subscriber replaced");
        }
        Subscription {
            id,
            registry: Arc::downgrade(&self.inner),
        }
    }

    /// Record `stats` as the latest result and hand it to the subscriber.
    /// With nobody subscribed this only updates [`last`](Self::last).
    pub fn publish(&self, stats: &RunStatistics) {
        let callback = {
            let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            inner.last = Some(stats.clone());
            inner.subscriber.as_ref().map(|(_, cb)| cb.clone())
        };
        if let Some(cb) = callback {
            cb(stats);
        }
    }

    pub fn last(&self) -> Option<RunStatistics> {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .last
            .clone()
    }

    pub fn has_subscriber(&self) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .subscriber
            .is_some()
    }
}

/// Keeps a subscriber attached. Dropping or disposing it detaches the
/// subscriber, unless a newer subscription already replaced it.
#[must_use = "dropping a Subscription detaches the subscriber"]
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<Inner>>,
}

impl Subscription {
    pub fn dispose(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(inner) = self.registry.upgrade() else {
            return;
        };
        let mut inner = inner.lock().unwrap_or_else(|e| e.into_inner());
        if inner.subscriber.as_ref().is_some_and(|(id, _)| *id == self.id) {
            inner.subscriber = None;
        }
    }
}

// ── status.json ──

/// Snapshot written to the status file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    pub status: String,
    pub stats: RunStatistics,
}

/// Dashboard subscriber that mirrors each published result to a JSON file.
#[derive(Debug, Clone)]
pub struct StatusFileSubscriber {
    path: PathBuf,
}

impl StatusFileSubscriber {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn write(&self, stats: &RunStatistics) {
        let status = if stats.processed_files < stats.total_files {
            "cancelled"
        } else {
            "completed"
        };
        let snapshot = StatusSnapshot {
            status: status.to_string(),
            stats: stats.clone(),
        };
        let result = serde_json::to_string_pretty(&snapshot)
            .context("serializing status")
            .and_then(|data| sweep_store::write_atomic(&self.path, data.as_bytes()));
        if let Err(e) = result {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to write status file");
        }
    }

    /// Attach to `registry`; the status file follows every publish.
    pub fn attach(self, registry: &DashboardRegistry) -> Subscription {
        registry.subscribe(move |stats| self.write(stats))
    }
}

pub fn read_status(path: &Path) -> Result<StatusSnapshot> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}
