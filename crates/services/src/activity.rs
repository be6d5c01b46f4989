//! # Activity Recorder
//!
//! Fire-and-forget dispatch of activity entries to an [`ActivityLog`] sink.
//!
//! Callers enqueue into a bounded channel and never wait on the sink. A single
//! detached worker drains the channel, skipping writes while the sink reports
//! itself not ready. Sink failures are logged and dropped; they never reach
//! the request that produced the entry.

use std::sync::Arc;

use domains::{ActivityAction, ActivityLog, ActivityLogEntry, UserId};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

#[derive(Clone)]
pub struct ActivityRecorder {
    tx: Option<mpsc::Sender<ActivityLogEntry>>,
}

impl ActivityRecorder {
    /// Spawns the drain worker on the current runtime.
    ///
    /// The worker exits once every clone of the returned recorder is dropped
    /// and the queue is empty.
    pub fn spawn(sink: Arc<dyn ActivityLog>, capacity: usize) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handle = tokio::spawn(drain(sink, rx));
        (Self { tx: Some(tx) }, handle)
    }

    /// A recorder that discards every entry.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.tx.is_some()
    }

    /// Enqueues an entry without waiting. Returns `false` if it was dropped.
    pub fn record(&self, user_id: UserId, action: ActivityAction, details: serde_json::Value) -> bool {
        let Some(tx) = &self.tx else {
            return false;
        };

        match tx.try_send(ActivityLogEntry::new(user_id, action, details)) {
            Ok(()) => true,
            Err(TrySendError::Full(entry)) => {
                warn!(action = entry.action.as_str(), "activity queue full, dropping entry");
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!("activity worker stopped, dropping entry");
                false
            }
        }
    }
}

async fn drain(sink: Arc<dyn ActivityLog>, mut rx: mpsc::Receiver<ActivityLogEntry>) {
    while let Some(entry) = rx.recv().await {
        if !sink.is_ready() {
            warn!(action = entry.action.as_str(), "activity log not ready, skipping entry");
            continue;
        }
        if let Err(e) = sink.append(&entry).await {
            error!(action = entry.action.as_str(), error = %e, "failed to record activity entry");
        }
    }
    debug!("activity worker drained");
}
