//! Background reconciliation of catalog results into the store.
//!
//! Lookup responses are served before any persistence happens; the snapshot
//! of local and catalog results is handed to a single worker through a
//! bounded queue. The worker runs under its own cancellation scope (a child
//! of the server shutdown token, never of a request) so an impatient caller
//! cannot abort work that is already in flight. Every per-item result is
//! recorded as a structured outcome: failures are dropped, not surfaced, and
//! the outcome log is where they remain observable.

use super::change::needs_update;
use crate::config::ReconcileSettings;
use crate::media_store::{MediaRecord, MediaStore};
use crate::server::metrics;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// A snapshot taken during lookup, to be reconciled in the background.
#[derive(Debug)]
pub struct ReconcileTask {
    pub keyword: String,
    pub local: Vec<MediaRecord>,
    pub catalog: Vec<MediaRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileAction {
    Created,
    Updated,
    Unchanged,
    Failed,
}

impl ReconcileAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcileAction::Created => "created",
            ReconcileAction::Updated => "updated",
            ReconcileAction::Unchanged => "unchanged",
            ReconcileAction::Failed => "failed",
        }
    }
}

/// What happened to one catalog entry during a reconcile pass.
#[derive(Debug, Clone, Serialize)]
pub struct ReconcileOutcome {
    pub keyword: String,
    pub kinopoisk_id: i64,
    pub action: ReconcileAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub at: DateTime<Utc>,
}

/// Bounded in-memory log of recent reconcile outcomes.
pub struct ReconcileLog {
    capacity: usize,
    entries: Mutex<VecDeque<ReconcileOutcome>>,
}

impl ReconcileLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    fn record(&self, outcome: ReconcileOutcome) {
        let mut entries = self.entries.lock().unwrap();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(outcome);
    }

    /// Most recent outcomes, newest first.
    pub fn recent(&self, limit: usize) -> Vec<ReconcileOutcome> {
        let entries = self.entries.lock().unwrap();
        entries.iter().rev().take(limit).cloned().collect()
    }

    pub fn count(&self, action: ReconcileAction) -> usize {
        let entries = self.entries.lock().unwrap();
        entries.iter().filter(|o| o.action == action).count()
    }
}

/// Handle for submitting reconcile work. Cheap to clone; owned by the
/// service while the worker owns the receiving end.
#[derive(Clone)]
pub struct Reconciler {
    sender: mpsc::Sender<ReconcileTask>,
    log: Arc<ReconcileLog>,
}

impl Reconciler {
    /// Enqueue a snapshot without blocking. A full queue drops the task;
    /// the caller's response is already on its way and a later search of
    /// the same keyword re-submits the same work.
    pub fn submit(&self, task: ReconcileTask) -> bool {
        match self.sender.try_send(task) {
            Ok(()) => true,
            Err(TrySendError::Full(task)) => {
                warn!(
                    "Reconcile queue full, dropping snapshot for keyword {:?}",
                    task.keyword
                );
                metrics::record_reconcile_dropped();
                false
            }
            Err(TrySendError::Closed(task)) => {
                warn!(
                    "Reconcile worker gone, dropping snapshot for keyword {:?}",
                    task.keyword
                );
                false
            }
        }
    }

    pub fn log(&self) -> Arc<ReconcileLog> {
        Arc::clone(&self.log)
    }
}

pub struct ReconcileWorker {
    receiver: mpsc::Receiver<ReconcileTask>,
    store: Arc<dyn MediaStore>,
    log: Arc<ReconcileLog>,
    cancel: CancellationToken,
    task_timeout: Duration,
}

impl ReconcileWorker {
    pub async fn run(mut self) {
        info!("Reconcile worker started");
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("Reconcile worker shutting down");
                    break;
                }
                task = self.receiver.recv() => {
                    let Some(task) = task else { break };
                    let keyword = task.keyword.clone();
                    if tokio::time::timeout(self.task_timeout, self.process(task))
                        .await
                        .is_err()
                    {
                        warn!("Reconciliation for keyword {:?} timed out", keyword);
                    }
                }
            }
        }
        info!("Reconcile worker stopped");
    }

    async fn process(&self, task: ReconcileTask) {
        debug!(
            "Reconciling {} catalog results for keyword {:?}",
            task.catalog.len(),
            task.keyword
        );

        let local_by_id: HashMap<i64, &MediaRecord> = task
            .local
            .iter()
            .map(|r| (r.kinopoisk_id, r))
            .collect();

        for candidate in &task.catalog {
            if self.cancel.is_cancelled() {
                return;
            }

            let (action, error) =
                self.reconcile_one(local_by_id.get(&candidate.kinopoisk_id).copied(), candidate);

            if let Some(msg) = &error {
                warn!(
                    "Reconcile {} for kinopoisk_id {} failed: {}",
                    task.keyword, candidate.kinopoisk_id, msg
                );
            }
            metrics::record_reconcile_outcome(action.as_str());
            self.log.record(ReconcileOutcome {
                keyword: task.keyword.clone(),
                kinopoisk_id: candidate.kinopoisk_id,
                action,
                error,
                at: Utc::now(),
            });
        }
    }

    fn reconcile_one(
        &self,
        local: Option<&MediaRecord>,
        candidate: &MediaRecord,
    ) -> (ReconcileAction, Option<String>) {
        match local {
            Some(existing) => {
                if !needs_update(Some(existing), Some(candidate)) {
                    return (ReconcileAction::Unchanged, None);
                }
                // Carry over the internal id; everything else comes from the catalog.
                let mut updated = candidate.clone();
                updated.id = existing.id;
                match self.store.update(&updated) {
                    Ok(_) => (ReconcileAction::Updated, None),
                    Err(err) => (ReconcileAction::Failed, Some(err.to_string())),
                }
            }
            None => match self.store.create(candidate) {
                Ok(_) => (ReconcileAction::Created, None),
                Err(err) => (ReconcileAction::Failed, Some(err.to_string())),
            },
        }
    }
}

/// Build a connected (handle, worker) pair without spawning; tests drive the
/// worker themselves.
pub fn reconcile_channel(
    store: Arc<dyn MediaStore>,
    settings: &ReconcileSettings,
    shutdown: &CancellationToken,
) -> (Reconciler, ReconcileWorker) {
    let (sender, receiver) = mpsc::channel(settings.queue_capacity);
    let log = Arc::new(ReconcileLog::new(settings.outcome_log_capacity));
    let worker = ReconcileWorker {
        receiver,
        store,
        log: Arc::clone(&log),
        cancel: shutdown.child_token(),
        task_timeout: Duration::from_secs(settings.task_timeout_sec),
    };
    (Reconciler { sender, log }, worker)
}

/// Spawn the worker onto the runtime and return the submission handle.
pub fn spawn_reconciler(
    store: Arc<dyn MediaStore>,
    settings: &ReconcileSettings,
    shutdown: &CancellationToken,
) -> Reconciler {
    let (reconciler, worker) = reconcile_channel(store, settings, shutdown);
    tokio::spawn(worker.run());
    reconciler
}
