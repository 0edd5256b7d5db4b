//! Background mutations
//!
//! Remote calls that change data run off the UI thread. Each submitted job
//! runs on its own short-lived thread and reports a `JobOutcome` back over
//! an mpsc channel; the event loop drains finished outcomes every tick.

use crate::api::{AdminBackend, ApiError};
use crate::types::{ResourceKind, RowKey};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// One-shot row actions that go through a confirmation popup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowAction {
    Resend,
    Publish,
    Archive,
}

impl RowAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RowAction::Resend => "Resend",
            RowAction::Publish => "Publish",
            RowAction::Archive => "Archive",
        }
    }

    pub fn past_tense(&self) -> &'static str {
        match self {
            RowAction::Resend => "resent",
            RowAction::Publish => "published",
            RowAction::Archive => "archived",
        }
    }

    pub fn kind(&self) -> ResourceKind {
        match self {
            RowAction::Resend => ResourceKind::Notification,
            RowAction::Publish | RowAction::Archive => ResourceKind::Survey,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Job {
    Delete {
        key: RowKey,
        label: String,
    },
    BulkDelete {
        kind: ResourceKind,
        ids: Vec<String>,
    },
    SetUserStatus {
        id: String,
        active: bool,
        previous: bool,
    },
    Action {
        action: RowAction,
        id: String,
        title: String,
    },
}

#[derive(Debug)]
pub enum JobOutcome {
    Deleted {
        key: RowKey,
        label: String,
        result: Result<(), ApiError>,
    },
    BulkDeleted {
        kind: ResourceKind,
        deleted: Vec<String>,
        failed: Vec<(String, String)>,
    },
    UserStatus {
        id: String,
        active: bool,
        previous: bool,
        result: Result<(), ApiError>,
    },
    Action {
        action: RowAction,
        title: String,
        result: Result<(), ApiError>,
    },
}

/// Execute a job against the backend, blocking the calling thread
pub fn execute(backend: &dyn AdminBackend, job: Job) -> JobOutcome {
    match job {
        Job::Delete { key, label } => {
            let result = backend.delete(key.kind, &key.id);
            match &result {
                Ok(()) => info!(key = %key, "delete committed"),
                Err(e) => warn!(key = %key, error = %e, "delete failed"),
            }
            JobOutcome::Deleted { key, label, result }
        }
        Job::BulkDelete { kind, ids } => {
            let mut deleted = Vec::new();
            let mut failed = Vec::new();
            for id in ids {
                match backend.delete(kind, &id) {
                    Ok(()) => deleted.push(id),
                    Err(e) => failed.push((id, e.to_string())),
                }
            }
            info!(kind = kind.as_str(), deleted = deleted.len(), failed = failed.len(), "bulk delete finished");
            JobOutcome::BulkDeleted { kind, deleted, failed }
        }
        Job::SetUserStatus { id, active, previous } => {
            let result = backend.set_user_status(&id, active);
            if let Err(e) = &result {
                warn!(id = %id, active, error = %e, "status update failed");
            }
            JobOutcome::UserStatus { id, active, previous, result }
        }
        Job::Action { action, id, title } => {
            let result = match action {
                RowAction::Resend => backend.resend_notification(&id),
                RowAction::Publish => backend.publish_survey(&id),
                RowAction::Archive => backend.archive_survey(&id),
            };
            match &result {
                Ok(()) => info!(action = action.as_str(), id = %id, "row action done"),
                Err(e) => warn!(action = action.as_str(), id = %id, error = %e, "row action failed"),
            }
            JobOutcome::Action { action, title, result }
        }
    }
}

/// Runs jobs and collects their outcomes
pub struct JobRunner {
    backend: Arc<dyn AdminBackend>,
    tx: Sender<JobOutcome>,
    rx: Receiver<JobOutcome>,
    inline: bool,
    running: usize,
}

impl JobRunner {
    pub fn new(backend: Arc<dyn AdminBackend>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            backend,
            tx,
            rx,
            inline: false,
            running: 0,
        }
    }

    /// Run jobs synchronously on submit (tests)
    #[cfg(test)]
    pub fn inline(backend: Arc<dyn AdminBackend>) -> Self {
        Self {
            inline: true,
            ..Self::new(backend)
        }
    }

    pub fn backend(&self) -> &Arc<dyn AdminBackend> {
        &self.backend
    }

    /// Jobs submitted whose outcome has not been drained yet
    pub fn running(&self) -> usize {
        self.running
    }

    pub fn submit(&mut self, job: Job) {
        debug!(job = ?job, "job submitted");
        self.running += 1;

        if self.inline {
            let outcome = execute(self.backend.as_ref(), job);
            let _ = self.tx.send(outcome);
            return;
        }

        let backend = Arc::clone(&self.backend);
        let tx = self.tx.clone();
        let spawned = thread::Builder::new()
            .name("dailyspark-job".into())
            .spawn(move || {
                let outcome = execute(backend.as_ref(), job);
                // Receiver only goes away on shutdown
                let _ = tx.send(outcome);
            });

        if let Err(e) = spawned {
            error!(error = %e, "failed to spawn job thread");
            self.running -= 1;
        }
    }

    /// Collect every outcome that has arrived, without blocking
    pub fn drain(&mut self) -> Vec<JobOutcome> {
        let outcomes: Vec<JobOutcome> = self.rx.try_iter().collect();
        self.running = self.running.saturating_sub(outcomes.len());
        outcomes
    }

    /// Block until every running job has reported or `timeout` passes.
    ///
    /// Returns the outcomes collected; `running()` tells how many are
    /// still out.
    pub fn wait_idle(&mut self, timeout: Duration) -> Vec<JobOutcome> {
        let deadline = Instant::now() + timeout;
        let mut outcomes = self.drain();

        while self.running > 0 {
            let left = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(left) {
                Ok(outcome) => {
                    self.running -= 1;
                    outcomes.push(outcome);
                }
                Err(RecvTimeoutError::Timeout) => break,
                // We hold a sender ourselves, so this never happens
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        debug!(collected = outcomes.len(), still_running = self.running, "waited for jobs");
        outcomes
    }
}
