//! # Autosave Coordinator
//!
//! Persists the document in the background and reports progress back to the
//! store.
//!
//! ```text
//!   DocumentStore ──watch(snapshot)──▶ Coordinator task ──spawn──▶ PersistenceApi::save
//!        ▲                                  │
//!        └────── pump() ◀── mpsc(SaveReport)┘
//! ```
//!
//! ## State machine
//!
//! The task owns five pieces of state and nothing else:
//!
//! - `deadline`: when the debounce (or retry backoff) timer fires
//! - `in_flight`: the single outstanding save, if any
//! - `queued`: the timer fired while a save was in flight
//! - `attempt`: consecutive failures, reset by any new local edit
//! - `unacknowledged`: a request that failed transiently and may still have
//!   landed; it is re-sent unchanged before anything newer
//!
//! A newer snapshot resets `deadline` to `now + debounce`. Only the timer
//! firing (or an explicit flush) starts a save, and only when nothing is in
//! flight; otherwise the save is queued and sent with the freshest snapshot
//! once the current one completes. Responses are therefore handled in send
//! order, one at a time.
//!
//! Conflicts halt the coordinator: nothing is merged, and the host decides
//! what to do (see `EditorSession::reload_after_conflict`).

use crate::config::AutosaveConfig;
use crate::document::DocumentSnapshot;
use crate::errors::EditorError;
use crate::ids::DocumentId;
use crate::persistence::{PersistError, PersistenceApi, SaveAck, SaveRequest};
use std::future::pending;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{sleep_until, Instant};

/// Progress of one save, sent to the store
#[derive(Debug, Clone, PartialEq)]
pub struct SaveReport {
    pub document_id: DocumentId,

    /// Document version the save carried
    pub version: u64,

    pub event: SaveEvent,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SaveEvent {
    Started,
    Saved { persisted_version: u64 },
    Failed { attempt: u32, will_retry: bool, message: String },
    Conflict { remote_version: u64 },
}

/// How an explicit flush ended
#[derive(Debug, Clone, PartialEq)]
pub enum FlushOutcome {
    /// Nothing needed saving
    Clean,
    Saved { version: u64 },
    Failed { message: String, will_retry: bool },
    Conflict { remote_version: u64 },
}

/// What to do with an in-flight save at teardown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownMode {
    /// Wait for the in-flight save and report its result
    Drain,
    /// Abort it; a late response is discarded
    Abandon,
}

enum Command {
    Flush { done: Option<oneshot::Sender<FlushOutcome>> },
    Shutdown { mode: TeardownMode, done: oneshot::Sender<()> },
}

struct InFlight {
    request: SaveRequest,
    handle: JoinHandle<Result<SaveAck, PersistError>>,
}

struct FlushWaiter {
    version: u64,
    done: oneshot::Sender<FlushOutcome>,
}

/// Handle to a running coordinator
pub struct AutosaveHandle {
    commands: mpsc::UnboundedSender<Command>,
    reports: mpsc::UnboundedReceiver<SaveReport>,
    task: Option<JoinHandle<()>>,
}

impl AutosaveHandle {
    /// Save now instead of waiting for the debounce window
    pub fn flush(&self) -> Result<(), EditorError> {
        self.commands
            .send(Command::Flush { done: None })
            .map_err(|_| EditorError::AutosaveStopped)
    }

    /// Save now and wait until the current version is persisted or the save fails
    pub async fn flush_and_wait(&self) -> Result<FlushOutcome, EditorError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(Command::Flush { done: Some(tx) })
            .map_err(|_| EditorError::AutosaveStopped)?;
        rx.await.map_err(|_| EditorError::AutosaveStopped)
    }

    /// Next buffered report, without waiting
    pub fn try_report(&mut self) -> Option<SaveReport> {
        self.reports.try_recv().ok()
    }

    /// Wait for the next report; `None` once the coordinator has stopped
    pub async fn next_report(&mut self) -> Option<SaveReport> {
        self.reports.recv().await
    }

    /// Stop the coordinator. Pending timers are cancelled.
    ///
    /// With [`TeardownMode::Drain`] the returned reports include the result
    /// of the save that was in flight; with `Abandon` they are discarded.
    pub async fn shutdown(mut self, mode: TeardownMode) -> Vec<SaveReport> {
        let (tx, rx) = oneshot::channel();
        if self.commands.send(Command::Shutdown { mode, done: tx }).is_ok() {
            let _ = rx.await;
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Autosave task ended abnormally");
            }
        }

        let mut remaining = Vec::new();
        while let Some(report) = self.reports.recv().await {
            remaining.push(report);
        }

        match mode {
            TeardownMode::Drain => remaining,
            TeardownMode::Abandon => Vec::new(),
        }
    }
}

impl Drop for AutosaveHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

pub struct AutosaveCoordinator {
    persistence: Arc<dyn PersistenceApi>,
    config: AutosaveConfig,
    snapshots: watch::Receiver<DocumentSnapshot>,
    reports: mpsc::UnboundedSender<SaveReport>,

    latest: DocumentSnapshot,
    base_version: u64,
    deadline: Option<Instant>,
    in_flight: Option<InFlight>,
    queued: bool,
    attempt: u32,
    unacknowledged: Option<SaveRequest>,
    conflict: Option<u64>,
    source_closed: bool,
    closing: bool,
    waiters: Vec<FlushWaiter>,
}

impl AutosaveCoordinator {
    /// Start a coordinator on the current tokio runtime.
    ///
    /// The snapshot currently in `snapshots` is the starting point; its
    /// `persisted_version` is the first concurrency base.
    pub fn spawn(
        persistence: Arc<dyn PersistenceApi>,
        config: AutosaveConfig,
        mut snapshots: watch::Receiver<DocumentSnapshot>,
    ) -> AutosaveHandle {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (report_tx, report_rx) = mpsc::unbounded_channel();

        let latest = snapshots.borrow_and_update().clone();
        let base_version = latest.persisted_version;
        let deadline = (latest.version > base_version).then(|| Instant::now() + config.debounce());

        let coordinator = Self {
            persistence,
            config,
            snapshots,
            reports: report_tx,
            latest,
            base_version,
            deadline,
            in_flight: None,
            queued: false,
            attempt: 0,
            unacknowledged: None,
            conflict: None,
            source_closed: false,
            closing: false,
            waiters: Vec::new(),
        };

        let task = tokio::spawn(coordinator.run(command_rx));

        AutosaveHandle {
            commands: command_tx,
            reports: report_rx,
            task: Some(task),
        }
    }

    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        tracing::debug!(document_id = %self.latest.id, base_version = self.base_version, "Autosave started");

        loop {
            tokio::select! {
                biased;

                command = commands.recv() => match command {
                    Some(Command::Flush { done }) => self.flush(done),
                    Some(Command::Shutdown { mode, done }) => {
                        self.shutdown(mode).await;
                        let _ = done.send(());
                        break;
                    }
                    None => {
                        self.shutdown(TeardownMode::Abandon).await;
                        break;
                    }
                },

                result = wait_in_flight(&mut self.in_flight) => {
                    if let Some(in_flight) = self.in_flight.take() {
                        self.complete(in_flight.request, result);
                    }
                }

                changed = self.snapshots.changed(), if !self.source_closed => match changed {
                    Ok(()) => self.observe(),
                    Err(_) => {
                        tracing::debug!(document_id = %self.latest.id, "Document store dropped");
                        self.source_closed = true;
                        self.deadline = None;
                    }
                },

                _ = sleep_or_pending(self.deadline) => {
                    self.deadline = None;
                    self.fire();
                }
            }
        }

        tracing::debug!(document_id = %self.latest.id, "Autosave stopped");
    }

    fn report(&self, version: u64, event: SaveEvent) {
        let _ = self.reports.send(SaveReport {
            document_id: self.latest.id.clone(),
            version,
            event,
        });
    }

    /// A newer snapshot arrived from the store
    fn observe(&mut self) {
        let snapshot = self.snapshots.borrow_and_update().clone();
        let is_new_edit = snapshot.version > self.latest.version;
        self.latest = snapshot;

        if is_new_edit && self.conflict.is_none() {
            self.attempt = 0;
            self.deadline = Some(Instant::now() + self.config.debounce());
            tracing::trace!(version = self.latest.version, "Autosave debounce reset");
        }
    }

    fn has_unsaved(&self) -> bool {
        self.latest.version > self.base_version
    }

    /// Debounce or backoff timer elapsed
    fn fire(&mut self) {
        if self.conflict.is_some() || self.closing {
            return;
        }
        if self.in_flight.is_some() {
            self.queued = true;
            return;
        }
        if self.has_unsaved() {
            self.send();
        }
    }

    fn flush(&mut self, done: Option<oneshot::Sender<FlushOutcome>>) {
        // Commands are polled first; pick up an edit made just before the flush
        self.observe();

        if let Some(remote_version) = self.conflict {
            if let Some(done) = done {
                let _ = done.send(FlushOutcome::Conflict { remote_version });
            }
            return;
        }

        let pending = self.has_unsaved() || self.in_flight.is_some();
        if !pending {
            if let Some(done) = done {
                let _ = done.send(FlushOutcome::Clean);
            }
            return;
        }

        if let Some(done) = done {
            self.waiters.push(FlushWaiter {
                version: self.latest.version,
                done,
            });
        }

        if self.has_unsaved() {
            self.deadline = None;
            self.fire();
        }
    }

    fn send(&mut self) {
        // A failed request may have been written; only its own retry is idempotent
        let (request, retry) = match self.unacknowledged.take() {
            Some(request) => (request, true),
            None => (
                SaveRequest {
                    document_id: self.latest.id.clone(),
                    base_version: self.base_version,
                    version: self.latest.version,
                    blocks: self.latest.to_blocks(),
                },
                false,
            ),
        };
        let version = request.version;

        tracing::debug!(
            document_id = %request.document_id,
            version,
            base_version = request.base_version,
            blocks = request.blocks.len(),
            retry,
            "Saving document"
        );

        self.report(version, SaveEvent::Started);
        self.queued = false;

        let persistence = Arc::clone(&self.persistence);
        let payload = request.clone();
        let handle = tokio::spawn(async move { persistence.save(payload).await });
        self.in_flight = Some(InFlight { request, handle });
    }

    fn complete(&mut self, request: SaveRequest, result: Result<Result<SaveAck, PersistError>, JoinError>) {
        let version = request.version;
        let result = match result {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => return,
            Err(e) => Err(PersistError::Transient(format!("save task failed: {}", e))),
        };

        match result {
            Ok(ack) => {
                tracing::info!(document_id = %self.latest.id, version = ack.new_version, "Document saved");
                self.base_version = ack.new_version;
                self.attempt = 0;
                self.report(
                    version,
                    SaveEvent::Saved {
                        persisted_version: ack.new_version,
                    },
                );
                self.resolve_waiters(|w| {
                    (w.version <= ack.new_version).then_some(FlushOutcome::Saved {
                        version: ack.new_version,
                    })
                });

                if self.closing || !self.has_unsaved() {
                    self.queued = false;
                } else if self.queued || !self.waiters.is_empty() {
                    self.send();
                } else if self.deadline.is_none() {
                    self.deadline = Some(Instant::now() + self.config.debounce());
                }
            }

            Err(PersistError::Conflict { remote_version }) => {
                tracing::error!(
                    document_id = %self.latest.id,
                    version,
                    remote_version,
                    "Save rejected: document changed elsewhere"
                );
                self.conflict = Some(remote_version);
                self.deadline = None;
                self.queued = false;
                self.report(version, SaveEvent::Conflict { remote_version });
                self.resolve_waiters(|_| Some(FlushOutcome::Conflict { remote_version }));
            }

            Err(PersistError::Transient(message)) => {
                self.attempt += 1;
                let will_retry = !self.closing && self.attempt < self.config.max_attempts;

                if will_retry {
                    let retry_at = Instant::now() + self.config.backoff(self.attempt);
                    self.deadline = Some(self.deadline.map_or(retry_at, |d| d.max(retry_at)));
                    tracing::warn!(
                        document_id = %self.latest.id,
                        attempt = self.attempt,
                        error = %message,
                        "Save failed, retrying"
                    );
                } else {
                    self.deadline = None;
                    tracing::error!(
                        document_id = %self.latest.id,
                        attempts = self.attempt,
                        error = %message,
                        "Save failed, giving up until the next edit"
                    );
                }
                self.queued = false;
                self.unacknowledged = Some(request);

                self.report(
                    version,
                    SaveEvent::Failed {
                        attempt: self.attempt,
                        will_retry,
                        message: message.clone(),
                    },
                );
                self.resolve_waiters(|_| {
                    Some(FlushOutcome::Failed {
                        message: message.clone(),
                        will_retry,
                    })
                });
            }
        }
    }

    fn resolve_waiters(&mut self, mut outcome: impl FnMut(&FlushWaiter) -> Option<FlushOutcome>) {
        let waiters = std::mem::take(&mut self.waiters);
        for waiter in waiters {
            match outcome(&waiter) {
                Some(result) => {
                    let _ = waiter.done.send(result);
                }
                None => self.waiters.push(waiter),
            }
        }
    }

    async fn shutdown(&mut self, mode: TeardownMode) {
        self.closing = true;
        self.deadline = None;
        self.queued = false;

        if let Some(in_flight) = self.in_flight.take() {
            match mode {
                TeardownMode::Drain => {
                    tracing::debug!(version = in_flight.request.version, "Draining in-flight save");
                    let result = in_flight.handle.await;
                    self.complete(in_flight.request, result);
                }
                TeardownMode::Abandon => {
                    tracing::debug!(version = in_flight.request.version, "Abandoning in-flight save");
                    in_flight.handle.abort();
                }
            }
        }
    }
}

async fn wait_in_flight(in_flight: &mut Option<InFlight>) -> Result<Result<SaveAck, PersistError>, JoinError> {
    match in_flight {
        Some(f) => (&mut f.handle).await,
        None => pending().await,
    }
}

async fn sleep_or_pending(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => pending().await,
    }
}
