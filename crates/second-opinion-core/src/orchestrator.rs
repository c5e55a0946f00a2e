//! Dual-response orchestration.
//!
//! One user message fans out to every backend at once. Each dispatch runs on
//! its own task and reports back over a channel; the task that owns the
//! [`Orchestrator`] applies outcomes in arrival order, so the log has a single
//! writer and needs no locking.
//!
//! A conversation has at most one submission in flight. Submitting again
//! before it settles is refused without touching any state.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::backend::Backend;
use crate::error::{DispatchError, ProviderError, SubmitError};
use crate::gateway::Dispatch;
use crate::state::{ConversationLog, MessageId};

/// Text of the assistant message shown in place of a failed reply.
pub const PLACEHOLDER_TEXT: &str = "Sorry, there was an error processing your request.";

/// How failed backend calls are folded into the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Replies are held until every backend has answered. If any call failed,
    /// one placeholder replaces the whole round, tagged with the backend the
    /// user was viewing when they submitted.
    #[default]
    Shared,
    /// Each outcome is appended as it arrives; a failure becomes a placeholder
    /// tagged with the backend that failed.
    PerBackend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
    Idle,
    Submitting,
    AwaitingBoth,
    Settled,
}

/// One dispatch that has not come back yet.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub backend: Backend,
    pub submission: MessageId,
    pub started: Instant,
}

/// Reported each time a backend outcome is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub submission: MessageId,
    pub backend: Backend,
    pub succeeded: bool,
    /// True when this was the last outstanding backend.
    pub settled: bool,
}

#[derive(Debug)]
struct Outcome {
    submission: MessageId,
    backend: Backend,
    result: Result<String, DispatchError>,
}

/// What the presentation layer renders from.
#[derive(Debug, Clone, Copy)]
pub struct Snapshot<'a> {
    pub log: &'a ConversationLog,
    pub is_loading: bool,
    pub active: Backend,
}

pub struct Orchestrator {
    dispatcher: Arc<dyn Dispatch>,
    policy: FailurePolicy,
    log: ConversationLog,
    active: Backend,
    state: SubmissionState,
    pending: Vec<PendingRequest>,
    held: Vec<(Backend, Result<String, DispatchError>)>,
    outcome_tx: mpsc::UnboundedSender<Outcome>,
    outcome_rx: mpsc::UnboundedReceiver<Outcome>,
}

impl Orchestrator {
    pub fn new(dispatcher: Arc<dyn Dispatch>) -> Self {
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        Self {
            dispatcher,
            policy: FailurePolicy::default(),
            log: ConversationLog::new(),
            active: Backend::default(),
            state: SubmissionState::Idle,
            pending: Vec::new(),
            held: Vec::new(),
            outcome_tx,
            outcome_rx,
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_active_backend(mut self, backend: Backend) -> Self {
        self.active = backend;
        self
    }

    /// Start a new round. The user message is in the log before this returns;
    /// both dispatches are already spawned.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn submit(&mut self, text: &str) -> Result<MessageId, SubmitError> {
        if text.trim().is_empty() {
            return Err(SubmitError::EmptyMessage);
        }
        if self.is_loading() {
            debug!(pending = self.pending.len(), "submission refused while busy");
            return Err(SubmitError::Busy);
        }

        self.state = SubmissionState::Submitting;
        let submission = self.log.append_user(text.to_string(), self.active);
        self.held.clear();

        for backend in Backend::ALL {
            self.pending.push(PendingRequest {
                backend,
                submission,
                started: Instant::now(),
            });

            let dispatcher = Arc::clone(&self.dispatcher);
            let tx = self.outcome_tx.clone();
            let message = text.to_string();
            tokio::spawn(async move {
                let call =
                    tokio::spawn(async move { dispatcher.dispatch(&message, backend).await });
                // A call that panics or is cancelled still has to settle its slot.
                let result = call.await.unwrap_or_else(|e| {
                    error!(%backend, error = %e, "dispatch task did not complete");
                    let message = format!("Dispatch to {} failed: {}", backend, e);
                    Err(ProviderError::new(message, None).into())
                });
                // The orchestrator may be gone; nobody is left to tell.
                let _ = tx.send(Outcome {
                    submission,
                    backend,
                    result,
                });
            });
        }

        self.state = SubmissionState::AwaitingBoth;
        info!(%submission, "submission dispatched to all backends");
        Ok(submission)
    }

    /// Wait for the next backend outcome and apply it. Returns `None` straight
    /// away when nothing is in flight.
    pub async fn next_outcome(&mut self) -> Option<Progress> {
        while !self.pending.is_empty() {
            let outcome = self.outcome_rx.recv().await?;
            if let Some(progress) = self.apply(outcome) {
                return Some(progress);
            }
        }
        None
    }

    /// Apply every outcome that has already arrived, without waiting.
    pub fn drain_ready(&mut self) -> Vec<Progress> {
        let mut applied = Vec::new();
        while let Ok(outcome) = self.outcome_rx.try_recv() {
            if let Some(progress) = self.apply(outcome) {
                applied.push(progress);
            }
        }
        applied
    }

    /// Wait until the current submission, if any, has settled.
    pub async fn settle(&mut self) {
        while self.next_outcome().await.is_some() {}
    }

    fn apply(&mut self, outcome: Outcome) -> Option<Progress> {
        let Some(pos) = self
            .pending
            .iter()
            .position(|p| p.submission == outcome.submission && p.backend == outcome.backend)
        else {
            debug!(submission = %outcome.submission, backend = %outcome.backend, "ignoring stale outcome");
            return None;
        };
        let request = self.pending.remove(pos);
        let elapsed_ms = request.started.elapsed().as_millis() as u64;

        let succeeded = outcome.result.is_ok();
        match &outcome.result {
            Ok(_) => info!(backend = %outcome.backend, elapsed_ms, "backend replied"),
            Err(e) => warn!(
                backend = %outcome.backend,
                elapsed_ms,
                status = e.status_code(),
                error = %e,
                "backend failed"
            ),
        }

        match self.policy {
            FailurePolicy::PerBackend => match outcome.result {
                Ok(text) => {
                    self.log
                        .append_assistant(outcome.submission, outcome.backend, text);
                }
                Err(_) => {
                    self.log
                        .append_placeholder(outcome.submission, outcome.backend, PLACEHOLDER_TEXT);
                }
            },
            FailurePolicy::Shared => self.held.push((outcome.backend, outcome.result)),
        }

        let settled = self.pending.is_empty();
        if settled {
            self.finish(outcome.submission);
        }

        Some(Progress {
            submission: outcome.submission,
            backend: outcome.backend,
            succeeded,
            settled,
        })
    }

    fn finish(&mut self, submission: MessageId) {
        if self.policy == FailurePolicy::Shared {
            let mut held = std::mem::take(&mut self.held);
            if held.iter().any(|(_, result)| result.is_err()) {
                let tag = self
                    .log
                    .get(submission)
                    .map(|m| m.backend())
                    .unwrap_or(self.active);
                self.log.append_placeholder(submission, tag, PLACEHOLDER_TEXT);
            } else {
                held.sort_by_key(|(backend, _)| *backend);
                for (backend, result) in held {
                    if let Ok(text) = result {
                        self.log.append_assistant(submission, backend, text);
                    }
                }
            }
        }
        self.state = SubmissionState::Settled;
        info!(%submission, "submission settled");
    }

    pub fn log(&self) -> &ConversationLog {
        &self.log
    }

    pub fn state(&self) -> SubmissionState {
        self.state
    }

    pub fn pending(&self) -> &[PendingRequest] {
        &self.pending
    }

    pub fn is_loading(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn is_pending(&self, backend: Backend) -> bool {
        self.pending.iter().any(|p| p.backend == backend)
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    pub fn active_backend(&self) -> Backend {
        self.active
    }

    pub fn set_active_backend(&mut self, backend: Backend) {
        self.active = backend;
    }

    /// User messages plus the assistant messages of one backend.
    pub fn visible(&self, backend: Backend) -> Vec<&crate::state::ChatMessage> {
        self.log.visible(backend)
    }

    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            log: &self.log,
            is_loading: self.is_loading(),
            active: self.active,
        }
    }
}
