//! Watches a phone-upload session until it reaches a terminal state.

use std::future::Future;

use anyhow::Result;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use roomforge::api::v1::phone_upload::{FileRef, PhoneUploadStatusResponse, UploadStatus};

use super::{PollConfig, PollPhase};

/// What the state machine wants after applying an observation.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadStep {
    /// Keep polling.
    Continue,

    /// Stale or post-terminal observation; nothing changed.
    Ignored,

    /// The session completed; file references captured for project
    /// creation. No further queries may be issued.
    Completed(Vec<FileRef>),

    /// The backend reported the session failed; the caller discards the
    /// token so a fresh handoff can start.
    Failed,

    /// Too many consecutive query failures.
    GaveUp,
}

/// The Upload Status Poller as a pure state machine.
///
/// Observations carry the sequence number reserved by [`begin_query`],
/// so a response that arrives late cannot overwrite a newer one.
///
/// [`begin_query`]: UploadWatch::begin_query
#[derive(Debug)]
pub struct UploadWatch {
    config: PollConfig,
    phase: PollPhase,
    next_seq: u64,
    last_applied: Option<u64>,
    consecutive_failures: u32,
    polls: u64,
}

impl UploadWatch {
    pub fn new(config: PollConfig) -> Self {
        Self {
            config,
            phase: PollPhase::Idle,
            next_seq: 0,
            last_applied: None,
            consecutive_failures: 0,
            polls: 0,
        }
    }

    pub fn phase(&self) -> PollPhase {
        self.phase
    }

    /// Queries issued so far.
    pub fn polls(&self) -> u64 {
        self.polls
    }

    /// Whether the poll budget, if any, is used up.
    pub fn budget_exhausted(&self) -> bool {
        self.config
            .max_polls
            .is_some_and(|max| self.polls >= max)
    }

    /// Reserves the sequence number for the next query.
    pub fn begin_query(&mut self) -> u64 {
        self.phase = PollPhase::Polling;
        self.polls += 1;
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    /// Applies a numbered observation.
    pub fn observe(
        &mut self,
        seq: u64,
        result: Result<PhoneUploadStatusResponse>,
    ) -> UploadStep {
        if self.phase.is_terminal() {
            return UploadStep::Ignored;
        }
        if self.last_applied.is_some_and(|last| seq <= last) {
            tracing::debug!(seq, "discarding stale upload status observation");
            return UploadStep::Ignored;
        }
        self.last_applied = Some(seq);

        match result {
            Ok(res) => {
                self.consecutive_failures = 0;
                match res.status {
                    UploadStatus::Pending => UploadStep::Continue,
                    UploadStatus::Completed => {
                        self.phase = PollPhase::TerminalSuccess;
                        UploadStep::Completed(res.files)
                    }
                    UploadStatus::Failed => {
                        self.phase = PollPhase::TerminalFailure;
                        UploadStep::Failed
                    }
                }
            }
            Err(err) => {
                self.consecutive_failures += 1;
                if self.consecutive_failures >= self.config.max_consecutive_failures {
                    self.phase = PollPhase::TerminalFailure;
                    tracing::warn!(
                        failures = self.consecutive_failures,
                        "giving up on upload status after repeated query failures: {err:#}"
                    );
                    UploadStep::GaveUp
                } else {
                    tracing::warn!(
                        failures = self.consecutive_failures,
                        "upload status query failed, will retry: {err:#}"
                    );
                    UploadStep::Continue
                }
            }
        }
    }
}

/// Terminal outcome of watching an upload session.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadOutcome {
    /// The phone submitted its photos.
    Completed(Vec<FileRef>),

    /// The backend reported the session failed.
    Failed,

    /// Gave up after repeated query failures or an exhausted budget.
    GaveUp,

    /// The owning flow was torn down before a terminal status.
    Cancelled,
}

/// Polls an upload session until a terminal status, cancellation, or
/// give-up. Returns as soon as the token is cancelled; no query is
/// started afterwards.
///
/// The query future is injected so scripted backends can stand in for
/// the API client.
pub async fn watch_upload<Q, Fut>(
    config: PollConfig,
    cancel: CancellationToken,
    mut query: Q,
) -> UploadOutcome
where
    Q: FnMut() -> Fut,
    Fut: Future<Output = Result<PhoneUploadStatusResponse>>,
{
    let mut watch = UploadWatch::new(config);
    let mut interval = time::interval(config.interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    if !config.immediate_first {
        // The first interval tick resolves immediately; skip it so the
        // first query happens one full interval after the handoff starts.
        tokio::select! {
            _ = cancel.cancelled() => return UploadOutcome::Cancelled,
            _ = interval.tick() => {}
        }
    }

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return UploadOutcome::Cancelled,
            _ = interval.tick() => {}
        }

        if watch.budget_exhausted() {
            return UploadOutcome::GaveUp;
        }

        let seq = watch.begin_query();
        let result = tokio::select! {
            _ = cancel.cancelled() => return UploadOutcome::Cancelled,
            result = query() => result,
        };

        match watch.observe(seq, result) {
            UploadStep::Continue | UploadStep::Ignored => {}
            UploadStep::Completed(files) => return UploadOutcome::Completed(files),
            UploadStep::Failed => return UploadOutcome::Failed,
            UploadStep::GaveUp => return UploadOutcome::GaveUp,
        }
    }
}
