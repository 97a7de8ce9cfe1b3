//! Status poll loops.
//!
//! The backend never pushes: the only way to learn that a phone finished
//! uploading or that a reconstruction is done is to ask again. Both
//! pollers here are explicit state machines decoupled from timers and
//! HTTP. The machine consumes numbered observations and yields a step;
//! a thin async driver owns the interval, the cancellation token and the
//! query future. Tests drive the machines with scripted observations and
//! a paused clock.
//!
//! Failure policy is uniform across both loops: a query failure is
//! logged and retried, and only `max_consecutive_failures` failures in a
//! row abort the poll. A successful query resets the counter.

pub mod project;
pub mod upload;

pub use project::{watch_project, ProjectOutcome, ProjectWatch};
pub use upload::{watch_upload, UploadOutcome, UploadWatch};

use std::time::Duration;

/// Tuning for a status poll loop.
#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    /// Fixed delay between queries.
    pub interval: Duration,

    /// Whether to query immediately instead of waiting out the first
    /// interval.
    pub immediate_first: bool,

    /// Consecutive query failures tolerated before giving up.
    pub max_consecutive_failures: u32,

    /// Total queries allowed before the poll times out. `None` means no
    /// budget.
    pub max_polls: Option<u64>,
}

impl PollConfig {
    /// Defaults for watching a phone upload session: 3 s cadence, first
    /// query after one full interval, no poll budget (the user is
    /// looking at the QR code and can cancel).
    pub fn upload_default() -> Self {
        Self {
            interval: Duration::from_secs(3),
            immediate_first: false,
            max_consecutive_failures: 5,
            max_polls: None,
        }
    }

    /// Defaults for watching project processing: immediate first query,
    /// 5 s cadence, bounded at 360 polls (half an hour at the default
    /// interval).
    pub fn project_default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            immediate_first: true,
            max_consecutive_failures: 5,
            max_polls: Some(360),
        }
    }
}

/// Lifecycle of a poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollPhase {
    /// No query issued yet.
    Idle,

    /// Queries are being issued on the interval.
    Polling,

    /// A terminal success was observed; no further queries are issued.
    TerminalSuccess,

    /// A terminal failure was observed; no further queries are issued.
    TerminalFailure,
}

impl PollPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, PollPhase::TerminalSuccess | PollPhase::TerminalFailure)
    }
}
