//! Watches a project through the processing pipeline until a room model
//! is ready.

use std::future::Future;

use anyhow::Result;
use reqwest::Url;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use roomforge::api::v1::project::{room_model_url, ProjectStatus, ProjectStatusResponse};

use super::{PollConfig, PollPhase};

/// What the state machine wants after applying an observation.
#[derive(Debug, Clone, PartialEq)]
pub enum ProjectStep {
    /// Keep polling. Covers running stages and complete-variant statuses
    /// whose model path has not materialized yet.
    Continue,

    /// Stale or post-terminal observation; nothing changed.
    Ignored,

    /// The model is finalized and reachable at this URL.
    Ready(Url),

    /// The pipeline reported a `*failed*` status.
    Failed(ProjectStatus),

    /// Too many consecutive query failures.
    GaveUp,
}

/// The Project Status Poller as a pure state machine.
///
/// A polled status only resolves to a model URL when it is one of the
/// complete variants *and* `room_model_path` is non-empty; either alone
/// keeps the poll running.
#[derive(Debug)]
pub struct ProjectWatch {
    config: PollConfig,
    static_base: Url,
    phase: PollPhase,
    next_seq: u64,
    last_applied: Option<u64>,
    consecutive_failures: u32,
    polls: u64,
}

impl ProjectWatch {
    pub fn new(config: PollConfig, static_base: Url) -> Self {
        Self {
            config,
            static_base,
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

    pub fn polls(&self) -> u64 {
        self.polls
    }

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
    pub fn observe(&mut self, seq: u64, result: Result<ProjectStatusResponse>) -> ProjectStep {
        if self.phase.is_terminal() {
            return ProjectStep::Ignored;
        }
        if self.last_applied.is_some_and(|last| seq <= last) {
            tracing::debug!(seq, "discarding stale project status observation");
            return ProjectStep::Ignored;
        }
        self.last_applied = Some(seq);

        match result {
            Ok(res) => {
                self.consecutive_failures = 0;
                if res.status.is_failed() {
                    self.phase = PollPhase::TerminalFailure;
                    return ProjectStep::Failed(res.status);
                }
                match room_model_url(
                    &self.static_base,
                    &res.status,
                    res.room_model_path.as_deref(),
                ) {
                    Some(url) => {
                        self.phase = PollPhase::TerminalSuccess;
                        ProjectStep::Ready(url)
                    }
                    None => {
                        tracing::debug!(status = %res.status, "project still processing");
                        ProjectStep::Continue
                    }
                }
            }
            Err(err) => {
                self.consecutive_failures += 1;
                if self.consecutive_failures >= self.config.max_consecutive_failures {
                    self.phase = PollPhase::TerminalFailure;
                    tracing::warn!(
                        failures = self.consecutive_failures,
                        "giving up on project status after repeated query failures: {err:#}"
                    );
                    ProjectStep::GaveUp
                } else {
                    tracing::warn!(
                        failures = self.consecutive_failures,
                        "project status query failed, will retry: {err:#}"
                    );
                    ProjectStep::Continue
                }
            }
        }
    }
}

/// Terminal outcome of watching a project.
#[derive(Debug, Clone, PartialEq)]
pub enum ProjectOutcome {
    /// The model is finalized and reachable at this URL.
    Ready(Url),

    /// The pipeline reported a `*failed*` status.
    Failed(ProjectStatus),

    /// Gave up after repeated query failures.
    GaveUp,

    /// The poll budget ran out before a terminal status.
    TimedOut,

    /// The owning flow was torn down before a terminal status.
    Cancelled,
}

/// Polls a project until its model is ready, it fails, the budget runs
/// out, or the token is cancelled. The first query is issued
/// immediately when the config says so.
pub async fn watch_project<Q, Fut>(
    config: PollConfig,
    static_base: Url,
    cancel: CancellationToken,
    mut query: Q,
) -> ProjectOutcome
where
    Q: FnMut() -> Fut,
    Fut: Future<Output = Result<ProjectStatusResponse>>,
{
    let mut watch = ProjectWatch::new(config, static_base);
    let mut interval = time::interval(config.interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    if !config.immediate_first {
        tokio::select! {
            _ = cancel.cancelled() => return ProjectOutcome::Cancelled,
            _ = interval.tick() => {}
        }
    }

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return ProjectOutcome::Cancelled,
            _ = interval.tick() => {}
        }

        if watch.budget_exhausted() {
            return ProjectOutcome::TimedOut;
        }

        let seq = watch.begin_query();
        let result = tokio::select! {
            _ = cancel.cancelled() => return ProjectOutcome::Cancelled,
            result = query() => result,
        };

        match watch.observe(seq, result) {
            ProjectStep::Continue | ProjectStep::Ignored => {}
            ProjectStep::Ready(url) => return ProjectOutcome::Ready(url),
            ProjectStep::Failed(status) => return ProjectOutcome::Failed(status),
            ProjectStep::GaveUp => return ProjectOutcome::GaveUp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("http://127.0.0.1:8000").unwrap()
    }

    fn response(status: &str, path: Option<&str>) -> ProjectStatusResponse {
        ProjectStatusResponse {
            status: ProjectStatus::new(status),
            room_model_path: path.map(str::to_owned),
        }
    }

    #[test]
    fn a_complete_status_with_a_path_is_ready() {
        let mut watch = ProjectWatch::new(PollConfig::project_default(), base());
        let seq = watch.begin_query();
        let step = watch.observe(
            seq,
            Ok(response(
                "detection_complete",
                Some("projects/42/model/room_model.glb"),
            )),
        );
        match step {
            ProjectStep::Ready(url) => {
                assert!(url
                    .as_str()
                    .ends_with("/project_files/42/model/room_model.glb"));
            }
            other => panic!("expected Ready, got {other:?}"),
        }
        assert_eq!(watch.phase(), PollPhase::TerminalSuccess);
    }

    #[test]
    fn a_complete_status_without_a_path_keeps_polling() {
        let mut watch = ProjectWatch::new(PollConfig::project_default(), base());
        let seq = watch.begin_query();
        let step = watch.observe(seq, Ok(response("photogrammetry_complete", Some(""))));
        assert_eq!(step, ProjectStep::Continue);
        assert_eq!(watch.phase(), PollPhase::Polling);
    }

    #[test]
    fn a_failed_status_is_terminal() {
        let mut watch = ProjectWatch::new(PollConfig::project_default(), base());
        let seq = watch.begin_query();
        let step = watch.observe(seq, Ok(response("photogrammetry_failed", None)));
        assert_eq!(
            step,
            ProjectStep::Failed(ProjectStatus::new("photogrammetry_failed"))
        );
        assert_eq!(watch.phase(), PollPhase::TerminalFailure);
    }
}
