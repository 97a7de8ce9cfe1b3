//! The top-level session state machine.
//!
//! Drives the landing → uploading → designing flow, decides which upload
//! path (local files or phone handoff) is authoritative at submit time,
//! and owns the lifetime of the upload-status watcher: exactly one
//! handoff can be in flight, and starting the other path tears it down
//! through its cancellation token.

use std::mem;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use reqwest::Url;
use tokio::sync::Mutex;
use tokio::task::{spawn, JoinHandle};
use tokio_util::sync::CancellationToken;

use roomforge::api::v1::furniture::FurnitureItem;
use roomforge::api::v1::phone_upload::validate_photo_count;
use roomforge::api::v1::project::ProjectId;
use roomforge::error::RoomforgeError;
use roomforge::handoff::HandoffLink;
use roomforge::session::SessionToken;

use crate::api::Backend;
use crate::config::ClientConfig;
use crate::poll::{watch_project, watch_upload, ProjectOutcome, UploadOutcome};

/// Top-level application phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Landing,
    Uploading,
    Designing,
}

/// Which upload path currently holds the photos. Never both: the
/// controller is the only writer, and each setter tears the other
/// path down first.
#[derive(Debug)]
enum UploadSource {
    None,
    /// Photos picked on this machine.
    Local(Vec<PathBuf>),
    /// An in-flight or completed phone handoff.
    Phone(PhoneHandoff),
}

/// One phone-handoff attempt and its watcher task.
#[derive(Debug)]
struct PhoneHandoff {
    token: SessionToken,
    link: HandoffLink,
    cancel: CancellationToken,
    watcher: JoinHandle<()>,
    /// Written once by the watcher when the poll reaches a terminal
    /// outcome.
    outcome: Arc<Mutex<Option<UploadOutcome>>>,
}

impl PhoneHandoff {
    fn abandon(self) {
        self.cancel.cancel();
        drop(self.watcher);
    }
}

/// The session controller.
pub struct SessionController<B: Backend> {
    backend: B,
    config: ClientConfig,
    phase: Phase,
    source: UploadSource,
    project: Option<ProjectId>,
    placed: Vec<FurnitureItem>,
    message: Option<String>,
}

impl<B: Backend> SessionController<B> {
    pub fn new(backend: B, config: ClientConfig) -> Self {
        Self {
            backend,
            config,
            phase: Phase::Landing,
            source: UploadSource::None,
            project: None,
            placed: Vec::new(),
            message: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn project(&self) -> Option<&ProjectId> {
        self.project.as_ref()
    }

    pub fn placed_furniture(&self) -> &[FurnitureItem] {
        &self.placed
    }

    /// Last user-facing status message.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn has_local_files(&self) -> bool {
        matches!(self.source, UploadSource::Local(_))
    }

    pub fn handoff_active(&self) -> bool {
        matches!(self.source, UploadSource::Phone(_))
    }

    pub fn handoff_link(&self) -> Option<&HandoffLink> {
        match &self.source {
            UploadSource::Phone(handoff) => Some(&handoff.link),
            _ => None,
        }
    }

    /// Latest terminal outcome of the phone handoff watcher, if any.
    pub async fn handoff_outcome(&self) -> Option<UploadOutcome> {
        match &self.source {
            UploadSource::Phone(handoff) => handoff.outcome.lock().await.clone(),
            _ => None,
        }
    }

    /// Enters the upload phase with a clean slate.
    ///
    /// Serves both the initial landing → uploading transition and the
    /// "start new design" reset from the design view: any retained
    /// project id, placed furniture and in-flight handoff are dropped.
    pub fn start_design(&mut self) {
        self.abandon_handoff();
        self.phase = Phase::Uploading;
        self.project = None;
        self.placed.clear();
        self.message = None;
    }

    /// Selects photos picked on this machine.
    ///
    /// Supersedes any phone handoff in progress: its poller is cancelled
    /// and its session token discarded before the local set becomes
    /// authoritative.
    pub fn select_local_files(&mut self, photos: Vec<PathBuf>) -> Result<(), RoomforgeError> {
        validate_photo_count(photos.len())?;
        self.abandon_handoff();
        self.message = Some(format!("{} file(s) selected locally.", photos.len()));
        self.source = UploadSource::Local(photos);
        Ok(())
    }

    /// Starts a phone handoff: mints a session token, builds the link
    /// and spawns the upload-status watcher. Any locally selected files
    /// and any previous handoff are dropped.
    pub fn start_phone_handoff(
        &mut self,
        scheme: &str,
        host: &str,
    ) -> Result<HandoffLink, RoomforgeError> {
        let token = SessionToken::generate();
        let link = HandoffLink::new(scheme, host, self.config.handoff_port, token.clone())?;

        self.abandon_handoff();

        let cancel = CancellationToken::new();
        let outcome = Arc::new(Mutex::new(None));
        let watcher = spawn({
            let backend = self.backend.clone();
            let token = token.clone();
            let cancel = cancel.clone();
            let outcome = Arc::clone(&outcome);
            let poll = self.config.upload_poll;
            async move {
                let result = watch_upload(poll, cancel, move || {
                    let backend = backend.clone();
                    let token = token.clone();
                    async move { backend.upload_status(token).await }
                })
                .await;
                *outcome.lock().await = Some(result);
            }
        });

        self.source = UploadSource::Phone(PhoneHandoff {
            token,
            link: link.clone(),
            cancel,
            watcher,
            outcome,
        });
        self.message = Some("Scan the QR code with your phone to upload photos.".to_owned());
        Ok(link)
    }

    /// Cancels an in-flight handoff and discards its session token.
    fn abandon_handoff(&mut self) {
        if let UploadSource::Phone(handoff) = mem::replace(&mut self.source, UploadSource::None) {
            handoff.abandon();
        }
    }

    /// Submits the authoritative photo set and creates the project.
    ///
    /// A completed phone session outranks locally selected files (the
    /// paths are mutually exclusive, so in practice whichever is present
    /// wins). On success the session moves to the design phase; on
    /// failure it stays in the upload phase with a surfaced error, and
    /// locally selected files are kept for a retry.
    pub async fn submit(&mut self) -> Result<ProjectId> {
        match mem::replace(&mut self.source, UploadSource::None) {
            UploadSource::Phone(handoff) => {
                let outcome = handoff.outcome.lock().await.clone();
                match outcome {
                    Some(UploadOutcome::Completed(_)) => {
                        // The session is consumed by this attempt whether
                        // or not project creation succeeds.
                        let token = handoff.token.clone();
                        handoff.abandon();
                        match self.backend.create_project_from_session(token).await {
                            Ok(res) => Ok(self.finish_create(res.id)),
                            Err(err) => Err(self.fail_create(err)),
                        }
                    }
                    Some(UploadOutcome::Failed) | Some(UploadOutcome::GaveUp) => {
                        handoff.abandon();
                        self.message =
                            Some("Phone upload failed. Please try again.".to_owned());
                        Err(anyhow!("phone upload session failed"))
                    }
                    None | Some(UploadOutcome::Cancelled) => {
                        // Not terminal yet; keep the handoff alive
                        self.source = UploadSource::Phone(handoff);
                        self.message =
                            Some("Phone upload has not completed yet.".to_owned());
                        Err(anyhow!("phone upload still pending"))
                    }
                }
            }
            UploadSource::Local(photos) => {
                match self
                    .backend
                    .create_project_from_photos(photos.clone())
                    .await
                {
                    Ok(res) => Ok(self.finish_create(res.id)),
                    Err(err) => {
                        self.source = UploadSource::Local(photos);
                        Err(self.fail_create(err))
                    }
                }
            }
            UploadSource::None => {
                self.message = Some(
                    "Please select photos locally or use the phone upload option.".to_owned(),
                );
                Err(anyhow!("no photos selected"))
            }
        }
    }

    fn finish_create(&mut self, id: ProjectId) -> ProjectId {
        self.message = Some(format!(
            "Project created successfully! Project ID: {id}. Processing started..."
        ));
        self.project = Some(id.clone());
        self.phase = Phase::Designing;
        id
    }

    fn fail_create(&mut self, err: anyhow::Error) -> anyhow::Error {
        self.message = Some(format!("Upload Failed: {err:#}"));
        err
    }

    /// Watches the created project until its room model is ready and
    /// returns the resolved model URL.
    pub async fn wait_for_model(&mut self, cancel: CancellationToken) -> Result<Url> {
        let id = self
            .project
            .clone()
            .ok_or_else(|| anyhow!("no active project"))?;

        let backend = self.backend.clone();
        let outcome = watch_project(
            self.config.project_poll,
            self.config.endpoint.clone(),
            cancel,
            move || {
                let backend = backend.clone();
                let id = id.clone();
                async move { backend.project_status(id).await }
            },
        )
        .await;

        match outcome {
            ProjectOutcome::Ready(url) => {
                self.message = Some("Room model generated. Loading...".to_owned());
                Ok(url)
            }
            ProjectOutcome::Failed(status) => {
                self.message = Some(format!("Processing failed: {status}"));
                Err(anyhow!("processing failed: {status}"))
            }
            ProjectOutcome::GaveUp => Err(anyhow!(
                "gave up querying project status after repeated failures"
            )),
            ProjectOutcome::TimedOut => {
                Err(anyhow!("timed out waiting for the room model"))
            }
            ProjectOutcome::Cancelled => Err(anyhow!("project watch cancelled")),
        }
    }

    /// Adds a catalog item to the design. Placing an id twice is a no-op.
    pub fn place_furniture(&mut self, item: FurnitureItem) {
        if self.placed.iter().any(|placed| placed.id == item.id) {
            return;
        }
        self.placed.push(item);
    }

    /// Removes a placed item by id.
    pub fn remove_furniture(&mut self, id: &str) {
        self.placed.retain(|item| item.id != id);
    }
}

impl<B: Backend> Drop for SessionController<B> {
    fn drop(&mut self) {
        if let UploadSource::Phone(handoff) = &self.source {
            handoff.cancel.cancel();
        }
    }
}
