//! The phone side of a handoff: submitting photos against a scanned
//! session link.
//!
//! A session is single-shot. Once a submission succeeds the token is
//! consumed and the submitter refuses further file selection; a failed
//! submission keeps the photos so the same session can be retried.

use std::mem;
use std::path::PathBuf;

use anyhow::Result;

use roomforge::api::v1::phone_upload::validate_photo_count;
use roomforge::error::RoomforgeError;
use roomforge::handoff::HandoffLink;
use roomforge::session::SessionToken;

use crate::api::Backend;

/// Where a phone-side submission stands.
#[derive(Debug, Clone, PartialEq)]
pub enum RemotePhase {
    /// Waiting for the user to pick photos.
    Idle,

    /// Photos picked, not yet sent.
    FilesSelected(Vec<PathBuf>),

    /// A submission is in flight.
    Submitting,

    /// The session is consumed; no further submissions.
    Success,

    /// The last submission failed; the photos are retained for a retry.
    Failure {
        message: String,
        photos: Vec<PathBuf>,
    },
}

/// Drives one phone-upload session from the uploading device.
#[derive(Debug)]
pub struct RemoteSubmitter {
    token: SessionToken,
    phase: RemotePhase,
}

impl RemoteSubmitter {
    /// Builds a submitter from a scanned handoff URL.
    ///
    /// An invalid link is a terminal precondition: there is no session to
    /// submit against, so the caller should show an error and stop.
    pub fn from_link(url: &str) -> Result<Self, RoomforgeError> {
        let token = HandoffLink::token_from_url(url)?;
        Ok(Self::from_token(token))
    }

    pub fn from_token(token: SessionToken) -> Self {
        Self {
            token,
            phase: RemotePhase::Idle,
        }
    }

    pub fn token(&self) -> &SessionToken {
        &self.token
    }

    pub fn phase(&self) -> &RemotePhase {
        &self.phase
    }

    /// Picks the photos to submit. Rejects out-of-range counts without
    /// touching the current selection, and refuses any selection once the
    /// session has been consumed.
    pub fn select_files(&mut self, photos: Vec<PathBuf>) -> Result<(), RoomforgeError> {
        if self.phase == RemotePhase::Success {
            return Err(RoomforgeError::SessionConsumed(
                self.token.as_str().to_owned(),
            ));
        }
        validate_photo_count(photos.len())?;
        self.phase = RemotePhase::FilesSelected(photos);
        Ok(())
    }

    /// Sends the selected photos against the session token.
    pub async fn submit<B: Backend>(&mut self, backend: &B) -> Result<()> {
        let photos = match mem::replace(&mut self.phase, RemotePhase::Submitting) {
            RemotePhase::FilesSelected(photos) => photos,
            RemotePhase::Failure { photos, .. } => photos,
            other => {
                self.phase = other;
                anyhow::bail!("no photos selected for this session");
            }
        };

        match backend
            .submit_phone_photos(self.token.clone(), photos.clone())
            .await
        {
            Ok(_) => {
                self.phase = RemotePhase::Success;
                Ok(())
            }
            Err(err) => {
                self.phase = RemotePhase::Failure {
                    message: format!("{err:#}"),
                    photos,
                };
                Err(err)
            }
        }
    }
}
