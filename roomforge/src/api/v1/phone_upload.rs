//! Phone-upload endpoints: `POST /api/phone-upload/{session}` and
//! `GET /api/phone-upload-status/{session}`.

use serde::{Deserialize, Serialize};

use crate::error::RoomforgeError;

/// Minimum photos accepted for a reconstruction.
pub const MIN_PHOTOS: usize = 2;

/// Maximum photos accepted for a reconstruction.
pub const MAX_PHOTOS: usize = 4;

/// Checks a photo selection against the `[MIN_PHOTOS, MAX_PHOTOS]` bound.
pub fn validate_photo_count(count: usize) -> Result<(), RoomforgeError> {
    if (MIN_PHOTOS..=MAX_PHOTOS).contains(&count) {
        Ok(())
    } else {
        Err(RoomforgeError::InvalidPhotoCount {
            count,
            min: MIN_PHOTOS,
            max: MAX_PHOTOS,
        })
    }
}

/// Upload-session state as reported by the backend.
///
/// Driven exclusively by the backend; the client only ever observes it.
/// `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadStatus {
    Pending,
    Completed,
    Failed,
}

impl UploadStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, UploadStatus::Pending)
    }
}

/// A server-side reference to one uploaded photo. Opaque to the client;
/// captured on completion and echoed back during project creation only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileRef(pub serde_json::Value);

/// Response of `GET /api/phone-upload-status/{session}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhoneUploadStatusResponse {
    pub status: UploadStatus,

    /// Populated only once the session is `completed`.
    #[serde(default)]
    pub files: Vec<FileRef>,
}

/// Response of `POST /api/phone-upload/{session}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhoneUploadResponse {
    #[serde(default)]
    pub message: Option<String>,
}
