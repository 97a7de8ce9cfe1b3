//! Project endpoints: `POST /projects` and `GET /projects/{id}`.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::session::SessionToken;

/// Path prefix the backend reports `room_model_path` under.
pub const MODEL_PATH_PREFIX: &str = "projects/";

/// Static mount the backend serves project files from.
pub const PROJECT_FILES_MOUNT: &str = "project_files";

/// Backend-assigned project identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(String);

impl ProjectId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ProjectId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for ProjectId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Pipeline status as reported by the backend.
///
/// The pipeline grows stages over time (photogrammetry, detection, ...),
/// so this is a classified string rather than a closed enum: terminal
/// handling keys off the `complete` and `failed` substrings, and unknown
/// intermediate stages simply keep the client polling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectStatus(String);

impl ProjectStatus {
    pub fn new(status: impl Into<String>) -> Self {
        Self(status.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Any of the `*complete*` variants: `photogrammetry_complete`,
    /// `detection_complete`, `completed`.
    pub fn is_complete_variant(&self) -> bool {
        self.0.contains("complete")
    }

    /// The parallel `*failed*` absorbing states.
    pub fn is_failed(&self) -> bool {
        self.0.contains("failed")
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// JSON body of `POST /projects` when consuming a completed phone session.
/// The multipart alternative carries the photos themselves instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProjectFromSession {
    pub phone_upload_id: SessionToken,
}

/// Response of `POST /projects`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProjectResponse {
    pub id: ProjectId,
}

/// Response of `GET /projects/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectStatusResponse {
    pub status: ProjectStatus,

    /// Backend-relative model path. May appear before the asset is
    /// finalized; see [`room_model_url`] for when it can be trusted.
    #[serde(default)]
    pub room_model_path: Option<String>,
}

/// Resolves a usable model URL from a polled project state.
///
/// A non-empty `room_model_path` alone is not enough: the backend may
/// write the path before the asset is finalized, so it is only trusted
/// once the status is one of the complete variants. The reported path is
/// stripped of [`MODEL_PATH_PREFIX`] and rebased onto the backend's
/// [`PROJECT_FILES_MOUNT`].
pub fn room_model_url(
    base: &Url,
    status: &ProjectStatus,
    room_model_path: Option<&str>,
) -> Option<Url> {
    let path = room_model_path?.trim();
    if path.is_empty() || !status.is_complete_variant() {
        return None;
    }
    let relative = path.strip_prefix(MODEL_PATH_PREFIX).unwrap_or(path);

    let mut url = base.clone();
    {
        let mut segments = url.path_segments_mut().ok()?;
        segments.pop_if_empty();
        segments.push(PROJECT_FILES_MOUNT);
        segments.extend(relative.split('/'));
    }
    Some(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("http://127.0.0.1:8000").unwrap()
    }

    #[test]
    fn status_classification() {
        assert!(ProjectStatus::new("photogrammetry_complete").is_complete_variant());
        assert!(ProjectStatus::new("detection_complete").is_complete_variant());
        assert!(ProjectStatus::new("completed").is_complete_variant());
        assert!(!ProjectStatus::new("created").is_complete_variant());
        assert!(!ProjectStatus::new("photogrammetry_running").is_complete_variant());

        assert!(ProjectStatus::new("photogrammetry_failed").is_failed());
        assert!(ProjectStatus::new("detection_failed").is_failed());
        assert!(!ProjectStatus::new("detection_running").is_failed());
    }

    #[test]
    fn rebases_the_model_path_onto_the_static_mount() {
        let status = ProjectStatus::new("detection_complete");
        let url = room_model_url(
            &base(),
            &status,
            Some("projects/42/model/room_model.glb"),
        )
        .unwrap();
        assert!(url
            .as_str()
            .ends_with("/project_files/42/model/room_model.glb"));
    }

    #[test]
    fn keeps_paths_without_the_known_prefix() {
        let status = ProjectStatus::new("completed");
        let url = room_model_url(&base(), &status, Some("42/model/room_model.glb")).unwrap();
        assert!(url
            .as_str()
            .ends_with("/project_files/42/model/room_model.glb"));
    }

    #[test]
    fn empty_path_is_not_a_model() {
        let status = ProjectStatus::new("photogrammetry_complete");
        assert_eq!(room_model_url(&base(), &status, Some("")), None);
        assert_eq!(room_model_url(&base(), &status, None), None);
    }

    #[test]
    fn a_path_alone_is_not_trusted() {
        // The path can be written before the asset is finalized
        let status = ProjectStatus::new("photogrammetry_running");
        assert_eq!(
            room_model_url(&base(), &status, Some("projects/42/model/room_model.glb")),
            None
        );
    }
}
