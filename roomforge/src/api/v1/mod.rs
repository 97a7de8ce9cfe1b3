//! Version 1 of the backend API.
//!
//! Request and response bodies for project creation, processing-status
//! queries, phone uploads and the furniture catalog. Field names follow
//! the backend exactly; nothing here performs I/O.

pub mod furniture;
pub mod phone_upload;
pub mod project;

use std::fmt;

use serde::{Deserialize, Serialize};

/// Error body the backend attaches to non-2xx responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable reason, surfaced to the user verbatim.
    pub detail: String,
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.detail)
    }
}
