//! Client configuration.
//!
//! Everything is explicit: components receive a [`ClientConfig`] at
//! construction and never consult ambient process state for the backend
//! address or poll cadence.

use reqwest::Url;

use crate::poll::PollConfig;

/// Default port the phone-upload page is served on.
pub const DEFAULT_HANDOFF_PORT: u16 = 3000;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base endpoint of the backend API. Model URLs are rebased onto the
    /// same origin under its static-file mount.
    pub endpoint: Url,

    /// Host other devices on the network can reach this machine at.
    /// When unset, the LAN address is resolved automatically.
    pub public_host: Option<String>,

    /// Port the handoff link points at.
    pub handoff_port: u16,

    /// Tuning for the upload-status poll loop.
    pub upload_poll: PollConfig,

    /// Tuning for the project-status poll loop.
    pub project_poll: PollConfig,
}

impl ClientConfig {
    pub fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            public_host: None,
            handoff_port: DEFAULT_HANDOFF_PORT,
            upload_poll: PollConfig::upload_default(),
            project_poll: PollConfig::project_default(),
        }
    }
}
