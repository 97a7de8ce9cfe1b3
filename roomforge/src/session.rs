use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::RoomforgeError;

/// An unguessable identifier for a single phone-handoff attempt.
///
/// Minted on the desktop when the user asks to upload from their phone,
/// embedded in the handoff link, and quoted by both sides when talking to
/// the backend. A v4 UUID carries 122 bits of randomness, so concurrently
/// active sessions never collide in practice.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    /// Mints a fresh token. Pure apart from randomness consumption.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Validates a token received from the outside (a scanned link, a CLI
    /// argument). Anything that is not a UUID is rejected.
    pub fn parse(s: &str) -> Result<Self, RoomforgeError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(RoomforgeError::InvalidSessionToken(s.to_owned()));
        }
        Uuid::parse_str(trimmed)
            .map_err(|_| RoomforgeError::InvalidSessionToken(s.to_owned()))?;
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
