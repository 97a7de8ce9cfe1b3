use displaydoc::Display;

/// Errors produced by the core roomforge types.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum RoomforgeError {
    /// invalid upload session token: {0:?}
    InvalidSessionToken(String),

    /// host {0:?} is not reachable from another device on the network
    UnreachableHandoffHost(String),

    /// unsupported handoff scheme: {0:?}
    UnsupportedHandoffScheme(String),

    /// please select between {min} and {max} photos ({count} selected)
    InvalidPhotoCount {
        count: usize,
        min: usize,
        max: usize,
    },

    /// not a valid handoff link: {0:?}
    MalformedHandoffLink(String),

    /// upload session {0} has already been consumed
    SessionConsumed(String),
}

impl std::error::Error for RoomforgeError {}
