//! Handoff links: how the upload step moves from the desktop to a phone.
//!
//! The desktop mints a [`SessionToken`], wraps it in a link of the form
//! `{scheme}://{host}:{port}/phone-upload/{token}`, and shows it as a QR
//! code. The phone opens the link and submits photos against the embedded
//! token. The link must carry an address the *phone* can reach, which is
//! why loopback hosts are rejected outright.

use std::net::IpAddr;

use url::Url;

use crate::error::RoomforgeError;
use crate::session::SessionToken;

/// Path segment of the phone-upload route.
pub const HANDOFF_ROUTE: &str = "phone-upload";

/// A network-reachable link carrying an upload session to a second device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandoffLink {
    scheme: String,
    host: String,
    port: u16,
    token: SessionToken,
}

impl HandoffLink {
    /// Builds a handoff link.
    ///
    /// `host` must be reachable from another device on the same network:
    /// `localhost`, loopback and unspecified addresses are refused, since
    /// a phone scanning the code would resolve them to itself.
    pub fn new(
        scheme: &str,
        host: &str,
        port: u16,
        token: SessionToken,
    ) -> Result<Self, RoomforgeError> {
        match scheme {
            "http" | "https" => {}
            other => {
                return Err(RoomforgeError::UnsupportedHandoffScheme(other.to_owned()));
            }
        }
        if is_unreachable_host(host) {
            return Err(RoomforgeError::UnreachableHandoffHost(host.to_owned()));
        }
        Ok(Self {
            scheme: scheme.to_owned(),
            host: host.to_owned(),
            port,
            token,
        })
    }

    pub fn token(&self) -> &SessionToken {
        &self.token
    }

    /// The full URL, for QR rendering and as a human-readable fallback.
    pub fn url(&self) -> String {
        format!(
            "{}://{}:{}/{}/{}",
            self.scheme, self.host, self.port, HANDOFF_ROUTE, self.token
        )
    }

    /// Extracts the session token from a scanned handoff URL (phone side).
    pub fn token_from_url(url: &str) -> Result<SessionToken, RoomforgeError> {
        let parsed = Url::parse(url)
            .map_err(|_| RoomforgeError::MalformedHandoffLink(url.to_owned()))?;
        let mut segments = parsed
            .path_segments()
            .ok_or_else(|| RoomforgeError::MalformedHandoffLink(url.to_owned()))?;
        match (segments.next(), segments.next(), segments.next()) {
            (Some(HANDOFF_ROUTE), Some(token), None) => SessionToken::parse(token),
            _ => Err(RoomforgeError::MalformedHandoffLink(url.to_owned())),
        }
    }
}

fn is_unreachable_host(host: &str) -> bool {
    if host.is_empty() || host.eq_ignore_ascii_case("localhost") {
        return true;
    }
    // Bracketed IPv6 literals as they appear in URLs
    let bare = host.trim_start_matches('[').trim_end_matches(']');
    match bare.parse::<IpAddr>() {
        Ok(ip) => ip.is_loopback() || ip.is_unspecified(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_the_phone_upload_url() {
        let token = SessionToken::generate();
        let link = HandoffLink::new("http", "192.168.1.23", 3000, token.clone()).unwrap();
        assert_eq!(
            link.url(),
            format!("http://192.168.1.23:3000/phone-upload/{}", token)
        );
    }

    #[test]
    fn refuses_hosts_a_phone_cannot_reach() {
        let token = SessionToken::generate();
        for host in ["localhost", "LOCALHOST", "127.0.0.1", "::1", "[::1]", "0.0.0.0", ""] {
            let err = HandoffLink::new("http", host, 3000, token.clone()).unwrap_err();
            assert!(
                matches!(err, RoomforgeError::UnreachableHandoffHost(_)),
                "host {host:?} should be refused, got {err:?}"
            );
        }
    }

    #[test]
    fn refuses_non_http_schemes() {
        let token = SessionToken::generate();
        let err = HandoffLink::new("ftp", "192.168.1.23", 3000, token).unwrap_err();
        assert!(matches!(err, RoomforgeError::UnsupportedHandoffScheme(_)));
    }

    #[test]
    fn extracts_the_token_from_a_link() {
        let token = SessionToken::generate();
        let link = HandoffLink::new("http", "192.168.1.23", 3000, token.clone()).unwrap();
        assert_eq!(HandoffLink::token_from_url(&link.url()).unwrap(), token);
    }

    #[test]
    fn rejects_links_without_a_session() {
        for url in [
            "not a url",
            "http://192.168.1.23:3000/",
            "http://192.168.1.23:3000/phone-upload",
            "http://192.168.1.23:3000/phone-upload/",
            "http://192.168.1.23:3000/phone-upload/not-a-uuid",
            "http://192.168.1.23:3000/other-route/5f0c54c2-55b8-4dcb-89b8-ce123a4f3a4d",
            "http://192.168.1.23:3000/phone-upload/5f0c54c2-55b8-4dcb-89b8-ce123a4f3a4d/extra",
        ] {
            assert!(
                HandoffLink::token_from_url(url).is_err(),
                "{url:?} should be rejected"
            );
        }
    }
}
