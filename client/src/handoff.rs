//! Publishing a handoff link on the terminal.
//!
//! The link has to carry an address the phone can reach, so the host is
//! either given explicitly or resolved to this machine's LAN address.
//! Loopback is never used.

use anyhow::{Context, Result};
use qrcode::render::unicode;
use qrcode::QrCode;

use roomforge::handoff::HandoffLink;

use crate::config::ClientConfig;

/// Resolves the host to embed in a handoff link.
pub fn resolve_public_host(config: &ClientConfig) -> Result<String> {
    if let Some(host) = &config.public_host {
        return Ok(host.clone());
    }
    let ip = local_ip_address::local_ip()
        .context("could not determine a LAN address; pass --public-host")?;
    Ok(ip.to_string())
}

/// Renders the link as a scannable unicode QR code.
pub fn qr_string(link: &HandoffLink) -> Result<String> {
    let code = QrCode::new(link.url().as_bytes())?;
    let rendered = code
        .render::<unicode::Dense1x2>()
        // Terminals are usually dark-on-light inverted; swap the colors
        // so the code scans either way.
        .dark_color(unicode::Dense1x2::Light)
        .light_color(unicode::Dense1x2::Dark)
        .build();
    Ok(rendered)
}

/// Prints the QR code plus the raw URL as a fallback.
pub fn publish(link: &HandoffLink) -> Result<()> {
    eprintln!("{}", qr_string(link)?);
    eprintln!("📱 Scan the code, or open: {}", link.url());
    Ok(())
}

#[cfg(test)]
mod tests {
    use roomforge::session::SessionToken;

    use super::*;

    #[test]
    fn renders_a_nonempty_code() {
        let link =
            HandoffLink::new("http", "192.168.1.23", 3000, SessionToken::generate()).unwrap();
        let qr = qr_string(&link).unwrap();
        assert!(!qr.is_empty());
    }

    #[test]
    fn an_explicit_host_wins_over_resolution() {
        let mut config =
            ClientConfig::new(reqwest::Url::parse("http://127.0.0.1:8000").unwrap());
        config.public_host = Some("192.168.1.23".to_owned());
        assert_eq!(resolve_public_host(&config).unwrap(), "192.168.1.23");
    }
}
