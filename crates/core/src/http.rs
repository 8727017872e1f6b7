//! Outbound base-URL validation shared by the provider client crates.
//!
//! Integration configs carry operator-supplied base URLs. Before any request
//! is issued, the URL is checked against a denylist of loopback, link-local,
//! and private addresses so a connector cannot be pointed at internal
//! infrastructure.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use url::Url;

use crate::error::{Result, SlateError};

const BLOCKED_HOSTS: &[&str] = &[
    "localhost",
    "0.0.0.0",
    "metadata",
    "metadata.google.internal",
];

/// Parse and validate a provider base URL.
///
/// Rejects non-HTTP schemes, literal private/loopback/link-local IPs, and
/// well-known internal hostnames. Set `allow_private_hosts` only in tests
/// that run against a local mock server.
pub fn validate_base_url(raw: &str, allow_private_hosts: bool) -> Result<Url> {
    let url = Url::parse(raw)
        .map_err(|e| SlateError::Config(format!("invalid base URL '{raw}': {e}")))?;

    let scheme = url.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(SlateError::Config(format!(
            "unsupported URL scheme '{scheme}' in '{raw}'"
        )));
    }

    let host = url
        .host_str()
        .ok_or_else(|| SlateError::Config(format!("base URL '{raw}' has no host")))?;

    if allow_private_hosts {
        return Ok(url);
    }

    if let Ok(ip) = host.parse::<IpAddr>() {
        if is_private_ip(&ip) {
            return Err(SlateError::Config(format!(
                "base URL host {ip} is a private or internal address"
            )));
        }
    }

    let lower = host.to_ascii_lowercase();
    for blocked in BLOCKED_HOSTS {
        if lower == *blocked || lower.ends_with(&format!(".{blocked}")) {
            return Err(SlateError::Config(format!(
                "base URL host '{host}' is blocked"
            )));
        }
    }

    Ok(url)
}

fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_private_ipv4(v4),
        IpAddr::V6(v6) => is_private_ipv6(v6),
    }
}

fn is_private_ipv4(ip: &Ipv4Addr) -> bool {
    ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_broadcast()
        || ip.is_unspecified()
        || ip.is_documentation()
        || {
            // Shared address space (100.64.0.0/10)
            let octets = ip.octets();
            octets[0] == 100 && (64..=127).contains(&octets[1])
        }
}

fn is_private_ipv6(ip: &Ipv6Addr) -> bool {
    if ip.is_loopback() || ip.is_unspecified() {
        return true;
    }
    if let Some(v4) = ip.to_ipv4_mapped() {
        return is_private_ipv4(&v4);
    }
    let segments = ip.segments();
    // Unique local (fc00::/7)
    if (segments[0] & 0xfe00) == 0xfc00 {
        return true;
    }
    // Link-local (fe80::/10)
    if (segments[0] & 0xffc0) == 0xfe80 {
        return true;
    }
    false
}
