//! Best-effort client IP extraction for click records
//!
//! With proxy headers trusted, the leftmost parseable `X-Forwarded-For` entry
//! is taken as the originating client, then `X-Real-IP`, then the socket peer
//! address. IPv4-mapped IPv6 addresses (`::ffff:a.b.c.d`) are reported as
//! plain IPv4.

use axum::http::HeaderMap;
use std::net::IpAddr;

use crate::config::{AnalyticsConfig, TrustedProxyMode};

use super::client::header_lossy;

/// Extract the client IP address for a request.
///
/// Returns `None` only when no header is trusted or parseable and the socket
/// address is unknown (e.g. requests driven in-process without a listener).
pub fn extract_client_ip(
    headers: &HeaderMap,
    socket_addr: Option<IpAddr>,
    config: &AnalyticsConfig,
) -> Option<IpAddr> {
    let from_headers = match config.trusted_proxy_mode {
        TrustedProxyMode::Standard => {
            extract_from_x_forwarded_for(headers).or_else(|| extract_from_x_real_ip(headers))
        }
        TrustedProxyMode::None => None,
    };

    from_headers.or(socket_addr).map(unmap_ipv4)
}

fn extract_from_x_forwarded_for(headers: &HeaderMap) -> Option<IpAddr> {
    let xff = header_lossy(headers, "x-forwarded-for")?;

    xff.split(',').find_map(parse_ip_token)
}

fn extract_from_x_real_ip(headers: &HeaderMap) -> Option<IpAddr> {
    let value = header_lossy(headers, "x-real-ip")?;
    parse_ip_token(&value)
}

/// Parse one forwarded entry, tolerating brackets and ports
/// (`[2001:db8::1]:443`, `203.0.113.9:8080`).
fn parse_ip_token(token: &str) -> Option<IpAddr> {
    let token = token.trim().trim_matches('"');
    if token.is_empty() {
        return None;
    }

    if let Ok(ip) = token.parse::<IpAddr>() {
        return Some(ip);
    }

    if let Some(rest) = token.strip_prefix('[') {
        return rest.split(']').next()?.parse::<IpAddr>().ok();
    }

    // IPv4 with a port; bare IPv6 was handled by the first parse
    let (host, _port) = token.rsplit_once(':')?;
    host.parse::<std::net::Ipv4Addr>().ok().map(IpAddr::V4)
}

/// Collapse IPv4-mapped IPv6 addresses to IPv4
pub fn unmap_ipv4(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V6(v6) => v6
            .to_ipv4_mapped()
            .map(IpAddr::V4)
            .unwrap_or(IpAddr::V6(v6)),
        v4 => v4,
    }
}
