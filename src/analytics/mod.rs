//! Visit analytics for the redirect path
//!
//! Turns an inbound redirect request into a [`Visit`]: coarse client labels,
//! best-effort source IP and referer. Nothing here can fail; missing or
//! malformed inputs degrade to `None` or the fallback label.

pub mod client;
pub mod ip_extractor;

pub use client::{ClientProfile, UNKNOWN_LABEL};
pub use ip_extractor::extract_client_ip;

use axum::http::{header::REFERER, HeaderMap};
use std::net::IpAddr;

use crate::config::AnalyticsConfig;
use crate::models::Visit;

/// Build the visit record for one redirect request
pub fn capture_visit(
    headers: &HeaderMap,
    socket_ip: Option<IpAddr>,
    config: &AnalyticsConfig,
) -> Visit {
    Visit {
        clicked_at: chrono::Utc::now().timestamp(),
        user_agent: client::user_agent(headers),
        ip_address: extract_client_ip(headers, socket_ip, config).map(|ip| ip.to_string()),
        referer: client::header_lossy(headers, REFERER.as_str()),
        client: ClientProfile::from_headers(headers),
    }
}
