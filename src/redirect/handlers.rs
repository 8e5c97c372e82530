use axum::{
    extract::{ConnectInfo, Path, State},
    http::{header::LOCATION, HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use url::Url;

use crate::analytics::capture_visit;
use crate::config::{AnalyticsConfig, RedirectMode};
use crate::error::{AppError, AppResult};
use crate::storage::Storage;

pub struct RedirectState {
    pub storage: Arc<dyn Storage>,
    pub analytics: AnalyticsConfig,
    pub redirect_mode: RedirectMode,
}

/// Record the visit and redirect to the original URL
pub async fn redirect_url(
    State(state): State<Arc<RedirectState>>,
    Path(code): Path<String>,
    connect_info: Option<Extension<ConnectInfo<SocketAddr>>>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let started = Instant::now();
    let socket_ip = connect_info.map(|Extension(ConnectInfo(addr))| addr.ip());
    let visit = capture_visit(&headers, socket_ip, &state.analytics);

    let destination = match state.storage.record_click(&code, &visit).await {
        Ok(Some(destination)) => destination,
        Ok(None) => return Err(AppError::not_found("URL not found")),
        Err(e) => {
            tracing::error!(short_code = %code, error = %e, "failed to record click");
            return Err(AppError::Internal(anyhow::anyhow!("Failed to resolve short link")));
        }
    };

    let location = HeaderValue::try_from(location_for(&destination)).map_err(|e| {
        tracing::error!(short_code = %code, error = %e, "stored destination is not a valid header");
        AppError::Internal(anyhow::anyhow!("Failed to resolve short link"))
    })?;

    tracing::debug!(
        short_code = %code,
        device = %visit.client.device,
        browser = %visit.client.browser,
        os = %visit.client.os,
        elapsed_us = started.elapsed().as_micros() as u64,
        "redirect served"
    );

    Ok((state.redirect_mode.status_code(), [(LOCATION, location)]).into_response())
}

/// Destinations are stored as typed; anything outside printable ASCII is
/// sent in the parser's serialization (punycode host, percent-encoded path)
fn location_for(destination: &str) -> String {
    if destination.bytes().all(|b| b.is_ascii_graphic()) {
        return destination.to_string();
    }
    match Url::parse(destination) {
        Ok(url) => url.into(),
        Err(_) => destination.to_string(),
    }
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "OK" })
}
