use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::config::{AnalyticsConfig, RedirectMode};
use crate::storage::Storage;

use super::handlers::{health_check, redirect_url, RedirectState};

pub fn create_redirect_router(
    storage: Arc<dyn Storage>,
    analytics: AnalyticsConfig,
    redirect_mode: RedirectMode,
) -> Router {
    let state = Arc::new(RedirectState {
        storage,
        analytics,
        redirect_mode,
    });

    Router::new()
        .route("/", get(health_check))
        .route("/{code}", get(redirect_url))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
