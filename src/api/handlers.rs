use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    Extension, Json,
};
use chrono::{Local, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::api::validation::validate_destination;
use crate::auth::session::SessionManager;
use crate::auth::AuthenticatedAccount;
use crate::error::{AppError, AppResult};
use crate::models::link::{CreateLinkRequest, ListLinksQuery};
use crate::models::ShortLink;
use crate::shortcode::{ShortCodeGenerator, MAX_GENERATION_ATTEMPTS};
use crate::storage::{Storage, StorageError};

pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub sessions: Arc<SessionManager>,
    pub codes: Arc<dyn ShortCodeGenerator>,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

/// Shorten a destination URL for the caller
pub async fn shorten_url(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<AuthenticatedAccount>,
    payload: Result<Json<CreateLinkRequest>, JsonRejection>,
) -> AppResult<Json<ShortLink>> {
    let Json(payload) = payload?;

    let mut errors = Vec::new();
    let destination = validate_destination(
        payload.original_url.as_deref().unwrap_or_default(),
        &mut errors,
    );
    let Some(destination) = destination else {
        return Err(AppError::validation(errors));
    };

    for attempt in 1..=MAX_GENERATION_ATTEMPTS {
        let code = state.codes.generate();
        match state
            .storage
            .create_link(&code, &destination, account.id)
            .await
        {
            Ok(link) => {
                tracing::info!("Account {} created link {}", account.id, link.short_code);
                return Ok(Json(link));
            }
            Err(StorageError::DuplicateShortCode) => {
                tracing::warn!(attempt, short_code = %code, "short code collision, retrying");
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(AppError::Internal(anyhow::anyhow!(
        "could not allocate a unique short code after {MAX_GENERATION_ATTEMPTS} attempts"
    )))
}

/// List the caller's links, newest first
pub async fn list_urls(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<AuthenticatedAccount>,
    query: Result<Query<ListLinksQuery>, QueryRejection>,
) -> AppResult<Json<Vec<ShortLink>>> {
    let Query(query) = query?;
    let created_since = query.today.then(local_midnight);
    let links = state.storage.list_links(account.id, created_since).await?;
    Ok(Json(links))
}

/// Delete one of the caller's links
pub async fn delete_url(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<AuthenticatedAccount>,
    Path(id): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    // Someone else's link is indistinguishable from a missing one
    let link_id = id
        .parse::<i64>()
        .map_err(|_| AppError::not_found("URL not found"))?;

    if !state.storage.delete_link(link_id, account.id).await? {
        return Err(AppError::not_found("URL not found"));
    }

    tracing::info!("Account {} deleted link {}", account.id, link_id);
    Ok(MessageResponse::new("URL deleted successfully"))
}

/// Health check endpoint
pub async fn health_check() -> Json<MessageResponse> {
    MessageResponse::new("OK")
}

/// Unix timestamp of the most recent local midnight
fn local_midnight() -> i64 {
    Local::now()
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .and_then(|midnight| midnight.and_local_timezone(Local).earliest())
        .map(|midnight| midnight.timestamp())
        .unwrap_or_else(|| Utc::now().timestamp() - 24 * 60 * 60)
}
