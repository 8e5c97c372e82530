use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::handlers::{AppState, MessageResponse};
use crate::api::validation::{
    normalize_email, validate_email, validate_login_password, validate_new_password,
};
use crate::auth::session::{ProfileUpdate, SessionTokens};
use crate::auth::AuthenticatedAccount;
use crate::error::{AppError, AppResult};
use crate::models::AccountProfile;

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub current_password: Option<String>,
    #[serde(default)]
    pub new_password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProfileUpdated {
    pub message: String,
    pub email: String,
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<MessageResponse>)> {
    let Json(payload) = payload?;
    let email = normalize_email(payload.email.as_deref().unwrap_or_default());
    let password = payload.password.unwrap_or_default();

    let mut errors = Vec::new();
    validate_email(&email, &mut errors);
    validate_new_password("password", &password, &mut errors);
    if !errors.is_empty() {
        return Err(AppError::validation(errors));
    }

    state.sessions.register(&email, &password).await?;
    Ok((
        StatusCode::CREATED,
        MessageResponse::new("User registered successfully"),
    ))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> AppResult<Json<SessionTokens>> {
    let Json(payload) = payload?;
    let email = normalize_email(payload.email.as_deref().unwrap_or_default());
    let password = payload.password.unwrap_or_default();

    let mut errors = Vec::new();
    validate_email(&email, &mut errors);
    validate_login_password(&password, &mut errors);
    if !errors.is_empty() {
        return Err(AppError::validation(errors));
    }

    let tokens = state.sessions.login(&email, &password).await?;
    Ok(Json(tokens))
}

pub async fn refresh_token(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> AppResult<Json<SessionTokens>> {
    // A missing or unreadable body is the same as a missing token
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    let tokens = state
        .sessions
        .refresh(payload.refresh_token.as_deref())
        .await?;
    Ok(Json(tokens))
}

pub async fn logout(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> AppResult<Json<MessageResponse>> {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    state
        .sessions
        .logout(payload.refresh_token.as_deref())
        .await?;
    Ok(MessageResponse::new("Logged out successfully"))
}

pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<AuthenticatedAccount>,
) -> AppResult<Json<AccountProfile>> {
    let profile = state.sessions.profile(account.id).await?;
    Ok(Json(profile))
}

pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(account): Extension<AuthenticatedAccount>,
    payload: Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> AppResult<Json<ProfileUpdated>> {
    let Json(payload) = payload?;

    let mut errors = Vec::new();
    let email = payload.email.as_deref().map(normalize_email);
    if let Some(email) = &email {
        validate_email(email, &mut errors);
    }
    if let Some(new_password) = &payload.new_password {
        validate_new_password("newPassword", new_password, &mut errors);
    }
    if !errors.is_empty() {
        return Err(AppError::validation(errors));
    }

    let email = state
        .sessions
        .update_profile(
            account.id,
            ProfileUpdate {
                email,
                current_password: payload.current_password,
                new_password: payload.new_password,
            },
        )
        .await?;

    Ok(Json(ProfileUpdated {
        message: "Profile updated successfully".to_string(),
        email,
    }))
}
