pub mod password;
pub mod session;
pub mod tokens;

use axum::{
    extract::Request,
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::error::{AppError, AuthFailure};
use tokens::{TokenError, TokenService};

/// Identity of the caller, inserted into request extensions by [`auth_middleware`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedAccount {
    pub id: i64,
}

pub struct AuthService {
    tokens: Arc<TokenService>,
}

impl AuthService {
    pub fn new(tokens: Arc<TokenService>) -> Self {
        Self { tokens }
    }

    pub fn authenticate(&self, headers: &HeaderMap) -> Result<AuthenticatedAccount, AuthFailure> {
        let token = bearer_token(headers).ok_or(AuthFailure::MissingAccessToken)?;

        let claims = self
            .tokens
            .validate_access_token(token)
            .map_err(|e| match e {
                TokenError::Expired => AuthFailure::ExpiredToken,
                _ => AuthFailure::InvalidToken,
            })?;

        let id = claims.account_id().map_err(|_| AuthFailure::InvalidToken)?;
        Ok(AuthenticatedAccount { id })
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

pub async fn auth_middleware(
    auth_service: Arc<AuthService>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Response {
    match auth_service.authenticate(&headers) {
        Ok(account) => {
            request.extensions_mut().insert(account);
            let mut response = next.run(request).await;
            // Lets the error reporter attribute failures to the caller
            response.extensions_mut().insert(account);
            response
        }
        Err(failure) => {
            tracing::debug!("Rejected request: {}", failure);
            AppError::from(failure).into_response()
        }
    }
}
