//! Request-level error type and its HTTP mapping

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::auth::password::PasswordError;
use crate::auth::tokens::TokenError;
use crate::storage::StorageError;

/// Why an authentication attempt was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthFailure {
    #[error("No authorization token")]
    MissingAccessToken,
    #[error("Refresh token not provided")]
    MissingRefreshToken,
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    ExpiredToken,
    #[error("Invalid refresh token")]
    InvalidRefreshToken,
    #[error("User not found")]
    AccountNotFound,
    #[error("Invalid password")]
    InvalidPassword,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{message}")]
    Validation {
        message: String,
        errors: Vec<FieldError>,
    },
    #[error(transparent)]
    Unauthorized(#[from] AuthFailure),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation(errors: Vec<FieldError>) -> Self {
        AppError::Validation {
            message: "Validation Error".to_string(),
            errors,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        AppError::Validation {
            message: message.into(),
            errors: Vec::new(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        AppError::NotFound(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } | AppError::Conflict(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::DuplicateEmail => AppError::Conflict("User already exists".to_string()),
            StorageError::DuplicateShortCode => AppError::Internal(anyhow::anyhow!(err)),
            StorageError::Other(e) => AppError::Internal(e),
        }
    }
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => AppError::Unauthorized(AuthFailure::ExpiredToken),
            TokenError::Invalid => AppError::Unauthorized(AuthFailure::InvalidToken),
            TokenError::Signing(_) => AppError::Internal(anyhow::anyhow!(err)),
        }
    }
}

impl From<PasswordError> for AppError {
    fn from(err: PasswordError) -> Self {
        AppError::Internal(anyhow::anyhow!(err))
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::bad_request(rejection.body_text())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    status: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<FieldError>,
}

/// Full message of a 5xx error, attached to the response so the reporting
/// middleware can log it and decide whether to expose it.
#[derive(Debug, Clone)]
pub struct InternalErrorDetails(pub String);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (message, errors) = match self {
            AppError::Validation { message, errors } => (message, errors),
            // Full chain; the reporting middleware strips it in production
            AppError::Internal(e) => (format!("{e:#}"), Vec::new()),
            other => (other.to_string(), Vec::new()),
        };
        let body = ErrorBody {
            status: if status.is_server_error() { "error" } else { "fail" },
            message: message.clone(),
            errors,
        };

        let mut response = (status, Json(body)).into_response();
        if status.is_server_error() {
            response
                .extensions_mut()
                .insert(InternalErrorDetails(message));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_error_classes() {
        assert_eq!(
            AppError::validation(vec![FieldError::new("email", "bad")]).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(AuthFailure::MissingAccessToken).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(AppError::not_found("URL not found").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::from(StorageError::DuplicateEmail).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(StorageError::DuplicateShortCode).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn token_errors_map_to_auth_failures() {
        assert!(matches!(
            AppError::from(TokenError::Expired),
            AppError::Unauthorized(AuthFailure::ExpiredToken)
        ));
        assert!(matches!(
            AppError::from(TokenError::Invalid),
            AppError::Unauthorized(AuthFailure::InvalidToken)
        ));
    }

    #[test]
    fn internal_errors_carry_details_extension() {
        let response = AppError::Internal(anyhow::anyhow!("db exploded")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let details = response.extensions().get::<InternalErrorDetails>().unwrap();
        assert_eq!(details.0, "db exploded");

        let response = AppError::not_found("nope").into_response();
        assert!(response.extensions().get::<InternalErrorDetails>().is_none());
    }
}
