use axum::{
    body::{to_bytes, Body},
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

use crate::auth::AuthenticatedAccount;
use crate::config::Environment;
use crate::error::InternalErrorDetails;

const MAX_BUFFERED_BODY: usize = 2 * 1024 * 1024;
const REDACTED: &str = "[REDACTED]";
const GENERIC_MESSAGE: &str = "Something went wrong";

/// Log failed requests with enough context to reproduce them.
///
/// The request body is buffered up front so it can be logged (with
/// credentials redacted) if the handler fails with a 5xx. In production
/// the internal error message is replaced before it reaches the client.
pub async fn report_errors(environment: Environment, request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();
    let bytes = match to_bytes(body, MAX_BUFFERED_BODY).await {
        Ok(bytes) => bytes,
        Err(_) => {
            return (
                StatusCode::PAYLOAD_TOO_LARGE,
                Json(json!({ "status": "fail", "message": "Request body too large" })),
            )
                .into_response();
        }
    };

    let method = parts.method.clone();
    let path = parts.uri.path().to_string();
    let query = parts.uri.query().unwrap_or("").to_string();
    let logged_body = redacted_body(&bytes);

    let response = next
        .run(Request::from_parts(parts, Body::from(bytes)))
        .await;

    let status = response.status();
    if status.is_server_error() {
        let message = response
            .extensions()
            .get::<InternalErrorDetails>()
            .map(|details| details.0.clone())
            .unwrap_or_else(|| status.to_string());
        let account = response
            .extensions()
            .get::<AuthenticatedAccount>()
            .map(|account| account.id.to_string())
            .unwrap_or_else(|| "anonymous".to_string());

        tracing::error!(
            method = %method,
            path = %path,
            query = %query,
            body = %logged_body,
            account = %account,
            "Request failed: {}",
            message
        );

        if environment.is_production() {
            return (
                status,
                Json(json!({ "status": "error", "message": GENERIC_MESSAGE })),
            )
                .into_response();
        }
    } else if status.is_client_error() {
        tracing::debug!("{} {} -> {}", method, path, status);
    }

    response
}

fn redacted_body(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        return String::new();
    }
    match serde_json::from_slice::<Value>(bytes) {
        Ok(mut value) => {
            redact(&mut value);
            value.to_string()
        }
        Err(_) => format!("<{} bytes>", bytes.len()),
    }
}

fn redact(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, field) in map.iter_mut() {
                let key = key.to_lowercase();
                if key.contains("password") || key.contains("token") {
                    *field = Value::String(REDACTED.to_string());
                } else {
                    redact(field);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(redact),
        _ => {}
    }
}
