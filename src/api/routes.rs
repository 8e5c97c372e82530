use axum::{
    http::{HeaderValue, StatusCode, Uri},
    middleware,
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::auth::session::SessionManager;
use crate::auth::{auth_middleware, AuthService};
use crate::config::{CorsConfig, Environment};
use crate::shortcode::ShortCodeGenerator;
use crate::storage::Storage;

use super::account::{get_profile, login, logout, refresh_token, register, update_profile};
use super::handlers::{delete_url, health_check, list_urls, shorten_url, AppState};
use super::middleware::report_errors;

pub struct ApiContext {
    pub storage: Arc<dyn Storage>,
    pub sessions: Arc<SessionManager>,
    pub codes: Arc<dyn ShortCodeGenerator>,
    pub environment: Environment,
    pub cors: CorsConfig,
}

pub fn create_api_router(context: ApiContext) -> Router {
    let auth_service = Arc::new(AuthService::new(context.sessions.tokens()));
    let state = Arc::new(AppState {
        storage: context.storage,
        sessions: context.sessions,
        codes: context.codes,
    });

    let public_routes = Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh-token", post(refresh_token))
        .route("/auth/logout", post(logout))
        .route("/health", get(health_check))
        .with_state(Arc::clone(&state));

    let protected_routes = Router::new()
        .route("/auth/profile", get(get_profile).put(update_profile))
        .route("/auth/verify", get(get_profile))
        .route("/url/shorten", post(shorten_url))
        .route("/url", get(list_urls))
        .route("/url/{id}", delete(delete_url))
        .route_layer(middleware::from_fn(move |headers, req, next| {
            let auth = Arc::clone(&auth_service);
            auth_middleware(auth, headers, req, next)
        }))
        .with_state(Arc::clone(&state));

    let environment = context.environment;
    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .fallback(not_found)
        .layer(middleware::from_fn(move |req, next| {
            report_errors(environment, req, next)
        }))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&context.cors))
}

async fn not_found(uri: Uri) -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "message": format!("Not Found - {}", uri.path()) })),
    )
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if config.allowed_origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();
    layer.allow_origin(origins)
}
