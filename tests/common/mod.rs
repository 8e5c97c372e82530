//! Shared helpers for driving the routers in-process
#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use shortly::api::{create_api_router, ApiContext};
use shortly::auth::session::SessionManager;
use shortly::auth::tokens::TokenService;
use shortly::config::{AnalyticsConfig, AuthConfig, CorsConfig, Environment, RedirectMode};
use shortly::redirect::create_redirect_router;
use shortly::shortcode::{RandomCodeGenerator, ShortCodeGenerator};
use shortly::storage::{SqliteStorage, Storage};
use std::sync::Arc;
use tower::ServiceExt;

pub const PASSWORD: &str = "password123";

pub struct TestApp {
    pub api: Router,
    pub redirect: Router,
    pub storage: Arc<dyn Storage>,
}

pub fn test_auth_config() -> AuthConfig {
    AuthConfig {
        access_token_secret: "test-access-secret".to_string(),
        refresh_token_secret: "test-refresh-secret".to_string(),
        access_token_ttl_secs: AuthConfig::DEFAULT_ACCESS_TTL_SECS,
        refresh_token_ttl_secs: AuthConfig::DEFAULT_REFRESH_TTL_SECS,
    }
}

pub async fn create_test_storage() -> Arc<dyn Storage> {
    let storage = SqliteStorage::new("sqlite::memory:", 1).await.unwrap();
    storage.init().await.unwrap();
    Arc::new(storage)
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(Arc::new(RandomCodeGenerator::new(7)), Environment::Development).await
}

pub async fn spawn_app_with(
    codes: Arc<dyn ShortCodeGenerator>,
    environment: Environment,
) -> TestApp {
    let storage = create_test_storage().await;
    let tokens = Arc::new(TokenService::new(&test_auth_config()));
    let sessions = Arc::new(SessionManager::new(storage.clone(), tokens));

    let api = create_api_router(ApiContext {
        storage: storage.clone(),
        sessions,
        codes,
        environment,
        cors: CorsConfig::default(),
    });
    let redirect =
        create_redirect_router(storage.clone(), AnalyticsConfig::default(), RedirectMode::Found);

    TestApp {
        api,
        redirect,
        storage,
    }
}

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

/// Run one request and decode the JSON body (`Null` when empty)
pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, body)
}

pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub user_id: i64,
}

pub async fn register_and_login(app: &TestApp, email: &str) -> Session {
    let (status, _) = send(
        &app.api,
        json_request(
            "POST",
            "/auth/register",
            None,
            json!({ "email": email, "password": PASSWORD }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        &app.api,
        json_request(
            "POST",
            "/auth/login",
            None,
            json!({ "email": email, "password": PASSWORD }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    Session {
        access_token: body["accessToken"].as_str().unwrap().to_string(),
        refresh_token: body["refreshToken"].as_str().unwrap().to_string(),
        user_id: body["userId"].as_i64().unwrap(),
    }
}

/// Shorten a URL and return the created link JSON
pub async fn shorten(app: &TestApp, token: &str, url: &str) -> Value {
    let (status, body) = send(
        &app.api,
        json_request("POST", "/url/shorten", Some(token), json!({ "originalUrl": url })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "shorten failed: {body}");
    body
}
