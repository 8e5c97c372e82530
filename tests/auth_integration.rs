//! Account and session flow through the API router

mod common;

use axum::http::StatusCode;
use common::{get_request, json_request, register_and_login, send, spawn_app, PASSWORD};
use serde_json::json;

#[tokio::test]
async fn test_register_validation_errors() {
    let app = spawn_app().await;

    let (status, body) = send(
        &app.api,
        json_request(
            "POST",
            "/auth/register",
            None,
            json!({ "email": "not-an-email", "password": "short" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "fail");
    assert_eq!(body["message"], "Validation Error");
    let fields: Vec<&str> = body["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap())
        .collect();
    assert!(fields.contains(&"email"));
    assert!(fields.contains(&"password"));
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = spawn_app().await;
    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/auth/register")
        .header("content-type", "application/json")
        .body(axum::body::Body::from("{not json"))
        .unwrap();

    let (status, body) = send(&app.api, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "fail");
}

#[tokio::test]
async fn test_duplicate_registration_is_rejected() {
    let app = spawn_app().await;
    register_and_login(&app, "dup@example.com").await;

    // Same address, different case
    let (status, body) = send(
        &app.api,
        json_request(
            "POST",
            "/auth/register",
            None,
            json!({ "email": "Dup@Example.com", "password": PASSWORD }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "User already exists");
}

#[tokio::test]
async fn test_login_failures() {
    let app = spawn_app().await;
    register_and_login(&app, "user@example.com").await;

    let (status, body) = send(
        &app.api,
        json_request(
            "POST",
            "/auth/login",
            None,
            json!({ "email": "nobody@example.com", "password": PASSWORD }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "User not found");

    let (status, body) = send(
        &app.api,
        json_request(
            "POST",
            "/auth/login",
            None,
            json!({ "email": "user@example.com", "password": "wrongpass1" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid password");
}

#[tokio::test]
async fn test_refresh_token_is_single_use() {
    let app = spawn_app().await;
    let session = register_and_login(&app, "rotate@example.com").await;

    let (status, body) = send(
        &app.api,
        json_request(
            "POST",
            "/auth/refresh-token",
            None,
            json!({ "refreshToken": session.refresh_token }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["userId"], session.user_id);
    let rotated = body["refreshToken"].as_str().unwrap().to_string();
    assert_ne!(rotated, session.refresh_token);

    // The new access token works
    let access = body["accessToken"].as_str().unwrap();
    let (status, _) = send(&app.api, get_request("/auth/profile", Some(access))).await;
    assert_eq!(status, StatusCode::OK);

    // Replaying the old refresh token fails
    let (status, body) = send(
        &app.api,
        json_request(
            "POST",
            "/auth/refresh-token",
            None,
            json!({ "refreshToken": session.refresh_token }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid refresh token");
}

#[tokio::test]
async fn test_concurrent_refresh_succeeds_once() {
    let app = spawn_app().await;
    let session = register_and_login(&app, "race@example.com").await;

    let mut handles = vec![];
    for _ in 0..5 {
        let router = app.api.clone();
        let token = session.refresh_token.clone();
        handles.push(tokio::spawn(async move {
            send(
                &router,
                json_request(
                    "POST",
                    "/auth/refresh-token",
                    None,
                    json!({ "refreshToken": token }),
                ),
            )
            .await
            .0
        }));
    }

    let mut ok = 0;
    for handle in handles {
        match handle.await.unwrap() {
            StatusCode::OK => ok += 1,
            StatusCode::UNAUTHORIZED => {}
            other => panic!("unexpected status {other}"),
        }
    }
    assert_eq!(ok, 1, "a refresh token must be redeemable exactly once");
}

#[tokio::test]
async fn test_refresh_without_token() {
    let app = spawn_app().await;
    let (status, body) = send(
        &app.api,
        json_request("POST", "/auth/refresh-token", None, json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Refresh token not provided");
}

#[tokio::test]
async fn test_logout_invalidates_refresh_token() {
    let app = spawn_app().await;
    let session = register_and_login(&app, "bye@example.com").await;

    for _ in 0..2 {
        let (status, body) = send(
            &app.api,
            json_request(
                "POST",
                "/auth/logout",
                None,
                json!({ "refreshToken": session.refresh_token }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Logged out successfully");
    }

    let (status, _) = send(
        &app.api,
        json_request(
            "POST",
            "/auth/refresh-token",
            None,
            json!({ "refreshToken": session.refresh_token }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_profile_requires_bearer_token() {
    let app = spawn_app().await;

    let (status, body) = send(&app.api, get_request("/auth/profile", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "No authorization token");

    let (status, body) = send(&app.api, get_request("/auth/profile", Some("garbage"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid token");
}

#[tokio::test]
async fn test_profile_and_verify() {
    let app = spawn_app().await;
    let session = register_and_login(&app, "me@example.com").await;

    for path in ["/auth/profile", "/auth/verify"] {
        let (status, body) = send(&app.api, get_request(path, Some(&session.access_token))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], session.user_id);
        assert_eq!(body["email"], "me@example.com");
        assert!(body["createdAt"].is_i64());
        assert!(body.get("passwordHash").is_none());
    }
}

#[tokio::test]
async fn test_update_profile_changes_email_and_password() {
    let app = spawn_app().await;
    let session = register_and_login(&app, "old@example.com").await;

    let (status, body) = send(
        &app.api,
        json_request(
            "PUT",
            "/auth/profile",
            Some(&session.access_token),
            json!({
                "email": "New@Example.com",
                "currentPassword": PASSWORD,
                "newPassword": "brandnew42"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["email"], "new@example.com");

    let (status, _) = send(
        &app.api,
        json_request(
            "POST",
            "/auth/login",
            None,
            json!({ "email": "new@example.com", "password": "brandnew42" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app.api,
        json_request(
            "PUT",
            "/auth/profile",
            Some(&session.access_token),
            json!({ "currentPassword": "nottheone1", "newPassword": "another42" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Current password is incorrect");
}

#[tokio::test]
async fn test_unknown_path_and_health() {
    let app = spawn_app().await;

    let (status, body) = send(&app.api, get_request("/nope/here", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Not Found - /nope/here");

    let (status, body) = send(&app.api, get_request("/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "OK");
}
