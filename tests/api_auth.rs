mod common;

use anyhow::Result;
use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use chrono::Duration;
use common::TestApp;
use serde_json::json;
use tower::ServiceExt;

#[tokio::test]
async fn ana_registers_logs_in_and_keeps_both_sessions() -> Result<()> {
    let app = TestApp::new();

    let (status, registered) = app
        .post(
            "/api/auth/register",
            None,
            &json!({"name": "Ana", "email": "ana@example.com", "password": "s3cret"}),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    let first = registered["token"].as_str().unwrap_or_default().to_string();
    assert!(!first.is_empty());
    assert!(registered["user"]["id"].as_str().is_some_and(|id| !id.is_empty()));
    assert_eq!(registered["user"]["name"], "Ana");
    assert_eq!(registered["user"]["email"], "ana@example.com");
    for hidden in ["password_hash", "password_salt", "password_scheme", "_id"] {
        assert!(registered["user"].get(hidden).is_none(), "{hidden} leaked");
    }

    let (status, body) = app
        .post(
            "/api/auth/login",
            None,
            &json!({"email": "ana@example.com", "password": "wrong"}),
        )
        .await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.get("token").is_none());

    let (status, logged_in) = app
        .post(
            "/api/auth/login",
            None,
            &json!({"email": "ana@example.com", "password": "s3cret"}),
        )
        .await?;
    assert_eq!(status, StatusCode::OK);
    let second = logged_in["token"].as_str().unwrap_or_default().to_string();
    assert_ne!(first, second);
    assert_eq!(logged_in["user"], registered["user"]);

    for token in [&first, &second] {
        let (status, me) = app.get("/api/auth/me", Some(token)).await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me, registered["user"]);
    }
    Ok(())
}

#[tokio::test]
async fn duplicate_registration_is_bad_request() -> Result<()> {
    let app = TestApp::new();
    app.register("Ana", "ana@example.com", "s3cret").await?;

    let (status, body) = app
        .post(
            "/api/auth/register",
            None,
            &json!({"name": "Other", "email": "ana@example.com", "password": "x"}),
        )
        .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "email already registered");
    assert_eq!(app.store.count("user").await, 1);
    Ok(())
}

#[tokio::test]
async fn unknown_email_and_wrong_password_look_the_same() -> Result<()> {
    let app = TestApp::new();
    app.register("Ana", "ana@example.com", "s3cret").await?;

    let unknown = app
        .post(
            "/api/auth/login",
            None,
            &json!({"email": "nobody@example.com", "password": "s3cret"}),
        )
        .await?;
    let wrong = app
        .post(
            "/api/auth/login",
            None,
            &json!({"email": "ana@example.com", "password": "nope"}),
        )
        .await?;
    assert_eq!(unknown.0, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown, wrong);
    Ok(())
}

#[tokio::test]
async fn invalid_register_input_is_bad_request() -> Result<()> {
    let app = TestApp::new();
    for body in [
        json!({"name": "", "email": "ana@example.com", "password": "s3cret"}),
        json!({"name": "Ana", "email": "ana", "password": "s3cret"}),
        json!({"name": "Ana", "email": "ana@example.com", "password": ""}),
        json!({"name": "Ana", "email": "ana@example.com"}),
    ] {
        let (status, _) = app.post("/api/auth/register", None, &body).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    }
    Ok(())
}

#[tokio::test]
async fn every_auth_failure_is_the_same_401() -> Result<()> {
    let app = TestApp::new();
    let token = app.register("Ana", "ana@example.com", "s3cret").await?;

    let mut responses = Vec::new();
    for authorization in [
        None,
        Some("Token abc".to_string()),
        Some("Bearer ".to_string()),
        Some("Bearer".to_string()),
        Some("Bearer not-a-real-token".to_string()),
    ] {
        let mut builder = Request::builder().uri("/api/auth/me");
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        responses.push(app.send(builder.body(Body::empty())?).await?);
    }

    app.clock.advance(Duration::days(7));
    responses.push(app.get("/api/auth/me", Some(&token)).await?);

    for response in &responses {
        assert_eq!(response.0, StatusCode::UNAUTHORIZED);
        assert_eq!(response, &responses[0]);
    }
    Ok(())
}

#[tokio::test]
async fn token_scheme_is_case_insensitive() -> Result<()> {
    let app = TestApp::new();
    let token = app.register("Ana", "ana@example.com", "s3cret").await?;

    let request = Request::builder()
        .uri("/api/auth/me")
        .header(header::AUTHORIZATION, format!("bearer {token}"))
        .body(Body::empty())?;
    let (status, me) = app.send(request).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "ana@example.com");
    Ok(())
}

#[tokio::test]
async fn responses_carry_a_request_id() -> Result<()> {
    let app = TestApp::new();

    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/").body(Body::empty())?)
        .await?;
    assert!(response.headers().contains_key("x-request-id"));

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/")
                .header("x-request-id", "req-42")
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(
        response
            .headers()
            .get("x-request-id")
            .and_then(|value| value.to_str().ok()),
        Some("req-42")
    );
    Ok(())
}

#[tokio::test]
async fn malformed_json_is_bad_request() -> Result<()> {
    let app = TestApp::new();
    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))?;
    let (status, body) = app.send(request).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].is_string());
    Ok(())
}
