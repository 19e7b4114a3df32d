//! Integration tests for the sign-in and profile endpoints
//!
//! Drives the full router in-process: OTP request and verification, MPIN
//! generation and login, profile reads and updates, and bearer checks.

mod common;

use axum::http::StatusCode;
use challan_gateway::llm::ScriptedModel;
use challan_gateway::mail::MemoryMailer;
use common::{empty_request, json_request, TestApp};
use serde_json::json;

#[tokio::test]
async fn test_health_and_banner() {
    let app = TestApp::new().await;

    let (status, body) = app.call(empty_request("GET", "/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], true);
    assert_eq!(body["message"], "API is healthy");

    let (status, body) = app.call(empty_request("GET", "/", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], true);
    assert_eq!(body["message"], "Indore Smart City Development API");
    assert_eq!(body["data"]["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["data"]["docs"], "/docs");
}

#[tokio::test]
async fn test_otp_login_flow() {
    let app = TestApp::new().await;

    let (status, body) = app
        .call(json_request(
            "POST",
            "/api/auth/request-otp",
            None,
            &json!({"email": "Officer@Example.com"}),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "OTP has been sent to your email address");
    assert!(body["data"].is_null());

    let otp = app.last_code("officer@example.com");
    let (status, body) = app
        .call(json_request(
            "POST",
            "/api/auth/verify-otp",
            None,
            &json!({"email": "officer@example.com", "otp": otp}),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "OTP verified successfully");
    assert_eq!(body["data"]["email"], "officer@example.com");
    let token = body["data"]["token"].as_str().unwrap().to_string();

    // Single use
    let (status, body) = app
        .call(json_request(
            "POST",
            "/api/auth/verify-otp",
            None,
            &json!({"email": "officer@example.com", "otp": otp}),
        ))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "No OTP found. Please request a new OTP.");

    let (status, body) = app
        .call(empty_request("GET", "/api/auth/profile", Some(&token)))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Profile retrieved successfully");
    assert_eq!(body["data"]["email"], "officer@example.com");
    assert!(body["data"]["created_at"].is_string());
}

#[tokio::test]
async fn test_otp_failures() {
    let app = TestApp::new().await;

    let (status, body) = app
        .call(json_request(
            "POST",
            "/api/auth/request-otp",
            None,
            &json!({"email": "not-an-email"}),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], false);

    let (status, body) = app
        .call(json_request(
            "POST",
            "/api/auth/verify-otp",
            None,
            &json!({"email": "nobody@example.com", "otp": "123456"}),
        ))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "User not found. Please request OTP first.");

    app.call(json_request(
        "POST",
        "/api/auth/request-otp",
        None,
        &json!({"email": "a@example.com"}),
    ))
    .await;
    let otp = app.last_code("a@example.com");
    let wrong = if otp == "000000" { "111111" } else { "000000" };

    let (status, body) = app
        .call(json_request(
            "POST",
            "/api/auth/verify-otp",
            None,
            &json!({"email": "a@example.com", "otp": wrong}),
        ))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid OTP. Please try again.");

    let (status, body) = app
        .call(json_request(
            "POST",
            "/api/auth/verify-otp",
            None,
            &json!({"email": "a@example.com", "otp": "12345"}),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "OTP must be exactly 6 characters");
}

#[tokio::test]
async fn test_mail_failure_is_reported() {
    let app = TestApp::with_parts(MemoryMailer::rejecting(), ScriptedModel::default()).await;
    let (status, body) = app
        .call(json_request(
            "POST",
            "/api/auth/request-otp",
            None,
            &json!({"email": "a@example.com"}),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["message"], "Failed to send OTP email. Please try again.");
}

#[tokio::test]
async fn test_mpin_flow() {
    let app = TestApp::new().await;
    let token = app.login("a@example.com").await;

    let (status, body) = app
        .call(json_request(
            "POST",
            "/api/auth/login-mpin",
            None,
            &json!({"email": "a@example.com", "mpin": "121212"}),
        ))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        body["message"],
        "MPIN not set. Please use OTP login or set your MPIN first."
    );

    let (status, body) = app
        .call(empty_request("POST", "/api/auth/set-mpin", Some(&token)))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "MPIN generated and sent to your email.");

    let mpin = app.last_code("a@example.com");
    let bytes = mpin.as_bytes();
    assert_eq!(bytes[0] + 1, bytes[1]);
    assert_eq!(&mpin[0..2], &mpin[2..4]);
    assert_eq!(&mpin[0..2], &mpin[4..6]);

    let (status, body) = app
        .call(json_request(
            "POST",
            "/api/auth/login-mpin",
            None,
            &json!({"email": "a@example.com", "mpin": mpin}),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Login successful");
    assert!(body["data"]["token"].is_string());

    let (status, body) = app
        .call(json_request(
            "POST",
            "/api/auth/login-mpin",
            None,
            &json!({"email": "b@example.com", "mpin": mpin}),
        ))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "User not found. Please sign up first.");
}

#[tokio::test]
async fn test_profile_update_changes_only_given_fields() {
    let app = TestApp::new().await;
    let token = app.login("a@example.com").await;

    let (status, body) = app
        .call(json_request(
            "PUT",
            "/api/auth/profile",
            Some(&token),
            &json!({"name": "Asha", "department": "Traffic"}),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Profile updated successfully");
    assert_eq!(body["data"]["name"], "Asha");

    let (_, body) = app
        .call(json_request(
            "PUT",
            "/api/auth/profile",
            Some(&token),
            &json!({"designation": "Inspector"}),
        ))
        .await;
    assert_eq!(body["data"]["name"], "Asha");
    assert_eq!(body["data"]["department"], "Traffic");
    assert_eq!(body["data"]["designation"], "Inspector");
}

#[tokio::test]
async fn test_bearer_checks() {
    let app = TestApp::new().await;
    let token = app.login("a@example.com").await;

    for header in [None, Some("garbage"), Some("not.a.jwt")] {
        let (status, body) = app
            .call(empty_request("GET", "/api/auth/profile", header))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Unauthorized");
    }

    // Scheme is case-insensitive
    let request = axum::http::Request::builder()
        .uri("/api/auth/profile")
        .header("authorization", format!("bearer {}", token))
        .body(axum::body::Body::empty())
        .unwrap();
    let (status, _) = app.call(request).await;
    assert_eq!(status, StatusCode::OK);

    let request = axum::http::Request::builder()
        .uri("/api/auth/profile")
        .header("authorization", format!("Token {}", token))
        .body(axum::body::Body::empty())
        .unwrap();
    let (status, _) = app.call(request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
