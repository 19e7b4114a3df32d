//! Shared helpers for driving the router in-process

#![allow(dead_code)]

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use challan_gateway::api;
use challan_gateway::config::Config;
use challan_gateway::db::Database;
use challan_gateway::llm::ScriptedModel;
use challan_gateway::mail::MemoryMailer;
use challan_gateway::state::AppState;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

pub const BOUNDARY: &str = "challan-test-boundary";

/// A router over an in-memory database with captured mail and a scripted model
pub struct TestApp {
    pub router: Router,
    pub mailer: MemoryMailer,
    pub model: ScriptedModel,
    pub db: Database,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_parts(MemoryMailer::new(), ScriptedModel::default()).await
    }

    pub async fn with_parts(mailer: MemoryMailer, model: ScriptedModel) -> Self {
        let mut config = Config::from_env();
        config.auth.jwt_secret = "integration-secret".to_string();
        config.upload.csv_skip_rows = 0;

        let db = Database::in_memory().await.unwrap();
        let state = AppState::new(
            config,
            &db,
            Arc::new(mailer.clone()),
            Arc::new(model.clone()),
        )
        .unwrap();

        Self {
            router: api::router(state),
            mailer,
            model,
            db,
        }
    }

    /// Send a request and decode the JSON envelope
    pub async fn call(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    /// Request an OTP, read it from the outbox and exchange it for a token
    pub async fn login(&self, email: &str) -> String {
        let (status, _) = self
            .call(json_request("POST", "/api/auth/request-otp", None, &serde_json::json!({"email": email})))
            .await;
        assert_eq!(status, StatusCode::OK);

        let otp = self.last_code(email);
        let (status, body) = self
            .call(json_request(
                "POST",
                "/api/auth/verify-otp",
                None,
                &serde_json::json!({"email": email, "otp": otp}),
            ))
            .await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        body["data"]["token"].as_str().unwrap().to_string()
    }

    /// Six digit code from the latest mail sent to `email`
    pub fn last_code(&self, email: &str) -> String {
        let mail = self.mailer.last_to(email).expect("mail sent");
        let re = regex::Regex::new(r"\b(\d{6})\b").unwrap();
        re.captures(&mail.text_body).unwrap()[1].to_string()
    }
}

pub fn json_request(method: &str, uri: &str, token: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn empty_request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

pub fn upload_request(token: &str, filename: &str, content: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/agent/upload-excel")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}
