//! Typed HTTP client for the gateway API
//!
//! Injects the bearer token when one is held, unwraps the
//! `{status, message, data}` envelope and normalizes failures into
//! [`ClientError`]. The token is captured on a successful OTP or MPIN login.

mod error;

pub use error::ClientError;

use crate::api::auth::{MpinLoginRequest, ProfileUpdateRequest, RequestOtpRequest, VerifyOtpRequest};
use crate::query::{QueryRequest, QueryResponse};
use crate::services::auth::{LoginData, ProfileData, ProfileUpdateData};
use crate::services::uploads::{DeletedFile, FileList, UploadData};
use reqwest::{multipart, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Default timeout; queries wait on two model round trips
const REQUEST_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Deserialize)]
struct Envelope {
    status: bool,
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: Value,
}

/// A successful reply: the envelope message plus its payload
#[derive(Debug, Clone)]
pub struct Reply<T> {
    /// Server message
    pub message: String,
    /// Decoded `data`
    pub data: T,
}

/// Gateway API client
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    token: Option<String>,
    http: reqwest::Client,
}

impl ApiClient {
    /// Client for the gateway at `base_url`
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| ClientError::Network(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
            http,
        })
    }

    /// Start with a previously stored token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Currently held token
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Forget the token
    pub fn clear_token(&mut self) {
        self.token = None;
    }

    /// Ask for an OTP to be mailed
    pub async fn request_otp(&mut self, email: &str) -> Result<String, ClientError> {
        let body = RequestOtpRequest {
            email: email.to_string(),
        };
        let reply: Reply<Value> = self
            .send(self.request(Method::POST, "/api/auth/request-otp").json(&body))
            .await?;
        Ok(reply.message)
    }

    /// Sign in with an OTP; the token is kept on success
    pub async fn verify_otp(&mut self, email: &str, otp: &str) -> Result<LoginData, ClientError> {
        let body = VerifyOtpRequest {
            email: email.to_string(),
            otp: otp.to_string(),
        };
        let reply: Reply<LoginData> = self
            .send(self.request(Method::POST, "/api/auth/verify-otp").json(&body))
            .await?;
        self.token = Some(reply.data.token.clone());
        Ok(reply.data)
    }

    /// Sign in with an MPIN; the token is kept on success
    pub async fn login_mpin(&mut self, email: &str, mpin: &str) -> Result<LoginData, ClientError> {
        let body = MpinLoginRequest {
            email: email.to_string(),
            mpin: mpin.to_string(),
        };
        let reply: Reply<LoginData> = self
            .send(self.request(Method::POST, "/api/auth/login-mpin").json(&body))
            .await?;
        self.token = Some(reply.data.token.clone());
        Ok(reply.data)
    }

    /// Signed-in user's profile
    pub async fn profile(&mut self) -> Result<ProfileData, ClientError> {
        let reply = self
            .send(self.request(Method::GET, "/api/auth/profile"))
            .await?;
        Ok(reply.data)
    }

    /// Change profile fields; `None` leaves a field as it is
    pub async fn update_profile(
        &mut self,
        update: &ProfileUpdateRequest,
    ) -> Result<ProfileUpdateData, ClientError> {
        let reply = self
            .send(self.request(Method::PUT, "/api/auth/profile").json(update))
            .await?;
        Ok(reply.data)
    }

    /// Generate a new MPIN, delivered by mail
    pub async fn set_mpin(&mut self) -> Result<String, ClientError> {
        let reply: Reply<Value> = self
            .send(self.request(Method::POST, "/api/auth/set-mpin"))
            .await?;
        Ok(reply.message)
    }

    /// Upload a spreadsheet
    pub async fn upload(
        &mut self,
        filename: &str,
        content: Vec<u8>,
    ) -> Result<Reply<UploadData>, ClientError> {
        let part = multipart::Part::bytes(content).file_name(filename.to_string());
        let form = multipart::Form::new().part("file", part);
        self.send(
            self.request(Method::POST, "/api/agent/upload-excel")
                .multipart(form),
        )
        .await
    }

    /// Uploaded files, newest first
    pub async fn list_files(&mut self) -> Result<FileList, ClientError> {
        let reply = self
            .send(self.request(Method::GET, "/api/agent/files"))
            .await?;
        Ok(reply.data)
    }

    /// Delete an upload and its table
    pub async fn delete_file(&mut self, file_id: &str) -> Result<Reply<DeletedFile>, ClientError> {
        self.send(self.request(Method::DELETE, &format!("/api/agent/files/{}", file_id)))
            .await
    }

    /// Ask a question about uploaded data
    pub async fn query(&mut self, request: &QueryRequest) -> Result<QueryResponse, ClientError> {
        let reply = self
            .send(self.request(Method::POST, "/api/agent/query").json(request))
            .await?;
        Ok(reply.data)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .http
            .request(method, format!("{}{}", self.base_url, path));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(
        &mut self,
        builder: RequestBuilder,
    ) -> Result<Reply<T>, ClientError> {
        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;
        debug!(status = status.as_u16(), "Gateway responded");

        let envelope = serde_json::from_str::<Envelope>(&text).ok();

        if status == StatusCode::UNAUTHORIZED && self.token.is_some() {
            self.token = None;
            return Err(ClientError::Unauthorized);
        }

        let envelope = match envelope {
            Some(envelope) if status.is_success() && envelope.status => envelope,
            Some(envelope) => {
                return Err(ClientError::Api {
                    status: status.as_u16(),
                    message: envelope.message,
                })
            }
            None if status.is_success() => {
                return Err(ClientError::Decode(format!(
                    "response is not an API envelope: {}",
                    snippet(&text)
                )))
            }
            None => {
                return Err(ClientError::Api {
                    status: status.as_u16(),
                    message: snippet(&text),
                })
            }
        };

        let data = serde_json::from_value(envelope.data)
            .map_err(|e| ClientError::Decode(e.to_string()))?;
        Ok(Reply {
            message: envelope.message,
            data,
        })
    }
}

fn snippet(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        "empty response body".to_string()
    } else {
        trimmed.chars().take(200).collect()
    }
}

/// Token persisted between CLI invocations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSession {
    /// Bearer token
    pub token: String,
    /// Email the token was issued for
    pub email: Option<String>,
}
