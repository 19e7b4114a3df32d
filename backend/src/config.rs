//! Application configuration
//!
//! Centralized configuration management with environment variable support
//! and sensible defaults. A `.env` file in the working directory is loaded
//! first when present.

use std::env;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server configuration
    pub server: ServerConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Token and one-time code configuration
    pub auth: AuthConfig,
    /// Outgoing mail configuration
    pub mail: MailConfig,
    /// Language model configuration
    pub llm: LlmConfig,
    /// File upload configuration
    pub upload: UploadConfig,
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind the server to
    pub port: u16,
    /// Host address to bind to
    pub host: String,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// SQLite connection string or file path
    pub url: String,
}

/// Token and one-time code configuration
#[derive(Clone)]
pub struct AuthConfig {
    /// HMAC secret used to sign tokens
    pub jwt_secret: String,
    /// Signing algorithm name (HS256, HS384 or HS512)
    pub jwt_algorithm: String,
    /// Token lifetime in days
    pub jwt_expiration_days: i64,
    /// OTP lifetime in minutes
    pub otp_expiration_minutes: i64,
}

// Keeps the secret out of the startup log line.
impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("jwt_algorithm", &self.jwt_algorithm)
            .field("jwt_expiration_days", &self.jwt_expiration_days)
            .field("otp_expiration_minutes", &self.otp_expiration_minutes)
            .finish()
    }
}

/// Outgoing mail configuration
#[derive(Clone)]
pub struct MailConfig {
    /// SMTP username; empty means console delivery
    pub username: String,
    /// SMTP password; empty means console delivery
    pub password: String,
    /// Sender address
    pub from: String,
    /// Sender display name
    pub from_name: String,
    /// SMTP server host
    pub server: String,
    /// SMTP server port
    pub port: u16,
    /// Upgrade the connection with STARTTLS
    pub starttls: bool,
    /// Use implicit TLS
    pub ssl_tls: bool,
    /// Authenticate with username/password
    pub use_credentials: bool,
}

impl std::fmt::Debug for MailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("from", &self.from)
            .field("from_name", &self.from_name)
            .field("server", &self.server)
            .field("port", &self.port)
            .field("starttls", &self.starttls)
            .field("ssl_tls", &self.ssl_tls)
            .field("use_credentials", &self.use_credentials)
            .finish()
    }
}

impl MailConfig {
    /// Whether SMTP credentials are present
    pub fn is_configured(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

/// Language model configuration
#[derive(Clone)]
pub struct LlmConfig {
    /// Gemini API key, if configured
    pub api_key: Option<String>,
    /// Models to try, in order
    pub models: Vec<String>,
    /// Gemini API base URL
    pub api_base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("models", &self.models)
            .field("api_base_url", &self.api_base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            models: DEFAULT_GEMINI_MODELS.iter().map(|m| m.to_string()).collect(),
            api_base_url: DEFAULT_GEMINI_API_BASE_URL.to_string(),
            timeout_secs: 30,
        }
    }
}

/// File upload configuration
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Maximum accepted request body for uploads
    pub max_upload_bytes: usize,
    /// Preamble lines skipped before the CSV header
    pub csv_skip_rows: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: 20 * 1024 * 1024,
            csv_skip_rows: 7,
        }
    }
}

/// Models tried in order when none are configured
pub const DEFAULT_GEMINI_MODELS: &[&str] = &[
    "gemini-2.5-flash",
    "gemini-flash-latest",
    "gemini-2.0-flash",
    "gemini-pro-latest",
];

/// Public Gemini REST endpoint
pub const DEFAULT_GEMINI_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        let mail_username = env::var("MAIL_USERNAME").unwrap_or_default();
        Self {
            server: ServerConfig {
                port: parse_var("PORT", 8000),
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "sqlite:data/challan.db".to_string()),
            },
            auth: AuthConfig {
                jwt_secret: env::var("JWT_SECRET")
                    .unwrap_or_else(|_| "dev_secret_key_change_in_production".to_string()),
                jwt_algorithm: env::var("JWT_ALGORITHM").unwrap_or_else(|_| "HS256".to_string()),
                jwt_expiration_days: parse_var("JWT_EXPIRATION_DAYS", 180),
                otp_expiration_minutes: parse_var("OTP_EXPIRATION_MINUTES", 5),
            },
            mail: MailConfig {
                from: env::var("MAIL_FROM").unwrap_or_else(|_| mail_username.clone()),
                username: mail_username,
                password: env::var("MAIL_PASSWORD").unwrap_or_default(),
                from_name: env::var("MAIL_FROM_NAME")
                    .unwrap_or_else(|_| "Indore Smart City".to_string()),
                server: env::var("MAIL_SERVER").unwrap_or_else(|_| "smtp.gmail.com".to_string()),
                port: parse_var("MAIL_PORT", 587),
                starttls: parse_flag("MAIL_STARTTLS", true),
                ssl_tls: parse_flag("MAIL_SSL_TLS", false),
                use_credentials: parse_flag("MAIL_USE_CREDENTIALS", true),
            },
            llm: LlmConfig {
                api_key: env::var("GEMINI_KEY").ok().and_then(|k| clean_api_key(&k)),
                models: env::var("GEMINI_MODELS")
                    .ok()
                    .map(|m| parse_model_list(&m))
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| LlmConfig::default().models),
                api_base_url: env::var("GEMINI_API_BASE_URL")
                    .unwrap_or_else(|_| DEFAULT_GEMINI_API_BASE_URL.to_string()),
                timeout_secs: parse_var("GEMINI_TIMEOUT_SECS", 30),
            },
            upload: UploadConfig {
                max_upload_bytes: parse_var("MAX_UPLOAD_BYTES", 20 * 1024 * 1024),
                csv_skip_rows: parse_var("CSV_SKIP_ROWS", 7),
            },
        }
    }

    /// Get the server address as a string
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn parse_flag(name: &str, default: bool) -> bool {
    env::var(name)
        .map(|v| v.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}

/// Trim an API key and strip surrounding quotes; empty keys count as unset
pub fn clean_api_key(raw: &str) -> Option<String> {
    let key = raw.trim().trim_matches('"').trim_matches('\'').trim();
    if key.is_empty() {
        None
    } else {
        Some(key.to_string())
    }
}

/// Split a comma-separated model list
pub fn parse_model_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .collect()
}
