//! Bearer token issuing and verification

use crate::config::AuthConfig;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while issuing or checking tokens
#[derive(Error, Debug)]
pub enum TokenError {
    /// Configured algorithm is unknown or not HMAC based
    #[error("Unsupported token algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Authorization header is not `Bearer <token>`
    #[error("Unauthorized")]
    MalformedHeader,

    /// Signature, expiry or structure check failed
    #[error("Unauthorized")]
    Invalid(#[source] jsonwebtoken::errors::Error),

    /// Token verified but carries no user id
    #[error("Unauthorized")]
    MissingSubject,

    /// Token could not be signed
    #[error("Failed to issue token: {0}")]
    Encode(#[source] jsonwebtoken::errors::Error),
}

/// Claims carried by every issued token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Authenticated user id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Expiry (seconds since epoch)
    pub exp: i64,
    /// Issued-at (seconds since epoch)
    pub iat: i64,
}

/// Signs and verifies HMAC tokens
#[derive(Clone)]
pub struct TokenService {
    algorithm: Algorithm,
    encoding: EncodingKey,
    decoding: DecodingKey,
    lifetime: Duration,
}

impl TokenService {
    /// Build a token service from auth configuration
    pub fn new(config: &AuthConfig) -> Result<Self, TokenError> {
        let algorithm = Algorithm::from_str(config.jwt_algorithm.trim())
            .map_err(|_| TokenError::UnsupportedAlgorithm(config.jwt_algorithm.clone()))?;
        if !matches!(
            algorithm,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        ) {
            return Err(TokenError::UnsupportedAlgorithm(
                config.jwt_algorithm.clone(),
            ));
        }

        Ok(Self {
            algorithm,
            encoding: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            lifetime: Duration::days(config.jwt_expiration_days),
        })
    }

    /// Issue a token for the given user
    pub fn issue(&self, user_id: &str) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = Claims {
            user_id: Some(user_id.to_string()),
            exp: (now + self.lifetime).timestamp(),
            iat: now.timestamp(),
        };
        encode(&Header::new(self.algorithm), &claims, &self.encoding).map_err(TokenError::Encode)
    }

    /// Verify a raw token and return its claims
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let validation = Validation::new(self.algorithm);
        let data =
            decode::<Claims>(token, &self.decoding, &validation).map_err(TokenError::Invalid)?;
        Ok(data.claims)
    }

    /// Resolve the user id from an `Authorization` header value
    pub fn user_id_from_header(&self, header: &str) -> Result<String, TokenError> {
        let token = parse_bearer(header).ok_or(TokenError::MalformedHeader)?;
        self.verify(token)?
            .user_id
            .filter(|id| !id.is_empty())
            .ok_or(TokenError::MissingSubject)
    }
}

/// Split `<scheme> <token>` and return the token when the scheme is bearer
pub fn parse_bearer(header: &str) -> Option<&str> {
    let (scheme, token) = header.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return None;
    }
    Some(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(days: i64) -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret".to_string(),
            jwt_algorithm: "HS256".to_string(),
            jwt_expiration_days: days,
            otp_expiration_minutes: 5,
        }
    }

    #[test]
    fn test_issue_and_verify() {
        let tokens = TokenService::new(&config(180)).unwrap();
        let token = tokens.issue("user-1").unwrap();
        let claims = tokens.verify(&token).unwrap();
        assert_eq!(claims.user_id.as_deref(), Some("user-1"));
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_expired_token_rejected() {
        let tokens = TokenService::new(&config(-1)).unwrap();
        let token = tokens.issue("user-1").unwrap();
        assert!(matches!(tokens.verify(&token), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let tokens = TokenService::new(&config(1)).unwrap();
        let token = tokens.issue("user-1").unwrap();

        let mut other = config(1);
        other.jwt_secret = "another-secret".to_string();
        let other = TokenService::new(&other).unwrap();
        assert!(other.verify(&token).is_err());
    }

    #[test]
    fn test_header_parsing() {
        let tokens = TokenService::new(&config(1)).unwrap();
        let token = tokens.issue("abc").unwrap();

        assert_eq!(
            tokens.user_id_from_header(&format!("Bearer {}", token)).unwrap(),
            "abc"
        );
        assert_eq!(
            tokens.user_id_from_header(&format!("bearer {}", token)).unwrap(),
            "abc"
        );
        assert!(matches!(
            tokens.user_id_from_header(&format!("Basic {}", token)),
            Err(TokenError::MalformedHeader)
        ));
        assert!(matches!(
            tokens.user_id_from_header(&token),
            Err(TokenError::MalformedHeader)
        ));
    }

    #[test]
    fn test_token_without_user_rejected() {
        let tokens = TokenService::new(&config(1)).unwrap();
        let now = Utc::now().timestamp();
        let claims = Claims {
            user_id: None,
            exp: now + 3600,
            iat: now,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        assert!(matches!(
            tokens.user_id_from_header(&format!("Bearer {}", token)),
            Err(TokenError::MissingSubject)
        ));
    }

    #[test]
    fn test_rejects_asymmetric_algorithm() {
        let mut cfg = config(1);
        cfg.jwt_algorithm = "RS256".to_string();
        assert!(matches!(
            TokenService::new(&cfg),
            Err(TokenError::UnsupportedAlgorithm(_))
        ));
    }
}
