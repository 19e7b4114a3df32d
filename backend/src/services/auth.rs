//! Authentication service
//!
//! OTP sign-in, MPIN sign-in and profile management.

use crate::auth::{self, TokenService};
use crate::config::AuthConfig;
use crate::db::{users, ProfileUpdate, User};
use crate::error::AppError;
use crate::mail::{self, Mailer};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{info, warn};

/// Token plus the signed-in user's details
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginData {
    /// Signed session token
    pub token: String,
    /// Signed-in user
    pub user_id: String,
    /// Account email
    pub email: Option<String>,
    /// Display name
    pub name: Option<String>,
    /// Department
    pub department: Option<String>,
    /// Designation
    pub designation: Option<String>,
}

/// Profile as shown to its owner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileData {
    /// User id
    pub id: String,
    /// Account email
    pub email: Option<String>,
    /// Display name
    pub name: Option<String>,
    /// Department
    pub department: Option<String>,
    /// Designation
    pub designation: Option<String>,
    /// ISO-8601 creation time
    pub created_at: Option<String>,
}

/// Editable profile fields after an update
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileUpdateData {
    /// User id
    pub id: String,
    /// Display name
    pub name: Option<String>,
    /// Department
    pub department: Option<String>,
    /// Designation
    pub designation: Option<String>,
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    pool: SqlitePool,
    tokens: TokenService,
    mailer: Arc<dyn Mailer>,
    otp_lifetime: Duration,
    sender_name: String,
}

impl AuthService {
    /// Create the service
    ///
    /// # Arguments
    /// * `pool` - database pool holding the users table
    /// * `config` - token and OTP settings
    /// * `mailer` - delivery for OTP and MPIN mails
    /// * `sender_name` - signature used in outgoing mail
    pub fn new(
        pool: SqlitePool,
        config: &AuthConfig,
        mailer: Arc<dyn Mailer>,
        sender_name: impl Into<String>,
    ) -> Result<Self, AppError> {
        Ok(Self {
            pool,
            tokens: TokenService::new(config)?,
            mailer,
            otp_lifetime: Duration::minutes(config.otp_expiration_minutes),
            sender_name: sender_name.into(),
        })
    }

    /// Token verifier shared with the request extractor
    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Issue a fresh OTP and mail it
    pub async fn request_otp(&self, email: &str) -> Result<(), AppError> {
        let email = validated_email(email)?;
        let otp = auth::generate_otp();
        users::upsert_otp(&self.pool, &email, &otp, Utc::now()).await?;

        let message = mail::otp_mail(
            &email,
            &otp,
            &self.sender_name,
            self.otp_lifetime.num_minutes(),
        );
        if let Err(e) = self.mailer.send(message).await {
            warn!(error = %e, "Failed to send OTP email");
            return Err(AppError::Mail(
                "Failed to send OTP email. Please try again.".to_string(),
            ));
        }

        info!("OTP issued");
        Ok(())
    }

    /// Check an OTP and sign the user in
    ///
    /// The OTP is consumed on success and cleared once expired.
    pub async fn verify_otp(&self, email: &str, otp: &str) -> Result<LoginData, AppError> {
        let email = validated_email(email)?;
        validated_code(otp, "OTP")?;

        let user = users::find_by_email(&self.pool, &email)
            .await?
            .ok_or_else(|| {
                AppError::InvalidCredentials("User not found. Please request OTP first.".into())
            })?;

        let stored = user.otp.as_deref().ok_or_else(|| {
            AppError::InvalidCredentials("No OTP found. Please request a new OTP.".into())
        })?;
        if stored != otp {
            return Err(AppError::InvalidCredentials(
                "Invalid OTP. Please try again.".into(),
            ));
        }

        if let Some(issued) = user.otp_created_at {
            if Utc::now() > issued + self.otp_lifetime {
                users::clear_otp(&self.pool, &user.id).await?;
                return Err(AppError::InvalidCredentials(
                    "OTP has expired. Please request a new OTP.".into(),
                ));
            }
        }

        users::clear_otp(&self.pool, &user.id).await?;
        self.login_data(user)
    }

    /// Sign in with email and MPIN
    pub async fn login_mpin(&self, email: &str, mpin: &str) -> Result<LoginData, AppError> {
        let email = validated_email(email)?;
        validated_code(mpin, "MPIN")?;

        let user = users::find_by_email(&self.pool, &email)
            .await?
            .ok_or_else(|| {
                AppError::InvalidCredentials("User not found. Please sign up first.".into())
            })?;

        let stored = user.mpin.as_deref().ok_or_else(|| {
            AppError::InvalidCredentials(
                "MPIN not set. Please use OTP login or set your MPIN first.".into(),
            )
        })?;
        if stored != mpin {
            return Err(AppError::InvalidCredentials(
                "Invalid MPIN. Please try again.".into(),
            ));
        }

        self.login_data(user)
    }

    /// Generate a new MPIN and mail it
    pub async fn set_mpin(&self, user_id: &str) -> Result<(), AppError> {
        let user = self.require_user(user_id).await?;
        let mpin = auth::generate_patterned_mpin();
        users::set_mpin(&self.pool, &user.id, &mpin, Utc::now()).await?;

        let to = user.email.unwrap_or_default();
        if let Err(e) = self
            .mailer
            .send(mail::mpin_mail(&to, &mpin, &self.sender_name))
            .await
        {
            warn!(user_id = %user.id, error = %e, "Failed to send MPIN email");
            return Err(AppError::Mail("MPIN set but failed to send email.".into()));
        }
        Ok(())
    }

    /// Current user's profile
    pub async fn get_profile(&self, user_id: &str) -> Result<ProfileData, AppError> {
        let user = self.require_user(user_id).await?;
        Ok(ProfileData {
            id: user.id,
            email: user.email,
            name: user.name,
            department: user.department,
            designation: user.designation,
            created_at: Some(user.created_at.to_rfc3339()),
        })
    }

    /// Change the supplied profile fields
    pub async fn update_profile(
        &self,
        user_id: &str,
        update: ProfileUpdate,
    ) -> Result<ProfileUpdateData, AppError> {
        let user = users::update_profile(&self.pool, user_id, &update, Utc::now())
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".into()))?;

        Ok(ProfileUpdateData {
            id: user.id,
            name: user.name,
            department: user.department,
            designation: user.designation,
        })
    }

    async fn require_user(&self, user_id: &str) -> Result<User, AppError> {
        users::find_by_id(&self.pool, user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".into()))
    }

    fn login_data(&self, user: User) -> Result<LoginData, AppError> {
        let token = self.tokens.issue(&user.id)?;
        Ok(LoginData {
            token,
            user_id: user.id,
            email: user.email,
            name: user.name,
            department: user.department,
            designation: user.designation,
        })
    }
}

fn validated_email(email: &str) -> Result<String, AppError> {
    let email = auth::normalize_email(email);
    if auth::is_valid_email(&email) {
        Ok(email)
    } else {
        Err(AppError::Validation("Invalid email address".into()))
    }
}

fn validated_code(code: &str, what: &str) -> Result<(), AppError> {
    if auth::is_valid_code(code) {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "{} must be exactly {} characters",
            what,
            auth::CODE_LENGTH
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::mail::MemoryMailer;

    fn auth_config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret".into(),
            jwt_algorithm: "HS256".into(),
            jwt_expiration_days: 1,
            otp_expiration_minutes: 5,
        }
    }

    async fn service(mailer: MemoryMailer) -> (AuthService, Database) {
        let db = Database::in_memory().await.unwrap();
        let service =
            AuthService::new(db.pool().clone(), &auth_config(), Arc::new(mailer), "Test").unwrap();
        (service, db)
    }

    fn mailed_code(mailer: &MemoryMailer, to: &str) -> String {
        let mail = mailer.last_to(to).unwrap();
        let marker = "<strong>";
        let start = mail.html_body.find(marker).unwrap() + marker.len();
        mail.html_body[start..start + 6].to_string()
    }

    #[tokio::test]
    async fn test_otp_round_trip_is_single_use() {
        let mailer = MemoryMailer::new();
        let (service, _db) = service(mailer.clone()).await;

        service.request_otp("Officer@Example.com").await.unwrap();
        let otp = mailed_code(&mailer, "officer@example.com");

        let login = service.verify_otp("officer@example.com", &otp).await.unwrap();
        assert_eq!(login.email.as_deref(), Some("officer@example.com"));
        assert_eq!(
            service.tokens().verify(&login.token).unwrap().user_id,
            Some(login.user_id.clone())
        );

        let again = service.verify_otp("officer@example.com", &otp).await;
        assert_eq!(
            again.unwrap_err().to_string(),
            "No OTP found. Please request a new OTP."
        );
    }

    #[tokio::test]
    async fn test_verify_failures_in_order() {
        let mailer = MemoryMailer::new();
        let (service, _db) = service(mailer.clone()).await;

        let err = service.verify_otp("nobody@example.com", "123456").await;
        assert_eq!(
            err.unwrap_err().to_string(),
            "User not found. Please request OTP first."
        );

        service.request_otp("a@example.com").await.unwrap();
        let otp = mailed_code(&mailer, "a@example.com");
        let wrong = if otp == "000000" { "111111" } else { "000000" };
        let err = service.verify_otp("a@example.com", wrong).await;
        assert_eq!(err.unwrap_err().to_string(), "Invalid OTP. Please try again.");

        let err = service.verify_otp("a@example.com", "123").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_expired_otp_is_cleared() {
        let (service, db) = service(MemoryMailer::new()).await;
        let issued = Utc::now() - Duration::minutes(6);
        users::upsert_otp(db.pool(), "late@example.com", "654321", issued)
            .await
            .unwrap();

        let err = service.verify_otp("late@example.com", "654321").await;
        assert_eq!(
            err.unwrap_err().to_string(),
            "OTP has expired. Please request a new OTP."
        );

        let user = users::find_by_email(db.pool(), "late@example.com")
            .await
            .unwrap()
            .unwrap();
        assert!(user.otp.is_none());
    }

    #[tokio::test]
    async fn test_mail_failure_reported() {
        let (service, _db) = service(MemoryMailer::rejecting()).await;
        let err = service.request_otp("a@example.com").await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to send OTP email. Please try again.");

        let err = service.request_otp("not-an-email").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_mpin_flow() {
        let mailer = MemoryMailer::new();
        let (service, _db) = service(mailer.clone()).await;

        service.request_otp("a@example.com").await.unwrap();
        let otp = mailed_code(&mailer, "a@example.com");
        let login = service.verify_otp("a@example.com", &otp).await.unwrap();

        let err = service.login_mpin("a@example.com", "010101").await;
        assert_eq!(
            err.unwrap_err().to_string(),
            "MPIN not set. Please use OTP login or set your MPIN first."
        );

        service.set_mpin(&login.user_id).await.unwrap();
        let mpin = mailed_code(&mailer, "a@example.com");
        let mpin_mail = mailer.last_to("a@example.com").unwrap();
        assert_eq!(mpin_mail.subject, "Your MPIN");

        let relogin = service.login_mpin("a@example.com", &mpin).await.unwrap();
        assert_eq!(relogin.user_id, login.user_id);

        let err = service.login_mpin("b@example.com", &mpin).await;
        assert_eq!(
            err.unwrap_err().to_string(),
            "User not found. Please sign up first."
        );
    }

    #[tokio::test]
    async fn test_profile_update_and_fetch() {
        let mailer = MemoryMailer::new();
        let (service, _db) = service(mailer.clone()).await;
        service.request_otp("a@example.com").await.unwrap();
        let otp = mailed_code(&mailer, "a@example.com");
        let login = service.verify_otp("a@example.com", &otp).await.unwrap();

        let updated = service
            .update_profile(
                &login.user_id,
                ProfileUpdate {
                    name: Some("Asha".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name.as_deref(), Some("Asha"));
        assert!(updated.department.is_none());

        let profile = service.get_profile(&login.user_id).await.unwrap();
        assert_eq!(profile.name.as_deref(), Some("Asha"));
        assert!(profile.created_at.is_some());

        let err = service.get_profile("missing").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
