//! Application state
//!
//! Cheap to clone: services share the pool and hold their collaborators behind Arc.

use crate::config::Config;
use crate::db::Database;
use crate::error::AppError;
use crate::llm::LanguageModel;
use crate::mail::Mailer;
use crate::services::{AuthService, QueryService, UploadService};
use std::sync::Arc;

/// State shared by all handlers
#[derive(Clone)]
pub struct AppState {
    /// Loaded configuration
    pub config: Arc<Config>,
    /// OTP, MPIN and profile operations
    pub auth: AuthService,
    /// Upload storage and listing
    pub uploads: UploadService,
    /// Natural language queries
    pub query: QueryService,
}

impl AppState {
    /// Wire the services together
    pub fn new(
        config: Config,
        db: &Database,
        mailer: Arc<dyn Mailer>,
        llm: Arc<dyn LanguageModel>,
    ) -> Result<Self, AppError> {
        let pool = db.pool().clone();
        let auth = AuthService::new(
            pool.clone(),
            &config.auth,
            mailer,
            config.mail.from_name.clone(),
        )?;
        let uploads = UploadService::new(pool.clone(), config.upload.csv_skip_rows);
        let query = QueryService::new(pool, uploads.clone(), llm);

        Ok(Self {
            config: Arc::new(config),
            auth,
            uploads,
            query,
        })
    }

    /// Largest request body accepted on upload
    pub fn max_upload_bytes(&self) -> usize {
        self.config.upload.max_upload_bytes
    }
}
