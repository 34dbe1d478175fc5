//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::DeliciousConfig;
use crate::services::{EmailService, PhotoStore};

/// Error building application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("invalid SMTP configuration: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`. Repositories are built per
/// request from [`AppState::pool`].
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: DeliciousConfig,
    pool: PgPool,
    email: EmailService,
    photos: PhotoStore,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the SMTP relay configuration is invalid.
    pub fn new(config: DeliciousConfig, pool: PgPool) -> Result<Self, StateError> {
        let email = EmailService::new(&config.email)?;
        let photos = PhotoStore::new(config.uploads_dir.clone());

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                email,
                photos,
            }),
        })
    }

    /// Get a reference to the application configuration.
    #[must_use]
    pub fn config(&self) -> &DeliciousConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the email service.
    #[must_use]
    pub fn email(&self) -> &EmailService {
        &self.inner.email
    }

    /// Get a reference to the photo store.
    #[must_use]
    pub fn photos(&self) -> &PhotoStore {
        &self.inner.photos
    }
}
