//! Database operations for the Delicious `PostgreSQL` database.
//!
//! # Schema: `delicious`
//!
//! ## Tables
//!
//! - `user` - Accounts, Argon2 password hashes, pending reset tokens
//! - `store` - Listings with a `PostGIS` location and a generated `tsvector`
//! - `review` - Star ratings and text left on stores
//! - `heart` - Favorited stores, one row per (user, store)
//! - `tower_sessions.session` - Session storage (managed by the session store)
//!
//! # Migrations
//!
//! Migrations are stored in `crates/web/migrations/` and run via:
//! ```bash
//! cargo run -p delicious-cli -- migrate
//! ```

pub mod hearts;
pub mod reviews;
pub mod stores;
pub mod users;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use hearts::{HeartRepository, HeartToggle};
pub use reviews::ReviewRepository;
pub use stores::{StoreDetail, StorePage, StoreRepository};
pub use users::UserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// The caller does not own the entity it tried to change.
    #[error("forbidden")]
    Forbidden,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Name of the unique constraint on a sqlx error, if it is a unique violation.
pub(crate) fn unique_violation(err: &sqlx::Error) -> Option<&str> {
    if let sqlx::Error::Database(db_err) = err
        && db_err.is_unique_violation()
    {
        return Some(db_err.constraint().unwrap_or_default());
    }
    None
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
