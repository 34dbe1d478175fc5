//! Password reset token lifecycle.
//!
//! A user is either idle or holds one pending token with an expiry. Requesting
//! a reset replaces any pending token; consuming one (see
//! [`AuthService::reset_password`](super::auth::AuthService::reset_password))
//! clears it.

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, instrument};

use delicious_core::Email;

use super::email::{EmailError, EmailService};
use crate::config::DeliciousConfig;
use crate::db::{RepositoryError, UserRepository};
use crate::models::User;

/// Bytes of randomness in a reset token (hex-encoded to twice this length).
const TOKEN_BYTES: usize = 20;

/// How long a reset token stays valid, in seconds.
pub const TOKEN_LIFETIME_SECS: i64 = 60 * 60;

/// Errors from requesting a reset.
#[derive(Debug, Error)]
pub enum ResetError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Email(#[from] EmailError),
}

/// Result of a reset request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetRequest {
    /// A token was stored and mailed.
    Sent,
    /// No account has that email. Nothing was stored or sent.
    UnknownEmail,
}

/// Generate a fresh hex token.
#[must_use]
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Expiry for a token issued at `now`.
#[must_use]
pub fn expiry_from(now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::seconds(TOKEN_LIFETIME_SECS)
}

/// Link the email points at.
#[must_use]
pub fn reset_url(config: &DeliciousConfig, token: &str) -> String {
    config.absolute_url(&format!("/account/reset/{token}"))
}

/// Issue and mail a reset token for `email`.
///
/// # Errors
///
/// Returns `ResetError::Repository` if the token can't be stored.
/// Returns `ResetError::Email` if the message can't be sent.
#[instrument(skip_all)]
pub async fn request_reset(
    pool: &PgPool,
    config: &DeliciousConfig,
    mailer: &EmailService,
    email: &str,
) -> Result<ResetRequest, ResetError> {
    let Ok(email) = Email::parse(email) else {
        return Ok(ResetRequest::UnknownEmail);
    };

    let users = UserRepository::new(pool);
    let Some(user) = users.get_by_email(&email).await? else {
        return Ok(ResetRequest::UnknownEmail);
    };

    let token = generate_token();
    users
        .set_reset_token(user.id, &token, expiry_from(Utc::now()))
        .await?;

    mailer
        .send_password_reset(user.email.as_str(), &user.name, &reset_url(config, &token))
        .await?;

    info!(user_id = %user.id, "Issued password reset token");
    Ok(ResetRequest::Sent)
}

/// The user holding `token`, if it hasn't expired.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn find_valid_token(pool: &PgPool, token: &str) -> Result<Option<User>, RepositoryError> {
    if !looks_like_token(token) {
        return Ok(None);
    }
    UserRepository::new(pool).get_by_reset_token(token).await
}

/// Cheap shape check before touching the database.
fn looks_like_token(token: &str) -> bool {
    token.len() == TOKEN_BYTES * 2 && token.bytes().all(|b| b.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_token_shape() {
        let token = generate_token();
        assert_eq!(token.len(), 40);
        assert!(looks_like_token(&token));
    }

    #[test]
    fn test_tokens_differ() {
        assert_ne!(generate_token(), generate_token());
    }

    #[test]
    fn test_expiry_is_one_hour_later() {
        let now = Utc::now();
        assert_eq!(expiry_from(now) - now, Duration::hours(1));
    }

    #[test]
    fn test_looks_like_token_rejects_junk() {
        assert!(!looks_like_token(""));
        assert!(!looks_like_token("../../etc/passwd"));
        assert!(!looks_like_token(&"g".repeat(40)));
    }
}
