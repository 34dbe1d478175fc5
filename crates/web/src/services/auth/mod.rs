//! Authentication service.
//!
//! Password registration, login, account updates, and password resets.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use serde::Deserialize;
use sqlx::PgPool;
use tracing::instrument;

use delicious_core::{Email, UserId};

use crate::db::RepositoryError;
use crate::db::users::UserRepository;
use crate::models::User;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Registration form fields.
#[derive(Debug, Default, Deserialize)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(rename = "password-confirm")]
    pub password_confirm: String,
}

/// Authentication service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            users: UserRepository::new(pool),
        }
    }

    /// Register a new user.
    ///
    /// # Errors
    ///
    /// Returns a validation variant (`MissingName`, `InvalidEmail`,
    /// `MissingPassword`, `MissingConfirmation`, `PasswordMismatch`,
    /// `WeakPassword`) for bad input.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    #[instrument(skip_all)]
    pub async fn register(&self, form: &Registration) -> Result<User, AuthError> {
        let name = validate_name(&form.name)?;
        let email = Email::parse(&form.email)?;
        validate_new_password(&form.password, &form.password_confirm)?;

        let password_hash = hash_password(&form.password)?;

        self.users
            .create(&email, name, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })
    }

    /// Check an email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email is unknown,
    /// malformed, or the password is wrong.
    #[instrument(skip_all)]
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .users
            .get_password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        Ok(user)
    }

    /// Change a user's display name and email.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingName` or `AuthError::InvalidEmail` for bad input.
    /// Returns `AuthError::UserAlreadyExists` if another account has the email.
    /// Returns `AuthError::UserNotFound` if the user doesn't exist.
    pub async fn update_account(
        &self,
        id: UserId,
        name: &str,
        email: &str,
    ) -> Result<User, AuthError> {
        let name = validate_name(name)?;
        let email = Email::parse(email)?;

        self.users
            .update_profile(id, name, &email)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                RepositoryError::NotFound => AuthError::UserNotFound,
                other => AuthError::Repository(other),
            })
    }

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if the user doesn't exist.
    pub async fn get_user(&self, user_id: UserId) -> Result<User, AuthError> {
        self.users
            .get_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    /// Set a new password using a reset token and clear the token.
    ///
    /// The confirmation is checked before the token is looked at, and an
    /// invalid token leaves the stored password untouched.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::PasswordMismatch` or `AuthError::WeakPassword` for bad input.
    /// Returns `AuthError::InvalidResetToken` if the token is unknown or expired.
    #[instrument(skip_all)]
    pub async fn reset_password(
        &self,
        token: &str,
        password: &str,
        password_confirm: &str,
    ) -> Result<User, AuthError> {
        validate_new_password(password, password_confirm)?;
        let password_hash = hash_password(password)?;

        self.users
            .consume_reset_token(token, &password_hash)
            .await?
            .ok_or(AuthError::InvalidResetToken)
    }
}

fn validate_name(name: &str) -> Result<&str, AuthError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AuthError::MissingName);
    }
    Ok(name)
}

/// Validate a new password and its confirmation.
fn validate_new_password(password: &str, confirm: &str) -> Result<(), AuthError> {
    if password.is_empty() {
        return Err(AuthError::MissingPassword);
    }
    if confirm.is_empty() {
        return Err(AuthError::MissingConfirmation);
    }
    if password != confirm {
        return Err(AuthError::PasswordMismatch);
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_then_verify() {
        let hash = hash_password("correct horse battery").expect("hash");
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("correct horse battery", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong horse battery", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_verify_rejects_garbage_hash() {
        assert!(matches!(
            verify_password("anything", "not-a-phc-string"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_validate_new_password_order() {
        assert!(matches!(
            validate_new_password("", ""),
            Err(AuthError::MissingPassword)
        ));
        assert!(matches!(
            validate_new_password("hunter22", ""),
            Err(AuthError::MissingConfirmation)
        ));
        assert!(matches!(
            validate_new_password("hunter22", "hunter23"),
            Err(AuthError::PasswordMismatch)
        ));
        assert!(matches!(
            validate_new_password("short", "short"),
            Err(AuthError::WeakPassword(_))
        ));
        assert!(validate_new_password("long enough", "long enough").is_ok());
    }

    #[test]
    fn test_validate_name_trims() {
        assert_eq!(validate_name("  Wes  ").expect("name"), "Wes");
        assert!(matches!(validate_name("   "), Err(AuthError::MissingName)));
    }

    #[test]
    fn test_user_facing_messages() {
        assert_eq!(AuthError::MissingName.to_string(), "Please enter a name!");
        assert_eq!(AuthError::PasswordMismatch.to_string(), "Passwords must match");
        assert!(AuthError::PasswordMismatch.is_user_error());
        assert!(!AuthError::PasswordHash.is_user_error());
    }
}
