//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
///
/// The `Display` text of the input-validation variants is shown to users as
/// a flash message.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("Please enter a valid email!")]
    InvalidEmail(#[from] delicious_core::EmailError),

    /// Display name left blank.
    #[error("Please enter a name!")]
    MissingName,

    /// Password left blank.
    #[error("Password cannot be blank")]
    MissingPassword,

    /// Confirmation left blank.
    #[error("Confirm Password cannot be blank")]
    MissingConfirmation,

    /// Password and confirmation differ.
    #[error("Passwords must match")]
    PasswordMismatch,

    /// Password too weak or invalid.
    #[error("{0}")]
    WeakPassword(String),

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// User not found.
    #[error("user not found")]
    UserNotFound,

    /// User already exists.
    #[error("An account with that email already exists.")]
    UserAlreadyExists,

    /// Reset token unknown, already used, or expired.
    #[error("Password reset token is invalid or has expired.")]
    InvalidResetToken,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}

impl AuthError {
    /// Whether the error describes bad user input rather than a server fault.
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        !matches!(self, Self::Repository(_) | Self::PasswordHash)
    }
}
