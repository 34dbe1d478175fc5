//! User repository for database operations.
//!
//! Accounts, password hashes, and the password-reset token columns.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use delicious_core::{Email, UserId};

use super::{RepositoryError, unique_violation};
use crate::models::User;

#[derive(FromRow)]
struct UserRow {
    id: UserId,
    email: String,
    name: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: row.id,
            email,
            name: row.name,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct UserWithHashRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

fn map_email_conflict(e: sqlx::Error) -> RepositoryError {
    if unique_violation(&e).is_some() {
        return RepositoryError::Conflict("email already exists".to_owned());
    }
    RepositoryError::Database(e)
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by their email address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the email in the database is invalid.
    pub async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let row: Option<UserRow> = sqlx::query_as(
            r"
            SELECT id, email, name, created_at
            FROM delicious.user
            WHERE email = $1
            ",
        )
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the email in the database is invalid.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row: Option<UserRow> = sqlx::query_as(
            r"
            SELECT id, email, name, created_at
            FROM delicious.user
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    /// Create a new user with a password hash.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        email: &Email,
        name: &str,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        let row: UserRow = sqlx::query_as(
            r"
            INSERT INTO delicious.user (email, name, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, email, name, created_at
            ",
        )
        .bind(email.as_str())
        .bind(name)
        .bind(password_hash)
        .fetch_one(self.pool)
        .await
        .map_err(map_email_conflict)?;

        User::try_from(row)
    }

    /// Get a user and their password hash by email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row: Option<UserWithHashRow> = sqlx::query_as(
            r"
            SELECT id, email, name, created_at, password_hash
            FROM delicious.user
            WHERE email = $1
            ",
        )
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        let Some(r) = row else {
            return Ok(None);
        };

        Ok(Some((User::try_from(r.user)?, r.password_hash)))
    }

    /// Update a user's display name and email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if another account uses the email.
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    pub async fn update_profile(
        &self,
        id: UserId,
        name: &str,
        email: &Email,
    ) -> Result<User, RepositoryError> {
        let row: Option<UserRow> = sqlx::query_as(
            r"
            UPDATE delicious.user
            SET name = $1, email = $2
            WHERE id = $3
            RETURNING id, email, name, created_at
            ",
        )
        .bind(name)
        .bind(email.as_str())
        .bind(id)
        .fetch_optional(self.pool)
        .await
        .map_err(map_email_conflict)?;

        row.map_or(Err(RepositoryError::NotFound), User::try_from)
    }

    /// Store a reset token for a user, replacing any pending one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    pub async fn set_reset_token(
        &self,
        id: UserId,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE delicious.user
            SET reset_password_token = $1, reset_password_expiry = $2
            WHERE id = $3
            ",
        )
        .bind(token)
        .bind(expires_at)
        .bind(id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// Get the user holding an unexpired reset token.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_reset_token(&self, token: &str) -> Result<Option<User>, RepositoryError> {
        let row: Option<UserRow> = sqlx::query_as(
            r"
            SELECT id, email, name, created_at
            FROM delicious.user
            WHERE reset_password_token = $1 AND reset_password_expiry > NOW()
            ",
        )
        .bind(token)
        .fetch_optional(self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    /// Set a new password hash and clear the reset token, if the token is
    /// still valid.
    ///
    /// Check and write happen in one statement, so a token can only be
    /// consumed once and an expired token never changes the password.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn consume_reset_token(
        &self,
        token: &str,
        password_hash: &str,
    ) -> Result<Option<User>, RepositoryError> {
        let row: Option<UserRow> = sqlx::query_as(
            r"
            UPDATE delicious.user
            SET password_hash = $2,
                reset_password_token = NULL,
                reset_password_expiry = NULL
            WHERE reset_password_token = $1 AND reset_password_expiry > NOW()
            RETURNING id, email, name, created_at
            ",
        )
        .bind(token)
        .bind(password_hash)
        .fetch_optional(self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }
}
