//! Heart (favorite) repository.
//!
//! Hearts are rows in `delicious.heart`, so adding and removing one are
//! set-membership statements rather than rewrites of a whole list.

use serde::Serialize;
use sqlx::PgPool;
use tracing::{debug, instrument};

use delicious_core::{StoreId, UserId};

use super::RepositoryError;

/// Result of toggling a heart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeartToggle {
    /// Every store the user has hearted after the toggle, oldest first.
    pub hearts: Vec<StoreId>,
    /// Whether the toggled store is now hearted.
    pub hearted: bool,
}

/// Repository for heart database operations.
pub struct HeartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> HeartRepository<'a> {
    /// Create a new heart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store IDs a user has hearted, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn for_user(&self, user: UserId) -> Result<Vec<StoreId>, RepositoryError> {
        let rows: Vec<(StoreId,)> = sqlx::query_as(
            r"
            SELECT store_id
            FROM delicious.heart
            WHERE user_id = $1
            ORDER BY created_at, store_id
            ",
        )
        .bind(user)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// Heart `store` if the user hasn't, otherwise un-heart it.
    ///
    /// Runs in a transaction holding the user's row lock, so concurrent
    /// toggles from the same user apply one after another.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user or store doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    #[instrument(skip(self))]
    pub async fn toggle(&self, user: UserId, store: StoreId) -> Result<HeartToggle, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let locked: Option<(UserId,)> =
            sqlx::query_as("SELECT id FROM delicious.user WHERE id = $1 FOR UPDATE")
                .bind(user)
                .fetch_optional(&mut *tx)
                .await?;
        if locked.is_none() {
            return Err(RepositoryError::NotFound);
        }

        let (store_exists,): (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM delicious.store WHERE id = $1)")
                .bind(store)
                .fetch_one(&mut *tx)
                .await?;
        if !store_exists {
            return Err(RepositoryError::NotFound);
        }

        let removed = sqlx::query("DELETE FROM delicious.heart WHERE user_id = $1 AND store_id = $2")
            .bind(user)
            .bind(store)
            .execute(&mut *tx)
            .await?
            .rows_affected()
            > 0;

        if !removed {
            sqlx::query(
                r"
                INSERT INTO delicious.heart (user_id, store_id)
                VALUES ($1, $2)
                ON CONFLICT (user_id, store_id) DO NOTHING
                ",
            )
            .bind(user)
            .bind(store)
            .execute(&mut *tx)
            .await?;
        }

        let rows: Vec<(StoreId,)> = sqlx::query_as(
            r"
            SELECT store_id
            FROM delicious.heart
            WHERE user_id = $1
            ORDER BY created_at, store_id
            ",
        )
        .bind(user)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        let hearted = !removed;
        debug!(hearted, "Toggled heart");
        Ok(HeartToggle {
            hearts: rows.into_iter().map(|(id,)| id).collect(),
            hearted,
        })
    }
}
