//! Review repository.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use delicious_core::{Rating, ReviewId, StoreId, UserId};

use super::RepositoryError;
use crate::models::{Review, ReviewDraft};

#[derive(FromRow)]
struct ReviewRow {
    id: ReviewId,
    author_id: UserId,
    author_name: String,
    store_id: StoreId,
    text: String,
    rating: Rating,
    created: DateTime<Utc>,
}

impl From<ReviewRow> for Review {
    fn from(row: ReviewRow) -> Self {
        Self {
            id: row.id,
            author: row.author_id,
            author_name: row.author_name,
            store: row.store_id,
            text: row.text,
            rating: row.rating,
            created: row.created,
        }
    }
}

/// Repository for review database operations.
pub struct ReviewRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ReviewRepository<'a> {
    /// Create a new review repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Add a review by `author` to `store`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the store doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(
        &self,
        store: StoreId,
        author: UserId,
        draft: &ReviewDraft,
    ) -> Result<Review, RepositoryError> {
        let row: ReviewRow = sqlx::query_as(
            r"
            WITH inserted AS (
                INSERT INTO delicious.review (author_id, store_id, text, rating)
                VALUES ($1, $2, $3, $4)
                RETURNING id, author_id, store_id, text, rating, created
            )
            SELECT i.id, i.author_id, u.name AS author_name, i.store_id,
                   i.text, i.rating, i.created
            FROM inserted i
            JOIN delicious.user u ON u.id = i.author_id
            ",
        )
        .bind(author)
        .bind(store)
        .bind(&draft.text)
        .bind(draft.rating)
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_foreign_key_violation()
            {
                return RepositoryError::NotFound;
            }
            RepositoryError::Database(e)
        })?;

        Ok(row.into())
    }

    /// Reviews for a store, newest first, with author names.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn for_store(&self, store: StoreId) -> Result<Vec<Review>, RepositoryError> {
        let rows: Vec<ReviewRow> = sqlx::query_as(
            r"
            SELECT r.id, r.author_id, u.name AS author_name, r.store_id,
                   r.text, r.rating, r.created
            FROM delicious.review r
            JOIN delicious.user u ON u.id = r.author_id
            WHERE r.store_id = $1
            ORDER BY r.created DESC, r.id DESC
            ",
        )
        .bind(store)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Review::from).collect())
    }
}
