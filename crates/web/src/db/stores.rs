//! Store repository: CRUD, slug assignment, and the aggregate queries.
//!
//! Text ranking, proximity and averaging are all pushed down to `PostgreSQL`
//! (`tsvector`, `PostGIS` geography, `GROUP BY`). This module only composes
//! the queries and maps rows into domain types.

use std::future::Future;

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::{debug, instrument};

use delicious_core::{GeoPoint, PageRequest, Pagination, Slug, StoreId, UserId, disambiguate};

use super::{RepositoryError, unique_violation};
use crate::models::{Location, NearbyStore, Store, StoreDraft, TagCount, TopStore};

/// How many suffixes to try after the first slug candidate loses a race.
const MAX_SLUG_ATTEMPTS: usize = 5;

/// Unique constraint guarding `store.slug`.
const SLUG_CONSTRAINT: &str = "store_slug_key";

/// Columns selected for a full [`Store`], with the table aliased as `s`.
macro_rules! store_columns {
    () => {
        "s.id, s.name, s.slug, s.description, s.tags, s.created, s.address, \
         ST_X(s.location::geometry) AS lng, ST_Y(s.location::geometry) AS lat, \
         s.photo, s.author_id"
    };
}

#[derive(FromRow)]
struct StoreRow {
    id: StoreId,
    name: String,
    slug: String,
    description: Option<String>,
    tags: Vec<String>,
    created: DateTime<Utc>,
    address: String,
    lng: f64,
    lat: f64,
    photo: Option<String>,
    author_id: UserId,
}

impl TryFrom<StoreRow> for Store {
    type Error = RepositoryError;

    fn try_from(row: StoreRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            slug: parse_slug(&row.slug)?,
            name: row.name,
            description: row.description,
            tags: row.tags,
            created: row.created,
            location: location(row.lng, row.lat, row.address)?,
            photo: row.photo,
            author: row.author_id,
        })
    }
}

#[derive(FromRow)]
struct StoreDetailRow {
    #[sqlx(flatten)]
    store: StoreRow,
    author_name: String,
}

#[derive(FromRow)]
struct TopStoreRow {
    slug: String,
    name: String,
    photo: Option<String>,
    average_rating: f64,
    review_count: i64,
}

#[derive(FromRow)]
struct NearbyRow {
    slug: String,
    name: String,
    description: Option<String>,
    photo: Option<String>,
    address: String,
    lng: f64,
    lat: f64,
    distance_meters: f64,
}

fn parse_slug(raw: &str) -> Result<Slug, RepositoryError> {
    Slug::parse(raw)
        .ok_or_else(|| RepositoryError::DataCorruption(format!("invalid slug in database: {raw:?}")))
}

fn location(lng: f64, lat: f64, address: String) -> Result<Location, RepositoryError> {
    let point = GeoPoint::new(lng, lat)
        .map_err(|e| RepositoryError::DataCorruption(format!("invalid location in database: {e}")))?;
    Ok(Location { point, address })
}

fn into_stores(rows: Vec<StoreRow>) -> Result<Vec<Store>, RepositoryError> {
    rows.into_iter().map(Store::try_from).collect()
}

/// A store together with its author's display name.
#[derive(Debug, Clone)]
pub struct StoreDetail {
    pub store: Store,
    pub author_name: String,
}

/// One page of the store listing.
#[derive(Debug, Clone)]
pub struct StorePage {
    pub stores: Vec<Store>,
    pub pagination: Pagination,
}

/// Repository for store database operations.
pub struct StoreRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> StoreRepository<'a> {
    /// Create a new store repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Persist a new store owned by `author`, assigning a unique slug.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if no free slug was found after
    /// retrying, `RepositoryError::Database` for other database errors.
    #[instrument(skip(self, draft), fields(name = %draft.name))]
    pub async fn create(&self, draft: &StoreDraft, author: UserId) -> Result<Store, RepositoryError> {
        let base = Slug::from_name(&draft.name);
        let existing = self.count_slug_family(&base, None).await?;

        let row =
            with_free_slug(&base, existing, move |slug| self.insert(draft, author, slug)).await?;
        let store = Store::try_from(row)?;
        debug!(id = %store.id, slug = %store.slug, "Created store");
        Ok(store)
    }

    /// Replace a store's fields with `draft`.
    ///
    /// The slug is regenerated only when the name changes, and a draft without
    /// a photo keeps the current one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the store doesn't exist,
    /// `RepositoryError::Forbidden` if `author` doesn't own it.
    #[instrument(skip(self, draft))]
    pub async fn update(
        &self,
        id: StoreId,
        author: UserId,
        draft: &StoreDraft,
    ) -> Result<Store, RepositoryError> {
        let current = self.find_by_id(id).await?;
        if !current.is_owned_by(author) {
            return Err(RepositoryError::Forbidden);
        }

        let row = if current.name == draft.name {
            self.write_update(id, author, draft, current.slug).await?
        } else {
            let base = Slug::from_name(&draft.name);
            let existing = self.count_slug_family(&base, Some(id)).await?;
            with_free_slug(&base, existing, move |slug| {
                self.write_update(id, author, draft, slug)
            })
            .await?
        };

        row.map_or(Err(RepositoryError::NotFound), Store::try_from)
    }

    /// Get a store by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no store has this ID.
    pub async fn find_by_id(&self, id: StoreId) -> Result<Store, RepositoryError> {
        let row: Option<StoreRow> = sqlx::query_as(concat!(
            "SELECT ",
            store_columns!(),
            " FROM delicious.store s WHERE s.id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map_or(Err(RepositoryError::NotFound), Store::try_from)
    }

    /// Get a store and its author's name by slug.
    ///
    /// Reviews are loaded separately with
    /// [`ReviewRepository::for_store`](super::ReviewRepository::for_store).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no store has this slug.
    pub async fn find_by_slug(&self, slug: &str) -> Result<StoreDetail, RepositoryError> {
        let row: Option<StoreDetailRow> = sqlx::query_as(concat!(
            "SELECT ",
            store_columns!(),
            ", u.name AS author_name \
             FROM delicious.store s \
             JOIN delicious.user u ON u.id = s.author_id \
             WHERE s.slug = $1"
        ))
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;

        let row = row.ok_or(RepositoryError::NotFound)?;
        Ok(StoreDetail {
            store: Store::try_from(row.store)?,
            author_name: row.author_name,
        })
    }

    /// One page of stores, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(&self, page: PageRequest) -> Result<StorePage, RepositoryError> {
        let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM delicious.store")
            .fetch_one(self.pool)
            .await?;

        let rows: Vec<StoreRow> = sqlx::query_as(concat!(
            "SELECT ",
            store_columns!(),
            " FROM delicious.store s \
             ORDER BY s.created DESC, s.id DESC \
             LIMIT $1 OFFSET $2"
        ))
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(self.pool)
        .await?;

        Ok(StorePage {
            stores: into_stores(rows)?,
            pagination: Pagination::new(page, u64::try_from(total).unwrap_or_default()),
        })
    }

    /// Every store, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn all(&self) -> Result<Vec<Store>, RepositoryError> {
        let rows: Vec<StoreRow> = sqlx::query_as(concat!(
            "SELECT ",
            store_columns!(),
            " FROM delicious.store s ORDER BY s.created DESC, s.id DESC"
        ))
        .fetch_all(self.pool)
        .await?;

        into_stores(rows)
    }

    /// Stores carrying `tag`, or every tagged store when `tag` is `None` or blank.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_tag(&self, tag: Option<&str>) -> Result<Vec<Store>, RepositoryError> {
        let tag = tag.map(str::trim).filter(|t| !t.is_empty());

        let rows: Vec<StoreRow> = sqlx::query_as(concat!(
            "SELECT ",
            store_columns!(),
            " FROM delicious.store s \
             WHERE ($1::text IS NULL AND cardinality(s.tags) > 0) OR $1 = ANY(s.tags) \
             ORDER BY s.created DESC, s.id DESC"
        ))
        .bind(tag)
        .fetch_all(self.pool)
        .await?;

        into_stores(rows)
    }

    /// Stores whose IDs are in `ids`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find_by_ids(&self, ids: &[StoreId]) -> Result<Vec<Store>, RepositoryError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows: Vec<StoreRow> = sqlx::query_as(concat!(
            "SELECT ",
            store_columns!(),
            " FROM delicious.store s WHERE s.id = ANY($1) ORDER BY s.created DESC, s.id DESC"
        ))
        .bind(ids)
        .fetch_all(self.pool)
        .await?;

        into_stores(rows)
    }

    /// How many stores carry each tag, most used first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn tag_counts(&self) -> Result<Vec<TagCount>, RepositoryError> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r"
            SELECT tag, COUNT(*) AS count
            FROM delicious.store s, unnest(s.tags) AS tag
            GROUP BY tag
            ORDER BY count DESC, tag ASC
            ",
        )
        .fetch_all(self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(tag, count)| TagCount { tag, count })
            .collect())
    }

    /// Highest average rating first, among stores with at least two reviews.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn top_rated(&self, limit: i64) -> Result<Vec<TopStore>, RepositoryError> {
        let rows: Vec<TopStoreRow> = sqlx::query_as(
            r"
            SELECT s.slug, s.name, s.photo,
                   AVG(r.rating)::float8 AS average_rating,
                   COUNT(r.id) AS review_count
            FROM delicious.store s
            JOIN delicious.review r ON r.store_id = s.id
            GROUP BY s.id
            HAVING COUNT(r.id) >= 2
            ORDER BY average_rating DESC, review_count DESC, s.name ASC
            LIMIT $1
            ",
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(TopStore {
                    slug: parse_slug(&row.slug)?,
                    name: row.name,
                    photo: row.photo,
                    average_rating: row.average_rating,
                    review_count: row.review_count,
                })
            })
            .collect()
    }

    /// Full-text search over name and description, most relevant first.
    ///
    /// `query` uses web-search syntax (quoted phrases, `-exclusions`, `or`).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str) -> Result<Vec<Store>, RepositoryError> {
        let rows: Vec<StoreRow> = sqlx::query_as(concat!(
            "SELECT ",
            store_columns!(),
            ", ts_rank(s.search, q) AS rank \
             FROM delicious.store s, websearch_to_tsquery('english', $1) q \
             WHERE s.search @@ q \
             ORDER BY rank DESC, s.created DESC"
        ))
        .bind(query)
        .fetch_all(self.pool)
        .await?;

        into_stores(rows)
    }

    /// Stores within `max_distance_meters` of `origin`, nearest first.
    ///
    /// Distances are computed on the spheroid via `PostGIS` geography.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self, origin), fields(lng = origin.lng(), lat = origin.lat()))]
    pub async fn near(
        &self,
        origin: GeoPoint,
        max_distance_meters: f64,
        limit: i64,
    ) -> Result<Vec<NearbyStore>, RepositoryError> {
        let rows: Vec<NearbyRow> = sqlx::query_as(
            r"
            SELECT s.slug, s.name, s.description, s.photo, s.address,
                   ST_X(s.location::geometry) AS lng,
                   ST_Y(s.location::geometry) AS lat,
                   ST_Distance(s.location, origin.point) AS distance_meters
            FROM delicious.store s,
                 (SELECT ST_SetSRID(ST_MakePoint($1, $2), 4326)::geography AS point) origin
            WHERE ST_DWithin(s.location, origin.point, $3)
            ORDER BY s.location <-> origin.point
            LIMIT $4
            ",
        )
        .bind(origin.lng())
        .bind(origin.lat())
        .bind(max_distance_meters)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(NearbyStore {
                    slug: parse_slug(&row.slug)?,
                    name: row.name,
                    description: row.description,
                    photo: row.photo,
                    location: location(row.lng, row.lat, row.address)?,
                    distance_meters: row.distance_meters,
                })
            })
            .collect()
    }

    /// Number of stores whose slug is `base` or `base-N`, ignoring `exclude`.
    async fn count_slug_family(
        &self,
        base: &Slug,
        exclude: Option<StoreId>,
    ) -> Result<usize, RepositoryError> {
        let (count,): (i64,) = sqlx::query_as(
            r"
            SELECT COUNT(*)
            FROM delicious.store
            WHERE slug ~* $1 AND ($2::int IS NULL OR id <> $2)
            ",
        )
        .bind(base.family_pattern())
        .bind(exclude)
        .fetch_one(self.pool)
        .await?;

        Ok(usize::try_from(count).unwrap_or_default())
    }

    async fn insert(
        &self,
        draft: &StoreDraft,
        author: UserId,
        slug: Slug,
    ) -> Result<StoreRow, sqlx::Error> {
        sqlx::query_as(concat!(
            "INSERT INTO delicious.store AS s \
                 (name, slug, description, tags, address, location, photo, author_id) \
             VALUES ($1, $2, $3, $4, $5, \
                     ST_SetSRID(ST_MakePoint($6, $7), 4326)::geography, $8, $9) \
             RETURNING ",
            store_columns!()
        ))
        .bind(&draft.name)
        .bind(slug.as_str())
        .bind(draft.description.as_deref())
        .bind(&draft.tags)
        .bind(&draft.location.address)
        .bind(draft.location.point.lng())
        .bind(draft.location.point.lat())
        .bind(draft.photo.as_deref())
        .bind(author)
        .fetch_one(self.pool)
        .await
    }

    /// Returns `None` if the row vanished or changed owner since it was read.
    async fn write_update(
        &self,
        id: StoreId,
        author: UserId,
        draft: &StoreDraft,
        slug: Slug,
    ) -> Result<Option<StoreRow>, sqlx::Error> {
        sqlx::query_as(concat!(
            "UPDATE delicious.store AS s SET \
                 name = $1, slug = $2, description = $3, tags = $4, address = $5, \
                 location = ST_SetSRID(ST_MakePoint($6, $7), 4326)::geography, \
                 photo = COALESCE($8, s.photo) \
             WHERE s.id = $9 AND s.author_id = $10 \
             RETURNING ",
            store_columns!()
        ))
        .bind(&draft.name)
        .bind(slug.as_str())
        .bind(draft.description.as_deref())
        .bind(&draft.tags)
        .bind(&draft.location.address)
        .bind(draft.location.point.lng())
        .bind(draft.location.point.lat())
        .bind(draft.photo.as_deref())
        .bind(id)
        .bind(author)
        .fetch_optional(self.pool)
        .await
    }
}

/// Run `write` with the counted slug candidate, moving to the next numeric
/// suffix each time the slug unique constraint rejects it.
async fn with_free_slug<T, F, Fut>(
    base: &Slug,
    existing: usize,
    mut write: F,
) -> Result<T, RepositoryError>
where
    F: FnMut(Slug) -> Fut,
    Fut: Future<Output = Result<T, sqlx::Error>>,
{
    let mut candidate = disambiguate(base, existing);
    for attempt in 1..=MAX_SLUG_ATTEMPTS {
        match write(candidate.clone()).await {
            Ok(value) => return Ok(value),
            Err(e) if unique_violation(&e) == Some(SLUG_CONSTRAINT) => {
                debug!(slug = %candidate, attempt, "Slug taken, trying next suffix");
                candidate = base.with_suffix(existing + 1 + attempt);
            }
            Err(e) => return Err(RepositoryError::Database(e)),
        }
    }
    Err(RepositoryError::Conflict(format!(
        "no free slug for '{base}' after {MAX_SLUG_ATTEMPTS} attempts"
    )))
}
