//! Load sample users, stores and reviews from YAML, or wipe them all.
//!
//! Everything goes through the web crate's repositories, so seeded stores
//! get real slugs and seeded users get real Argon2 hashes.
//!
//! # File Format
//!
//! ```yaml
//! users:
//!   - name: Wes Bos
//!     email: wes@example.com
//!     password: correct-horse-battery
//! stores:
//!   - name: Wes's Coffee
//!     description: Great beans
//!     tags: [Wifi, Open Late]
//!     address: 123 King St W, Toronto
//!     lng: -79.38
//!     lat: 43.65
//!     author: wes@example.com
//! reviews:
//!   - store: Wes's Coffee
//!     author: wes@example.com
//!     rating: 5
//!     text: Best flat white in town.
//! ```

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use delicious_core::{Email, EmailError, StoreId, UserId};
use delicious_web::db::{self, RepositoryError, ReviewRepository, StoreRepository, UserRepository};
use delicious_web::models::{
    ReviewInput, ReviewValidationError, StoreInput, StoreValidationError,
};
use delicious_web::services::AuthError;
use delicious_web::services::auth::hash_password;

use super::{MissingDatabaseUrl, database_url};

/// Errors that can occur while seeding.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error(transparent)]
    MissingEnvVar(#[from] MissingDatabaseUrl),

    #[error("Could not read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Could not hash password: {0}")]
    Password(#[from] AuthError),

    #[error("User {email}: {source}")]
    InvalidUser { email: String, source: EmailError },

    #[error("Store {name:?}: {source}")]
    InvalidStore {
        name: String,
        source: StoreValidationError,
    },

    #[error("Review of {store:?}: {source}")]
    InvalidReview {
        store: String,
        source: ReviewValidationError,
    },

    #[error("{0} refers to unknown user {1}")]
    UnknownUser(String, String),

    #[error("Review refers to unknown store {0:?}")]
    UnknownStore(String),
}

/// Top level of a seed file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SeedData {
    pub users: Vec<SeedUser>,
    pub stores: Vec<SeedStore>,
    pub reviews: Vec<SeedReview>,
}

#[derive(Debug, Deserialize)]
pub struct SeedUser {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct SeedStore {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub address: String,
    pub lng: f64,
    pub lat: f64,
    /// Email of one of the seeded users.
    pub author: String,
}

impl SeedStore {
    fn input(&self) -> StoreInput {
        StoreInput {
            name: self.name.clone(),
            description: self.description.clone(),
            tags: self.tags.clone(),
            address: self.address.clone(),
            lng: self.lng.to_string(),
            lat: self.lat.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SeedReview {
    /// Name of one of the seeded stores.
    pub store: String,
    /// Email of one of the seeded users.
    pub author: String,
    pub rating: i64,
    pub text: String,
}

impl SeedReview {
    fn input(&self) -> ReviewInput {
        ReviewInput {
            text: self.text.clone(),
            rating: Some(self.rating),
        }
    }
}

/// Rows written by a seed run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub users: usize,
    pub stores: usize,
    pub reviews: usize,
}

impl SeedData {
    /// Parse a seed document.
    ///
    /// # Errors
    ///
    /// Returns `SeedError::Yaml` if the document doesn't match the format.
    pub fn parse(yaml: &str) -> Result<Self, SeedError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Validate every record and cross-reference before touching the database.
    ///
    /// # Errors
    ///
    /// Returns the first invalid record or dangling reference.
    pub fn check(&self) -> Result<(), SeedError> {
        let mut emails = Vec::with_capacity(self.users.len());
        for user in &self.users {
            let email = Email::parse(&user.email).map_err(|source| SeedError::InvalidUser {
                email: user.email.clone(),
                source,
            })?;
            emails.push(email);
        }

        let known_user = |raw: &str| {
            Email::parse(raw)
                .ok()
                .is_some_and(|email| emails.contains(&email))
        };

        for store in &self.stores {
            store
                .input()
                .validate()
                .map_err(|source| SeedError::InvalidStore {
                    name: store.name.clone(),
                    source,
                })?;
            if !known_user(&store.author) {
                return Err(SeedError::UnknownUser(
                    format!("Store {:?}", store.name),
                    store.author.clone(),
                ));
            }
        }

        for review in &self.reviews {
            review
                .input()
                .validate()
                .map_err(|source| SeedError::InvalidReview {
                    store: review.store.clone(),
                    source,
                })?;
            if !known_user(&review.author) {
                return Err(SeedError::UnknownUser(
                    format!("Review of {:?}", review.store),
                    review.author.clone(),
                ));
            }
            if !self.stores.iter().any(|s| s.name == review.store) {
                return Err(SeedError::UnknownStore(review.store.clone()));
            }
        }

        Ok(())
    }
}

/// Seed the database from a YAML file.
///
/// # Errors
///
/// Returns an error if the file is unreadable or invalid, or any insert fails.
pub async fn from_file(file_path: &str) -> Result<SeedSummary, SeedError> {
    let path = Path::new(file_path);
    info!(path = %file_path, "Loading seed data");

    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| SeedError::Io {
            path: file_path.to_owned(),
            source,
        })?;

    // Validate before connecting so a typo doesn't leave a half-seeded database
    let data = SeedData::parse(&content)?;
    data.check()?;

    let pool = db::create_pool(&database_url()?).await?;
    info!("Connected to database");

    let users = UserRepository::new(&pool);
    let stores = StoreRepository::new(&pool);
    let reviews = ReviewRepository::new(&pool);

    let mut user_ids: HashMap<Email, UserId> = HashMap::new();
    for user in &data.users {
        let email = Email::parse(&user.email).map_err(|source| SeedError::InvalidUser {
            email: user.email.clone(),
            source,
        })?;
        let created = users
            .create(&email, user.name.trim(), &hash_password(&user.password)?)
            .await?;
        info!(email = %created.email, "Created user");
        user_ids.insert(email, created.id);
    }

    let author = |raw: &str, what: String| {
        Email::parse(raw)
            .ok()
            .and_then(|email| user_ids.get(&email).copied())
            .ok_or_else(|| SeedError::UnknownUser(what, raw.to_owned()))
    };

    let mut store_ids: HashMap<&str, StoreId> = HashMap::new();
    for store in &data.stores {
        let draft = store
            .input()
            .validate()
            .map_err(|source| SeedError::InvalidStore {
                name: store.name.clone(),
                source,
            })?;
        let owner = author(&store.author, format!("Store {:?}", store.name))?;
        let created = stores.create(&draft, owner).await?;
        info!(slug = %created.slug, "Created store");
        store_ids.insert(store.name.as_str(), created.id);
    }

    for review in &data.reviews {
        let draft = review
            .input()
            .validate()
            .map_err(|source| SeedError::InvalidReview {
                store: review.store.clone(),
                source,
            })?;
        let store = store_ids
            .get(review.store.as_str())
            .copied()
            .ok_or_else(|| SeedError::UnknownStore(review.store.clone()))?;
        let by = author(&review.author, format!("Review of {:?}", review.store))?;
        reviews.create(store, by, &draft).await?;
    }

    Ok(SeedSummary {
        users: data.users.len(),
        stores: data.stores.len(),
        reviews: data.reviews.len(),
    })
}

/// Delete every heart, review, store and user.
///
/// # Errors
///
/// Returns an error if the database is unreachable.
pub async fn wipe() -> Result<(), SeedError> {
    let pool = db::create_pool(&database_url()?).await?;

    sqlx::query(
        "TRUNCATE delicious.heart, delicious.review, delicious.store, delicious.user RESTART IDENTITY",
    )
    .execute(&pool)
    .await?;

    info!("All data deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = include_str!("../../data/sample.yaml");

    #[test]
    fn test_sample_file_is_consistent() {
        let data = SeedData::parse(SAMPLE).expect("parse");
        assert!(!data.users.is_empty());
        assert!(!data.stores.is_empty());
        data.check().expect("sample data should validate");
    }

    #[test]
    fn test_unknown_author_is_rejected() {
        let data = SeedData::parse(
            r"
users:
  - { name: Wes, email: wes@example.com, password: correct-horse }
stores:
  - { name: Cafe, address: 1 Main St, lng: -79.0, lat: 43.0, author: nobody@example.com }
",
        )
        .expect("parse");
        assert!(matches!(data.check(), Err(SeedError::UnknownUser(_, _))));
    }

    #[test]
    fn test_review_of_unknown_store_is_rejected() {
        let data = SeedData::parse(
            r"
users:
  - { name: Wes, email: wes@example.com, password: correct-horse }
reviews:
  - { store: Nowhere, author: wes@example.com, rating: 4, text: Hmm }
",
        )
        .expect("parse");
        assert!(matches!(data.check(), Err(SeedError::UnknownStore(_))));
    }

    #[test]
    fn test_out_of_range_coordinates_are_rejected() {
        let data = SeedData::parse(
            r"
users:
  - { name: Wes, email: wes@example.com, password: correct-horse }
stores:
  - { name: Cafe, address: 1 Main St, lng: -79.0, lat: 123.0, author: wes@example.com }
",
        )
        .expect("parse");
        assert!(matches!(data.check(), Err(SeedError::InvalidStore { .. })));
    }
}
