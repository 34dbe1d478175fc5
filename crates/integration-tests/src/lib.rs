//! Integration tests for Delicious.
//!
//! # Running Tests
//!
//! ```bash
//! # A PostgreSQL database with the PostGIS extension available
//! export TEST_DATABASE_URL=postgres://localhost/delicious_test
//!
//! # Repository tests (migrations are applied automatically)
//! cargo test -p delicious-integration-tests -- --ignored
//!
//! # HTTP tests also need a running server
//! export DELICIOUS_BASE_URL=http://localhost:7777
//! ```
//!
//! # Test Categories
//!
//! - `stores` - Slugs, tags, top rated, proximity
//! - `pagination` - Page coverage over the whole table
//! - `hearts` - Toggle semantics, including concurrent toggles
//! - `password_reset` - Token expiry and single use
//! - `http` - Smoke tests against a running server
//!
//! Tests share one database, so every fixture is made unique with a UUID
//! rather than relying on an empty table.

use secrecy::SecretString;
use sqlx::PgPool;
use uuid::Uuid;

use delicious_core::{Email, UserId};
use delicious_web::db::{self, StoreRepository, UserRepository};
use delicious_web::models::{Store, StoreInput, User};
use delicious_web::services::auth::hash_password;

/// Password given to every fixture user.
pub const TEST_PASSWORD: &str = "integration-test-pw";

/// Shared handle for repository-level tests.
pub struct TestContext {
    pub pool: PgPool,
}

impl TestContext {
    /// Connect to `TEST_DATABASE_URL` and apply migrations.
    ///
    /// # Panics
    ///
    /// Panics if the variable is unset or the database is unreachable.
    pub async fn new() -> Self {
        let url = std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL must be set");
        let pool = db::create_pool(&SecretString::from(url))
            .await
            .expect("Failed to connect to test database");

        sqlx::migrate!("../web/migrations")
            .run(&pool)
            .await
            .expect("Failed to run migrations");

        Self { pool }
    }

    /// A user with a unique email.
    ///
    /// # Panics
    ///
    /// Panics if the insert fails.
    pub async fn create_user(&self, name: &str) -> User {
        let email = Email::parse(&format!("{}@example.test", unique(name)))
            .expect("fixture email");
        let hash = hash_password(TEST_PASSWORD).expect("hash");
        UserRepository::new(&self.pool)
            .create(&email, name, &hash)
            .await
            .expect("Failed to create user")
    }

    /// A store at `(lng, lat)` with the given tags.
    ///
    /// # Panics
    ///
    /// Panics if the fields don't validate or the insert fails.
    pub async fn create_store(
        &self,
        name: &str,
        tags: &[&str],
        (lng, lat): (f64, f64),
        author: UserId,
    ) -> Store {
        let draft = StoreInput {
            name: name.to_owned(),
            description: format!("About {name}"),
            tags: tags.iter().map(|t| (*t).to_owned()).collect(),
            address: "1 Test Street".to_owned(),
            lng: lng.to_string(),
            lat: lat.to_string(),
        }
        .validate()
        .expect("fixture store");

        StoreRepository::new(&self.pool)
            .create(&draft, author)
            .await
            .expect("Failed to create store")
    }
}

/// `prefix` plus a random suffix, lowercase.
#[must_use]
pub fn unique(prefix: &str) -> String {
    format!(
        "{}-{}",
        prefix.to_lowercase().replace(' ', "-"),
        Uuid::new_v4().simple()
    )
}

/// Base URL of a running server for HTTP tests.
#[must_use]
pub fn base_url() -> String {
    std::env::var("DELICIOUS_BASE_URL").unwrap_or_else(|_| "http://localhost:7777".to_owned())
}
