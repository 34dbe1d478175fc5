//! CLI subcommands.

pub mod migrate;
pub mod seed;

use secrecy::SecretString;
use thiserror::Error;

/// Failure to find connection settings.
#[derive(Debug, Error)]
#[error("Missing environment variable: {0} (or DATABASE_URL)")]
pub struct MissingDatabaseUrl(&'static str);

/// `DELICIOUS_DATABASE_URL`, falling back to `DATABASE_URL`.
pub fn database_url() -> Result<SecretString, MissingDatabaseUrl> {
    dotenvy::dotenv().ok();

    std::env::var("DELICIOUS_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| MissingDatabaseUrl("DELICIOUS_DATABASE_URL"))
}
