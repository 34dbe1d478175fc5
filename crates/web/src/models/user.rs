//! User domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

use delicious_core::{Email, UserId};

/// A registered user (domain type).
///
/// The password hash and reset token never leave the repository layer.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Normalized email address, unique across users.
    pub email: Email,
    /// Display name.
    pub name: String,
    /// When the user registered.
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Gravatar image URL for this user's email.
    #[must_use]
    pub fn gravatar(&self, size: u32) -> String {
        gravatar_url(&self.email, size)
    }
}

/// Gravatar URL for an email, using the SHA-256 hash of the normalized address.
#[must_use]
pub fn gravatar_url(email: &Email, size: u32) -> String {
    let digest = Sha256::digest(email.as_str().as_bytes());
    format!(
        "https://gravatar.com/avatar/{}?s={size}&d=retro",
        hex::encode(digest)
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_gravatar_uses_normalized_email() {
        let a = gravatar_url(&Email::parse("Wes@Example.com").unwrap(), 200);
        let b = gravatar_url(&Email::parse("wes@example.com ").unwrap(), 200);
        assert_eq!(a, b);
        assert!(a.starts_with("https://gravatar.com/avatar/"));
        assert!(a.ends_with("?s=200&d=retro"));
    }

    #[test]
    fn test_gravatar_hash_is_sha256_hex() {
        let url = gravatar_url(&Email::parse("a@b.co").unwrap(), 80);
        let hash = url
            .trim_start_matches("https://gravatar.com/avatar/")
            .split('?')
            .next()
            .unwrap();
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
