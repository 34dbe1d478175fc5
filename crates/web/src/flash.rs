//! Session-backed flash messages.
//!
//! A handler pushes a message before redirecting; the next page that renders
//! the layout takes every pending message out of the session.

use tower_sessions::Session;

use crate::models::session::keys;
use crate::models::{Flash, FlashLevel, FlashLink};

/// Queue a flash message for the next rendered page.
///
/// Session failures are logged and otherwise ignored.
pub async fn push(session: &Session, level: FlashLevel, message: impl Into<String>) {
    store(
        session,
        Flash {
            level,
            message: message.into(),
            link: None,
        },
    )
    .await;
}

/// Queue a success flash followed by a link.
pub async fn success_with_link(
    session: &Session,
    message: impl Into<String>,
    href: impl Into<String>,
    label: impl Into<String>,
) {
    store(
        session,
        Flash {
            level: FlashLevel::Success,
            message: message.into(),
            link: Some(FlashLink {
                href: href.into(),
                label: label.into(),
            }),
        },
    )
    .await;
}

async fn store(session: &Session, flash: Flash) {
    let mut flashes: Vec<Flash> = session
        .get(keys::FLASHES)
        .await
        .ok()
        .flatten()
        .unwrap_or_default();

    flashes.push(flash);

    if let Err(e) = session.insert(keys::FLASHES, flashes).await {
        tracing::error!(error = %e, "Failed to store flash message");
    }
}

/// Queue a success flash.
pub async fn success(session: &Session, message: impl Into<String>) {
    push(session, FlashLevel::Success, message).await;
}

/// Queue an info flash.
pub async fn info(session: &Session, message: impl Into<String>) {
    push(session, FlashLevel::Info, message).await;
}

/// Queue an error flash.
pub async fn error(session: &Session, message: impl Into<String>) {
    push(session, FlashLevel::Error, message).await;
}

/// Remove and return every pending flash.
pub async fn take(session: &Session) -> Vec<Flash> {
    match session.remove::<Vec<Flash>>(keys::FLASHES).await {
        Ok(flashes) => flashes.unwrap_or_default(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to read flash messages");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use super::*;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    #[tokio::test]
    async fn test_flashes_are_taken_once_in_order() {
        let session = session();
        success(&session, "Saved").await;
        error(&session, "But also this").await;

        let flashes = take(&session).await;
        assert_eq!(flashes.len(), 2);
        assert_eq!(flashes[0].level, FlashLevel::Success);
        assert_eq!(flashes[0].message, "Saved");
        assert_eq!(flashes[1].level, FlashLevel::Error);

        assert!(take(&session).await.is_empty());
    }

    #[tokio::test]
    async fn test_link_survives_round_trip() {
        let session = session();
        success_with_link(&session, "Updated", "/store/cafe", "View Store").await;

        let flashes = take(&session).await;
        let link = flashes[0].link.as_ref().expect("link");
        assert_eq!(link.href, "/store/cafe");
        assert_eq!(link.label, "View Store");
    }
}
