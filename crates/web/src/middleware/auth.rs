//! Authentication extractors.
//!
//! Provides extractors for requiring a logged-in user in route handlers, plus
//! the [`Layout`] extractor every HTML page uses for its header, flashes and
//! heart state.

use std::borrow::Borrow;

use axum::{
    Json,
    extract::{FromRequestParts, OriginalUri},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use sqlx::PgPool;
use tower_sessions::Session;

use delicious_core::{StoreId, UserId};

use crate::db::HeartRepository;
use crate::error::{ErrorBody, clear_sentry_user, set_sentry_user};
use crate::flash;
use crate::models::session::keys;
use crate::models::{CurrentUser, Flash, FlashLevel};
use crate::state::AppState;

/// Shown when an anonymous user hits a protected page.
pub const LOGIN_REQUIRED: &str = "You must be logged in to do that!";

/// Extractor that requires an authenticated user.
///
/// HTML requests without a user are redirected to `/login` with a flash;
/// `/api/` requests get a 401 JSON body.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(user): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.name)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Error returned when authentication is required but the user is not logged in.
pub enum AuthRejection {
    /// Redirect to login page (for HTML requests).
    RedirectToLogin,
    /// Unauthorized response (for API requests).
    Unauthorized,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to("/login").into_response(),
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(ErrorBody {
                    status: StatusCode::UNAUTHORIZED.as_u16(),
                    message: LOGIN_REQUIRED.to_owned(),
                }),
            )
                .into_response(),
        }
    }
}

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let is_api = request_path(parts).starts_with("/api/");

        // Get the session from extensions (set by SessionManagerLayer)
        let session = parts
            .extensions
            .get::<Session>()
            .ok_or(AuthRejection::Unauthorized)?;

        let user: Option<CurrentUser> = session.get(keys::CURRENT_USER).await.ok().flatten();

        match user {
            Some(user) => Ok(Self(user)),
            None if is_api => Err(AuthRejection::Unauthorized),
            None => {
                flash::error(session, LOGIN_REQUIRED).await;
                Err(AuthRejection::RedirectToLogin)
            }
        }
    }
}

/// Full request path, before any `nest` prefix was stripped.
fn request_path(parts: &Parts) -> &str {
    parts
        .extensions
        .get::<OriginalUri>()
        .map_or_else(|| parts.uri.path(), |uri| uri.0.path())
}

/// Header, flash, and heart data shared by every HTML page.
///
/// Building one drains the pending flash messages. As an extractor it suits
/// handlers that always render; fallible handlers call [`Layout::load`] once
/// their lookups have succeeded.
#[derive(Debug, Clone, Default)]
pub struct Layout {
    pub user: Option<CurrentUser>,
    pub flashes: Vec<Flash>,
    /// Stores the logged-in user has hearted.
    pub hearts: Vec<StoreId>,
    /// Request path, for highlighting the active nav link.
    pub path: String,
}

impl Layout {
    /// Load the layout for a request.
    ///
    /// A failed hearts lookup is logged and rendered as no hearts.
    pub async fn load(pool: &PgPool, session: &Session, path: &str) -> Self {
        let user = session
            .get::<CurrentUser>(keys::CURRENT_USER)
            .await
            .ok()
            .flatten();
        let flashes = flash::take(session).await;

        let hearts = match &user {
            Some(user) => HeartRepository::new(pool)
                .for_user(user.id)
                .await
                .unwrap_or_else(|e| {
                    tracing::error!(error = %e, "Failed to load hearts for layout");
                    Vec::new()
                }),
            None => Vec::new(),
        };

        Self {
            user,
            flashes,
            hearts,
            path: path.to_owned(),
        }
    }

    /// Prepend a message that should show on this render rather than the next.
    #[must_use]
    pub fn with_flash(mut self, level: FlashLevel, message: impl Into<String>) -> Self {
        self.flashes.insert(
            0,
            Flash {
                level,
                message: message.into(),
                link: None,
            },
        );
        self
    }

    /// Whether the logged-in user has hearted `store`.
    #[must_use]
    pub fn is_hearted(&self, store: impl Borrow<StoreId>) -> bool {
        self.hearts.contains(store.borrow())
    }

    /// Whether the logged-in user is `author`.
    #[must_use]
    pub fn owns(&self, author: impl Borrow<UserId>) -> bool {
        self.user
            .as_ref()
            .is_some_and(|u| u.id == *author.borrow())
    }

    /// Whether `href` is the current page, for nav styling.
    #[must_use]
    pub fn is_active(&self, href: &str) -> bool {
        self.path == href || (href != "/" && self.path.starts_with(href))
    }
}

impl FromRequestParts<AppState> for Layout {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let path = request_path(parts).to_owned();
        let Some(session) = parts.extensions.get::<Session>() else {
            return Ok(Self {
                path,
                ..Self::default()
            });
        };

        Ok(Self::load(state.pool(), session, &path).await)
    }
}

/// Log a user in: rotate the session id and store their identity.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(keys::CURRENT_USER, user).await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    Ok(())
}

/// Helper to clear the current user from the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.remove::<CurrentUser>(keys::CURRENT_USER).await?;
    clear_sentry_user();
    Ok(())
}
