//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. HTML handlers return `Result<T, AppError>`;
//! JSON handlers return `Result<T, ApiError>`, which renders the same errors
//! as a `{status, message}` body.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::{AuthError, EmailError, PhotoError, ResetError};

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Submitted data failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The user may not touch this resource.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Upload isn't an image type we handle.
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// Reset token unknown, used, or expired.
    #[error("Password reset token is invalid or has expired.")]
    InvalidResetToken,

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(RepositoryError),

    /// Storing a photo failed.
    #[error("Photo error: {0}")]
    Photo(PhotoError),

    /// Sending mail failed.
    #[error("Email error: {0}")]
    Email(#[from] EmailError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(AuthError),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound("That page doesn't exist.".to_owned()),
            RepositoryError::Forbidden => {
                Self::Forbidden("You must own the store in order to edit it.".to_owned())
            }
            other => Self::Database(other),
        }
    }
}

impl From<PhotoError> for AppError {
    fn from(err: PhotoError) -> Self {
        match err {
            PhotoError::UnsupportedMediaType(_) | PhotoError::Decode(_) => {
                Self::UnsupportedMediaType("That filetype isn't allowed!".to_owned())
            }
            other => Self::Photo(other),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidResetToken => Self::InvalidResetToken,
            AuthError::Repository(repo) => Self::from(repo),
            other => Self::Auth(other),
        }
    }
}

impl From<ResetError> for AppError {
    fn from(err: ResetError) -> Self {
        match err {
            ResetError::Repository(repo) => Self::from(repo),
            ResetError::Email(email) => Self::Email(email),
        }
    }
}

impl From<tower_sessions::session::Error> for AppError {
    fn from(err: tower_sessions::session::Error) -> Self {
        Self::Internal(format!("session error: {err}"))
    }
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::InvalidResetToken => StatusCode::GONE,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials | AuthError::UserNotFound => {
                    StatusCode::UNAUTHORIZED
                }
                AuthError::UserAlreadyExists => StatusCode::CONFLICT,
                AuthError::PasswordHash | AuthError::Repository(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
                _ => StatusCode::BAD_REQUEST,
            },
            Self::Database(_) | Self::Photo(_) | Self::Email(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Whether this is a server-side failure worth reporting.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status().is_server_error()
    }

    /// Message safe to show to the client.
    #[must_use]
    pub fn public_message(&self) -> String {
        // Don't expose internal error details to clients
        if self.is_server_error() {
            return "Internal server error".to_owned();
        }
        match self {
            Self::Validation(msg)
            | Self::NotFound(msg)
            | Self::Forbidden(msg)
            | Self::UnsupportedMediaType(msg)
            | Self::Unauthorized(msg)
            | Self::BadRequest(msg) => msg.clone(),
            Self::Auth(AuthError::InvalidCredentials) => "Invalid credentials".to_owned(),
            Self::Auth(err) => err.to_string(),
            other => other.to_string(),
        }
    }

    /// Log and capture server errors to Sentry.
    fn report(&self) {
        if self.is_server_error() {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.report();
        (self.status(), self.public_message()).into_response()
    }
}

/// JSON error envelope.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub status: u16,
    pub message: String,
}

/// `AppError` rendered as JSON for `/api` routes.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        Self(AppError::from(err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.0.report();
        let status = self.0.status();
        let body = ErrorBody {
            status: status.as_u16(),
            message: self.0.public_message(),
        };
        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Result type alias for JSON handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("store", "Created store", Some(&[("slug", "big-apple")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("store-123".to_string());
        assert_eq!(err.to_string(), "Not found: store-123");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Forbidden("test".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::UnsupportedMediaType("text/plain".to_string())),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Validation("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_repository_errors_map_to_client_errors() {
        assert!(matches!(
            AppError::from(RepositoryError::NotFound),
            AppError::NotFound(_)
        ));
        assert!(matches!(
            AppError::from(RepositoryError::Forbidden),
            AppError::Forbidden(_)
        ));
        assert!(matches!(
            AppError::from(RepositoryError::DataCorruption("x".into())),
            AppError::Database(_)
        ));
    }

    #[test]
    fn test_photo_type_errors_are_unsupported_media() {
        let err = AppError::from(PhotoError::UnsupportedMediaType("text/plain".into()));
        assert_eq!(err.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[test]
    fn test_validation_message_is_shown() {
        let err = AppError::Validation("Longitude must be between -180 and 180".to_string());
        assert_eq!(err.public_message(), "Longitude must be between -180 and 180");
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let err = AppError::Internal("connection string leaked".to_string());
        assert_eq!(err.public_message(), "Internal server error");
    }

    #[tokio::test]
    async fn test_api_error_envelope() {
        let response = ApiError(AppError::BadRequest(
            "Empty search query returns empty results.".to_string(),
        ))
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let body: serde_json::Value = serde_json::from_slice(&bytes).expect("json");
        assert_eq!(body["status"], 400);
        assert_eq!(body["message"], "Empty search query returns empty results.");
    }
}
