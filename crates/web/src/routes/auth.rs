//! Authentication route handlers.
//!
//! Login, logout and registration with locally stored Argon2 hashes.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{OriginalUri, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, instrument, warn};

use crate::error::{AppError, Result};
use crate::filters;
use crate::flash;
use crate::middleware::{Layout, clear_current_user, set_current_user};
use crate::models::{CurrentUser, FlashLevel};
use crate::services::{AuthError, AuthService, Registration};
use crate::state::AppState;

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template, also carrying the forgot-password form.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub layout: Layout,
    pub title: String,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/register.html")]
pub struct RegisterTemplate {
    pub layout: Layout,
    pub title: String,
    /// Prefilled after a rejected submission.
    pub name: String,
    pub email: String,
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
pub async fn login_page(layout: Layout) -> impl IntoResponse {
    LoginTemplate {
        layout,
        title: "Login".to_owned(),
    }
}

/// Handle login form submission.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let user = match AuthService::new(state.pool())
        .login(&form.email, &form.password)
        .await
    {
        Ok(user) => user,
        Err(e) if e.is_user_error() => {
            warn!(error = %e, "Login failed");
            flash::error(&session, "Login failed!").await;
            return Ok(Redirect::to("/login").into_response());
        }
        Err(e) => return Err(e.into()),
    };

    set_current_user(&session, &CurrentUser::from(&user)).await?;
    info!(user_id = %user.id, "User logged in");

    flash::success(&session, "Successfully logged in").await;
    Ok(Redirect::to("/").into_response())
}

/// Log out and go home.
pub async fn logout(session: Session) -> Result<Response> {
    clear_current_user(&session).await?;
    flash::success(&session, "Successfully logged out! 👋").await;
    Ok(Redirect::to("/").into_response())
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page(layout: Layout) -> impl IntoResponse {
    RegisterTemplate {
        layout,
        title: "Register".to_owned(),
        name: String::new(),
        email: String::new(),
    }
}

/// Handle registration form submission.
///
/// A rejected form is re-rendered with the name and email kept; a new
/// account is logged in straight away.
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    OriginalUri(uri): OriginalUri,
    Form(form): Form<Registration>,
) -> Result<Response> {
    let user = match AuthService::new(state.pool()).register(&form).await {
        Ok(user) => user,
        Err(e) if e.is_user_error() => {
            return Ok(rejected_registration(&state, &session, uri.path(), &form, &e)
                .await
                .into_response());
        }
        Err(e) => return Err(AppError::from(e)),
    };

    set_current_user(&session, &CurrentUser::from(&user)).await?;
    info!(user_id = %user.id, "User registered");

    Ok(Redirect::to("/").into_response())
}

async fn rejected_registration(
    state: &AppState,
    session: &Session,
    path: &str,
    form: &Registration,
    error: &AuthError,
) -> RegisterTemplate {
    let layout = Layout::load(state.pool(), session, path)
        .await
        .with_flash(FlashLevel::Error, error.to_string());

    RegisterTemplate {
        layout,
        title: "Register".to_owned(),
        name: form.name.clone(),
        email: form.email.clone(),
    }
}
