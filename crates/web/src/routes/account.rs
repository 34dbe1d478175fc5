//! Account page, profile updates, and the password reset flow.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{OriginalUri, Path, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, instrument};

use super::stores::back_with_error;
use crate::error::{AppError, Result};
use crate::filters;
use crate::flash;
use crate::middleware::{Layout, RequireAuth, set_current_user};
use crate::models::{CurrentUser, User};
use crate::services::{AuthError, AuthService, ResetRequest, password_reset};
use crate::state::AppState;

/// Shown when a reset link is stale or made up.
const INVALID_RESET: &str = "Password reset is invalid or has expired";

// =============================================================================
// Form Types
// =============================================================================

/// Account update form.
#[derive(Debug, Deserialize)]
pub struct AccountForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

/// Forgot password form.
#[derive(Debug, Deserialize)]
pub struct ForgotForm {
    #[serde(default)]
    pub email: String,
}

/// New password and its confirmation.
#[derive(Debug, Deserialize)]
pub struct ResetForm {
    #[serde(default)]
    pub password: String,
    #[serde(default, rename = "password-confirm")]
    pub password_confirm: String,
}

// =============================================================================
// Templates
// =============================================================================

/// Account page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/index.html")]
pub struct AccountTemplate {
    pub layout: Layout,
    pub title: String,
    pub user: User,
}

/// Reset form template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/reset.html")]
pub struct ResetTemplate {
    pub layout: Layout,
    pub title: String,
    pub token: String,
}

// =============================================================================
// Account Routes
// =============================================================================

/// Display the account page.
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    session: Session,
    OriginalUri(uri): OriginalUri,
) -> Result<impl IntoResponse> {
    let user = AuthService::new(state.pool()).get_user(current.id).await?;

    Ok(AccountTemplate {
        layout: Layout::load(state.pool(), &session, uri.path()).await,
        title: "Edit Your Account".to_owned(),
        user,
    })
}

/// Update name and email.
#[instrument(skip_all, fields(user_id = %current.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(current): RequireAuth,
    session: Session,
    Form(form): Form<AccountForm>,
) -> Result<Response> {
    let user = match AuthService::new(state.pool())
        .update_account(current.id, &form.name, &form.email)
        .await
    {
        Ok(user) => user,
        Err(e) if e.is_user_error() => {
            return Ok(back_with_error(&session, e.to_string(), "/account").await);
        }
        Err(e) => return Err(e.into()),
    };

    // Keep the header in step with the new name and email
    set_current_user(&session, &CurrentUser::from(&user)).await?;

    flash::success(&session, "Account updated! 👍").await;
    Ok(Redirect::to("/account").into_response())
}

// =============================================================================
// Password Reset Routes
// =============================================================================

/// Mail a reset link.
#[instrument(skip_all)]
pub async fn forgot(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<ForgotForm>,
) -> Result<Response> {
    let outcome =
        password_reset::request_reset(state.pool(), state.config(), state.email(), &form.email)
            .await?;

    match outcome {
        ResetRequest::Sent => {
            flash::success(&session, "You have been emailed a password reset link.").await;
        }
        ResetRequest::UnknownEmail => {
            flash::error(&session, "Could not find an account with that email.").await;
        }
    }
    Ok(Redirect::to("/login").into_response())
}

/// Display the reset form for a live token.
pub async fn reset_page(
    State(state): State<AppState>,
    session: Session,
    OriginalUri(uri): OriginalUri,
    Path(token): Path<String>,
) -> Result<Response> {
    if password_reset::find_valid_token(state.pool(), &token)
        .await?
        .is_none()
    {
        return Ok(back_with_error(&session, INVALID_RESET, "/login").await);
    }

    Ok(ResetTemplate {
        layout: Layout::load(state.pool(), &session, uri.path()).await,
        title: "Reset your Password".to_owned(),
        token,
    }
    .into_response())
}

/// Consume a token, set the new password, and log the user in.
#[instrument(skip_all)]
pub async fn reset(
    State(state): State<AppState>,
    session: Session,
    Path(token): Path<String>,
    Form(form): Form<ResetForm>,
) -> Result<Response> {
    let user = match AuthService::new(state.pool())
        .reset_password(&token, &form.password, &form.password_confirm)
        .await
    {
        Ok(user) => user,
        Err(AuthError::InvalidResetToken) => {
            return Ok(back_with_error(&session, INVALID_RESET, "/login").await);
        }
        Err(AuthError::PasswordMismatch) => {
            let back = format!("/account/reset/{token}");
            return Ok(back_with_error(&session, "Passwords do not match", &back).await);
        }
        Err(e) if e.is_user_error() => {
            let back = format!("/account/reset/{token}");
            return Ok(back_with_error(&session, e.to_string(), &back).await);
        }
        Err(e) => return Err(AppError::from(e)),
    };

    set_current_user(&session, &CurrentUser::from(&user)).await?;
    info!(user_id = %user.id, "Password reset");

    flash::success(&session, "Password has been successfully reset! 💃").await;
    Ok(Redirect::to("/").into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_form_reads_dashed_confirmation() {
        let form: ResetForm =
            serde_urlencoded::from_str("password=hunter22&password-confirm=hunter22")
                .expect("form");
        assert_eq!(form.password, "hunter22");
        assert_eq!(form.password_confirm, "hunter22");
    }

    #[test]
    fn test_reset_template_posts_back_to_token() {
        let html = ResetTemplate {
            layout: Layout::default(),
            title: "Reset your Password".to_owned(),
            token: "abc123".to_owned(),
        }
        .render()
        .expect("render");
        assert!(html.contains(r#"action="/account/reset/abc123""#));
    }
}
