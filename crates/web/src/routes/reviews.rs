//! Review submission.

use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use delicious_core::StoreId;

use super::stores::back_with_error;
use crate::db::{ReviewRepository, StoreRepository};
use crate::error::{Result, add_breadcrumb};
use crate::flash;
use crate::middleware::RequireAuth;
use crate::models::ReviewInput;
use crate::state::AppState;

/// Leave a review on a store, then go back to it.
#[instrument(skip_all, fields(user_id = %user.id, store_id = %id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    Path(id): Path<StoreId>,
    Form(input): Form<ReviewInput>,
) -> Result<Response> {
    let store = StoreRepository::new(state.pool()).find_by_id(id).await?;
    let store_url = format!("/store/{}", store.slug);

    let draft = match input.validate() {
        Ok(draft) => draft,
        Err(e) => return Ok(back_with_error(&session, e.to_string(), &store_url).await),
    };

    ReviewRepository::new(state.pool())
        .create(store.id, user.id, &draft)
        .await?;

    add_breadcrumb("review", "Saved review", Some(&[("slug", store.slug.as_str())]));
    flash::success(&session, "Review Saved!").await;
    Ok(Redirect::to(&store_url).into_response())
}
