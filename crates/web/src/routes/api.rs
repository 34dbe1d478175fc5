//! JSON API routes, nested under `/api/v1`.
//!
//! Errors come back as `{status, message}` via [`ApiError`].

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use tracing::instrument;

use delicious_core::StoreId;
use delicious_core::types::geo::{DEFAULT_NEAR_LIMIT, DEFAULT_NEAR_RADIUS_METERS};
use delicious_core::GeoPoint;

use crate::db::{HeartRepository, HeartToggle, StoreRepository};
use crate::error::{ApiResult, AppError};
use crate::middleware::RequireAuth;
use crate::models::{NearbyStore, Store};
use crate::state::AppState;

/// `?q=` for the search endpoint.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// Text search via `?q=`.
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Vec<Store>>> {
    run_search(&state, &query.q).await
}

/// Text search with the query as a path segment.
pub async fn search_path(
    State(state): State<AppState>,
    Path(query): Path<String>,
) -> ApiResult<Json<Vec<Store>>> {
    run_search(&state, &query).await
}

#[instrument(skip(state))]
async fn run_search(state: &AppState, query: &str) -> ApiResult<Json<Vec<Store>>> {
    let query = query.trim();
    if query.is_empty() {
        return Err(AppError::BadRequest("Empty search query returns empty results.".to_owned()).into());
    }

    let stores = StoreRepository::new(state.pool()).search(query).await?;
    Ok(Json(stores))
}

/// Every store.
pub async fn stores(State(state): State<AppState>) -> ApiResult<Json<Vec<Store>>> {
    Ok(Json(StoreRepository::new(state.pool()).all().await?))
}

/// Stores within the default radius of a point, nearest first.
pub async fn near(
    State(state): State<AppState>,
    Path((lat, lng)): Path<(String, String)>,
) -> ApiResult<Json<Vec<NearbyStore>>> {
    let origin = GeoPoint::parse(&lng, &lat).map_err(|e| AppError::Validation(e.to_string()))?;

    let stores = StoreRepository::new(state.pool())
        .near(origin, DEFAULT_NEAR_RADIUS_METERS, DEFAULT_NEAR_LIMIT)
        .await?;
    Ok(Json(stores))
}

/// Toggle the current user's heart on a store.
#[instrument(skip_all, fields(user_id = %user.id, store_id = %id))]
pub async fn heart(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<StoreId>,
) -> ApiResult<Json<HeartToggle>> {
    let toggled = HeartRepository::new(state.pool()).toggle(user.id, id).await?;
    Ok(Json(toggled))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_query_defaults_to_empty() {
        let query: SearchQuery = serde_urlencoded::from_str("").expect("query");
        assert!(query.q.is_empty());

        let query: SearchQuery = serde_urlencoded::from_str("q=coffee+beans").expect("query");
        assert_eq!(query.q, "coffee beans");
    }
}
