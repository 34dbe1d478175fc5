//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! # Stores
//! GET  /, /stores, /stores/page/{page} - Paginated store list
//! GET  /store/{slug}                   - Store detail with reviews
//! GET  /tags, /tag/{tag}               - Tag cloud and filtered stores
//! GET  /top                            - Top rated stores
//! GET  /map                            - Map page
//! GET  /hearts                         - Hearted stores (auth)
//! GET  /add                            - New store form (auth)
//! POST /add                            - Create store, multipart (auth)
//! GET  /stores/{id}/edit               - Edit form (owner)
//! POST /add/{id}                       - Update store, multipart (owner)
//! POST /reviews/{id}                   - Add review (auth)
//!
//! # Auth
//! GET  /login, POST /login             - Login form / action (rate limited)
//! GET  /logout                         - Logout
//! GET  /register, POST /register       - Register form / action (rate limited)
//!
//! # Account
//! GET  /account, POST /account         - Account page / update (auth)
//! POST /account/forgot                 - Email a reset link (rate limited)
//! GET  /account/reset/{token}          - Reset form
//! POST /account/reset/{token}          - Set new password
//!
//! # JSON API
//! GET  /api/v1/search?q=, /api/v1/search/{query} - Text search
//! GET  /api/v1/stores                            - Every store
//! GET  /api/v1/stores/near/{lat}/{lng}           - Stores within 10km
//! POST /api/v1/stores/{id}/heart                 - Toggle heart (auth)
//! ```

pub mod account;
pub mod api;
pub mod auth;
pub mod reviews;
pub mod stores;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};

use crate::middleware::auth_rate_limiter;
use crate::state::AppState;

/// Largest accepted store form, photo included.
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Create the store browsing and editing routes.
pub fn store_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(stores::index))
        .route("/stores", get(stores::index))
        .route("/stores/page/{page}", get(stores::page))
        .route("/store/{slug}", get(stores::show))
        .route("/tags", get(stores::tags))
        .route("/tag/{tag}", get(stores::tag))
        .route("/top", get(stores::top))
        .route("/map", get(stores::map))
        .route("/hearts", get(stores::hearts))
        .route("/add", get(stores::add_page).post(stores::create))
        .route("/add/{id}", post(stores::update))
        .route("/stores/{id}/edit", get(stores::edit_page))
        .route("/reviews/{id}", post(reviews::create))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

/// Create the auth and account routes.
///
/// Credential-bearing posts get the per-IP rate limiter.
pub fn auth_routes() -> Router<AppState> {
    let limited = Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        .route("/account/forgot", post(account::forgot))
        .route_layer(auth_rate_limiter());

    Router::new()
        .route("/login", get(auth::login_page))
        .route("/logout", get(auth::logout))
        .route("/register", get(auth::register_page))
        .route("/account", get(account::index).post(account::update))
        .route(
            "/account/reset/{token}",
            get(account::reset_page).post(account::reset),
        )
        .merge(limited)
}

/// Create the JSON API routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/search", get(api::search))
        .route("/search/{query}", get(api::search_path))
        .route("/stores", get(api::stores))
        .route("/stores/near/{lat}/{lng}", get(api::near))
        .route("/stores/{id}/heart", post(api::heart))
}

/// Create all application routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(store_routes())
        .merge(auth_routes())
        .nest("/api/v1", api_routes())
}
