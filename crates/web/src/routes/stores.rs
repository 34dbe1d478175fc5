//! Store browsing and editing handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Multipart, OriginalUri, Path, State},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use delicious_core::{PageRequest, Pagination, StoreId};

use crate::db::{HeartRepository, ReviewRepository, StoreRepository};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::flash;
use crate::middleware::{Layout, RequireAuth};
use crate::models::{Review, Store, StoreInput, TAG_CHOICES, TagCount, TopStore};
use crate::services::PhotoUpload;
use crate::state::AppState;

/// How many stores the top page ranks.
const TOP_STORES_LIMIT: i64 = 10;

/// Map center when the browser doesn't share a location.
const DEFAULT_MAP_LAT: f64 = 37.84;
const DEFAULT_MAP_LNG: f64 = -122.25;

/// Shown when a non-owner tries to edit a store.
pub const OWNER_REQUIRED: &str = "You must own the store in order to edit it.";

// =============================================================================
// Templates
// =============================================================================

/// Paginated store list.
#[derive(Template, WebTemplate)]
#[template(path = "stores/index.html")]
pub struct StoresTemplate {
    pub layout: Layout,
    pub title: String,
    pub stores: Vec<Store>,
    pub pagination: Pagination,
}

/// Store detail page.
#[derive(Template, WebTemplate)]
#[template(path = "stores/show.html")]
pub struct StoreTemplate {
    pub layout: Layout,
    pub title: String,
    pub store: Store,
    pub author_name: String,
    pub reviews: Vec<Review>,
}

/// Tag cloud with the stores for the selected tag.
#[derive(Template, WebTemplate)]
#[template(path = "stores/tags.html")]
pub struct TagsTemplate {
    pub layout: Layout,
    pub title: String,
    pub tags: Vec<TagCount>,
    pub active_tag: Option<String>,
    pub stores: Vec<Store>,
}

impl TagsTemplate {
    fn is_current(&self, tag: &str) -> bool {
        self.active_tag.as_deref() == Some(tag)
    }
}

/// Top rated stores.
#[derive(Template, WebTemplate)]
#[template(path = "stores/top.html")]
pub struct TopTemplate {
    pub layout: Layout,
    pub title: String,
    pub stores: Vec<TopStore>,
}

/// Map page. Results come from the near API.
#[derive(Template, WebTemplate)]
#[template(path = "stores/map.html")]
pub struct MapTemplate {
    pub layout: Layout,
    pub title: String,
    pub default_lat: f64,
    pub default_lng: f64,
}

/// The user's hearted stores.
#[derive(Template, WebTemplate)]
#[template(path = "stores/hearts.html")]
pub struct HeartsTemplate {
    pub layout: Layout,
    pub title: String,
    pub stores: Vec<Store>,
}

/// Field values shown in the store form.
#[derive(Debug, Clone, Default)]
pub struct StoreForm {
    pub name: String,
    pub description: String,
    pub address: String,
    pub lng: String,
    pub lat: String,
    pub tags: Vec<String>,
}

impl From<&Store> for StoreForm {
    fn from(store: &Store) -> Self {
        Self {
            name: store.name.clone(),
            description: store.description.clone().unwrap_or_default(),
            address: store.location.address.clone(),
            lng: store.location.point.lng().to_string(),
            lat: store.location.point.lat().to_string(),
            tags: store.tags.clone(),
        }
    }
}

/// Add and edit form.
#[derive(Template, WebTemplate)]
#[template(path = "stores/edit.html")]
pub struct EditStoreTemplate {
    pub layout: Layout,
    pub title: String,
    /// Where the form posts.
    pub action: String,
    pub form: StoreForm,
    pub photo: Option<String>,
    pub tag_choices: &'static [&'static str],
}

impl EditStoreTemplate {
    fn has_tag(&self, tag: &str) -> bool {
        self.form.tags.iter().any(|t| t == tag)
    }
}

// =============================================================================
// Listing Routes
// =============================================================================

/// First page of the store list.
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    OriginalUri(uri): OriginalUri,
) -> Result<Response> {
    render_page(&state, &session, uri.path(), PageRequest::default()).await
}

/// A numbered page of the store list.
pub async fn page(
    State(state): State<AppState>,
    session: Session,
    OriginalUri(uri): OriginalUri,
    Path(page): Path<String>,
) -> Result<Response> {
    render_page(&state, &session, uri.path(), PageRequest::from_path(&page)).await
}

/// Render one page, redirecting to the last page when past the end.
#[instrument(skip(state, session))]
async fn render_page(
    state: &AppState,
    session: &Session,
    path: &str,
    request: PageRequest,
) -> Result<Response> {
    let page = StoreRepository::new(state.pool()).list(request).await?;

    if let Some(last) = page.pagination.correction(page.stores.len()) {
        flash::info(
            session,
            format!(
                "Sorry, page {} doesn't exist. Sending you to page {last} instead. Godspeed.",
                request.page()
            ),
        )
        .await;
        return Ok(Redirect::to(&format!("/stores/page/{last}")).into_response());
    }

    Ok(StoresTemplate {
        layout: Layout::load(state.pool(), session, path).await,
        title: "Stores".to_owned(),
        stores: page.stores,
        pagination: page.pagination,
    }
    .into_response())
}

/// Store detail page.
#[instrument(skip(state, session, uri))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    OriginalUri(uri): OriginalUri,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse> {
    let detail = StoreRepository::new(state.pool())
        .find_by_slug(&slug)
        .await
        .map_err(|e| match e {
            crate::db::RepositoryError::NotFound => {
                AppError::NotFound(format!("No store called {slug}"))
            }
            other => other.into(),
        })?;
    let reviews = ReviewRepository::new(state.pool())
        .for_store(detail.store.id)
        .await?;

    Ok(StoreTemplate {
        layout: Layout::load(state.pool(), &session, uri.path()).await,
        title: detail.store.name.clone(),
        store: detail.store,
        author_name: detail.author_name,
        reviews,
    })
}

/// Tag cloud with every tagged store.
pub async fn tags(
    State(state): State<AppState>,
    session: Session,
    OriginalUri(uri): OriginalUri,
) -> Result<impl IntoResponse> {
    render_tags(&state, &session, uri.path(), None).await
}

/// Tag cloud with the stores for one tag.
pub async fn tag(
    State(state): State<AppState>,
    session: Session,
    OriginalUri(uri): OriginalUri,
    Path(tag): Path<String>,
) -> Result<impl IntoResponse> {
    render_tags(&state, &session, uri.path(), Some(tag)).await
}

async fn render_tags(
    state: &AppState,
    session: &Session,
    path: &str,
    active_tag: Option<String>,
) -> Result<TagsTemplate> {
    let repo = StoreRepository::new(state.pool());
    let (tags, stores) = tokio::try_join!(repo.tag_counts(), repo.find_by_tag(active_tag.as_deref()))?;

    Ok(TagsTemplate {
        layout: Layout::load(state.pool(), session, path).await,
        title: active_tag.clone().unwrap_or_else(|| "Tags".to_owned()),
        tags,
        active_tag,
        stores,
    })
}

/// Top rated stores.
pub async fn top(
    State(state): State<AppState>,
    session: Session,
    OriginalUri(uri): OriginalUri,
) -> Result<impl IntoResponse> {
    let stores = StoreRepository::new(state.pool())
        .top_rated(TOP_STORES_LIMIT)
        .await?;

    Ok(TopTemplate {
        layout: Layout::load(state.pool(), &session, uri.path()).await,
        title: "Top Stores!".to_owned(),
        stores,
    })
}

/// Map page.
pub async fn map(layout: Layout) -> impl IntoResponse {
    MapTemplate {
        layout,
        title: "Map".to_owned(),
        default_lat: DEFAULT_MAP_LAT,
        default_lng: DEFAULT_MAP_LNG,
    }
}

/// The logged-in user's hearted stores.
pub async fn hearts(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    OriginalUri(uri): OriginalUri,
) -> Result<impl IntoResponse> {
    let hearted = HeartRepository::new(state.pool()).for_user(user.id).await?;
    let stores = StoreRepository::new(state.pool())
        .find_by_ids(&hearted)
        .await?;

    Ok(HeartsTemplate {
        layout: Layout::load(state.pool(), &session, uri.path()).await,
        title: "Hearted Stores".to_owned(),
        stores,
    })
}

// =============================================================================
// Editing Routes
// =============================================================================

/// Blank store form.
pub async fn add_page(RequireAuth(_user): RequireAuth, layout: Layout) -> impl IntoResponse {
    EditStoreTemplate {
        layout,
        title: "Add Store".to_owned(),
        action: "/add".to_owned(),
        form: StoreForm::default(),
        photo: None,
        tag_choices: TAG_CHOICES,
    }
}

/// Create a store from the multipart form.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    multipart: Multipart,
) -> Result<Response> {
    let (input, upload) = read_store_form(multipart).await?;

    let draft = match input.validate() {
        Ok(draft) => draft,
        Err(e) => return Ok(back_with_error(&session, e.to_string(), "/add").await),
    };

    let photo = match ingest_photo(&state, upload).await? {
        Ok(photo) => photo,
        Err(message) => return Ok(back_with_error(&session, message, "/add").await),
    };

    let store = StoreRepository::new(state.pool())
        .create(&draft.with_photo(photo), user.id)
        .await?;

    add_breadcrumb("store", "Created store", Some(&[("slug", store.slug.as_str())]));
    flash::success(
        &session,
        format!(
            "Successfully created {}. Care to leave a review?",
            store.name
        ),
    )
    .await;
    Ok(Redirect::to(&format!("/store/{}", store.slug)).into_response())
}

/// Edit form, for the store's author only.
pub async fn edit_page(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<StoreId>,
) -> Result<Response> {
    let store = StoreRepository::new(state.pool()).find_by_id(id).await?;

    if !store.is_owned_by(user.id) {
        return Ok(back_with_error(&session, OWNER_REQUIRED, &format!("/store/{}", store.slug)).await);
    }

    Ok(EditStoreTemplate {
        layout: Layout::load(state.pool(), &session, uri.path()).await,
        title: format!("Edit {}", store.name),
        action: format!("/add/{id}"),
        form: StoreForm::from(&store),
        photo: store.photo,
        tag_choices: TAG_CHOICES,
    }
    .into_response())
}

/// Update a store from the multipart form.
#[instrument(skip_all, fields(user_id = %user.id, store_id = %id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    Path(id): Path<StoreId>,
    multipart: Multipart,
) -> Result<Response> {
    let repo = StoreRepository::new(state.pool());
    let edit_url = format!("/stores/{id}/edit");

    // Checked before the photo is written so a rejected edit leaves no file behind
    let existing = repo.find_by_id(id).await?;
    if !existing.is_owned_by(user.id) {
        return Ok(back_with_error(&session, OWNER_REQUIRED, &format!("/store/{}", existing.slug)).await);
    }

    let (input, upload) = read_store_form(multipart).await?;

    let draft = match input.validate() {
        Ok(draft) => draft,
        Err(e) => return Ok(back_with_error(&session, e.to_string(), &edit_url).await),
    };

    let photo = match ingest_photo(&state, upload).await? {
        Ok(photo) => photo,
        Err(message) => return Ok(back_with_error(&session, message, &edit_url).await),
    };

    let store = repo.update(id, user.id, &draft.with_photo(photo)).await?;

    flash::success_with_link(
        &session,
        format!("Successfully updated {}.", store.name),
        format!("/store/{}", store.slug),
        "View Store",
    )
    .await;
    Ok(Redirect::to(&edit_url).into_response())
}

// =============================================================================
// Helpers
// =============================================================================

/// Flash an error and redirect.
pub(crate) async fn back_with_error(session: &Session, message: impl Into<String>, to: &str) -> Response {
    flash::error(session, message).await;
    Redirect::to(to).into_response()
}

/// Run the photo pipeline, splitting user-facing rejections from failures.
///
/// The outer `Result` carries server errors; the inner `Err` is a message to
/// flash back to the form.
async fn ingest_photo(
    state: &AppState,
    upload: Option<PhotoUpload>,
) -> Result<std::result::Result<Option<String>, String>> {
    match state.photos().ingest(upload).await {
        Ok(photo) => Ok(Ok(photo)),
        Err(e) => match AppError::from(e) {
            AppError::UnsupportedMediaType(message) => Ok(Err(message)),
            other => Err(other),
        },
    }
}

/// Split the multipart store form into text fields and the photo part.
async fn read_store_form(mut multipart: Multipart) -> Result<(StoreInput, Option<PhotoUpload>)> {
    let mut input = StoreInput::default();
    let mut photo = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid form: {e}")))?
    {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };

        if name == "photo" {
            let content_type = field.content_type().unwrap_or_default().to_owned();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(format!("Invalid photo upload: {e}")))?;
            photo = Some(PhotoUpload {
                content_type,
                bytes: bytes.to_vec(),
            });
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| AppError::BadRequest(format!("Invalid form field {name}: {e}")))?;

        match name.as_str() {
            "name" => input.name = value,
            "description" => input.description = value,
            "tags" => input.tags.push(value),
            "address" => input.address = value,
            "lng" => input.lng = value,
            "lat" => input.lat = value,
            _ => {}
        }
    }

    Ok((input, photo))
}
