//! World REST API Routes
//!
//! World detail plus the page collection of a world.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use folio_core::{Action, Page, WorldId};
use folio_storage::PageFilter;

use crate::access::{load_world, require};
use crate::error::{ApiError, ApiResult};
use crate::extractors::{ApiJson, ApiQuery, PathId};
use crate::middleware::AuthExtractor;
use crate::state::{AppState, SharedStore};
use crate::types::{CreatePageRequest, ListPagesQuery, ListPagesResponse, WorldResponse};

/// GET /api/worlds/{id}/ - World detail with the caller's role
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/api/worlds/{id}/",
    tag = "Worlds",
    params(("id" = String, Path, description = "World ID")),
    responses(
        (status = 200, description = "World details", body = WorldResponse),
        (status = 403, description = "Not a member", body = ApiError),
        (status = 404, description = "World not found", body = ApiError),
    ),
    security(("bearer_auth" = []))
))]
pub async fn get_world(
    State(store): State<SharedStore>,
    AuthExtractor(auth): AuthExtractor,
    PathId(id): PathId<WorldId>,
) -> ApiResult<impl IntoResponse> {
    let world = load_world(&*store, id).await?;
    let role = require(&*store, auth.user_id, &world, Action::View).await?;
    Ok(Json(WorldResponse { world, role }))
}

/// GET /api/worlds/{id}/pages/ - List pages visible to the caller
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/api/worlds/{id}/pages/",
    tag = "Pages",
    params(("id" = String, Path, description = "World ID"), ListPagesQuery),
    responses(
        (status = 200, description = "Pages of the world", body = ListPagesResponse),
        (status = 400, description = "Invalid query", body = ApiError),
        (status = 403, description = "Not a member", body = ApiError),
        (status = 404, description = "World not found", body = ApiError),
    ),
    security(("bearer_auth" = []))
))]
pub async fn list_pages(
    State(store): State<SharedStore>,
    AuthExtractor(auth): AuthExtractor,
    PathId(id): PathId<WorldId>,
    ApiQuery(query): ApiQuery<ListPagesQuery>,
) -> ApiResult<impl IntoResponse> {
    let world = load_world(&*store, id).await?;
    let role = require(&*store, auth.user_id, &world, Action::View).await?;

    let filter = PageFilter {
        category: query.category,
        title_contains: query.q,
        include_private: role.allows(Action::ViewPrivatePages),
        limit: PageFilter::clamp_limit(query.limit),
        offset: query.offset.unwrap_or(0),
    };

    let (pages, total) = store.page_list(world.world_id, &filter).await?;
    Ok(Json(ListPagesResponse { pages, total }))
}

/// POST /api/worlds/{id}/pages/ - Create a page authored by the caller
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/api/worlds/{id}/pages/",
    tag = "Pages",
    params(("id" = String, Path, description = "World ID")),
    request_body = CreatePageRequest,
    responses(
        (status = 201, description = "Page created", body = Page),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 403, description = "Caller may not edit pages", body = ApiError),
        (status = 404, description = "World not found", body = ApiError),
    ),
    security(("bearer_auth" = []))
))]
pub async fn create_page(
    State(store): State<SharedStore>,
    AuthExtractor(auth): AuthExtractor,
    PathId(id): PathId<WorldId>,
    ApiJson(req): ApiJson<CreatePageRequest>,
) -> ApiResult<impl IntoResponse> {
    let world = load_world(&*store, id).await?;
    require(&*store, auth.user_id, &world, Action::EditPages).await?;

    let page = Page::new(
        world.world_id,
        req.title,
        req.content,
        req.category,
        auth.user_id,
        req.is_public.unwrap_or(false),
    )?;
    store.page_create(&page).await?;

    tracing::info!(page_id = %page.page_id, world_id = %world.world_id, "Page created");

    Ok((StatusCode::CREATED, Json(page)))
}

/// Create the world routes router.
///
/// `import_max_bytes` bounds the `.docx` upload route.
pub fn create_router(import_max_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/:id/", get(get_world))
        .route("/:id/pages/", get(list_pages).post(create_page))
        .merge(super::import::create_router(import_max_bytes))
}
