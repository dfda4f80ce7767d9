//! Page REST API Routes

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use folio_core::{Page, PageId};
use folio_storage::PageUpdate;

use crate::access::{load_editable_page, load_page, require_page_visible};
use crate::error::{ApiError, ApiResult};
use crate::extractors::{ApiJson, PathId};
use crate::middleware::AuthExtractor;
use crate::state::{AppState, SharedStore};
use crate::types::UpdatePageRequest;

/// GET /api/pages/{id}/ - Get a page
///
/// Private pages read as 404 for callers who may not see them.
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/api/pages/{id}/",
    tag = "Pages",
    params(("id" = String, Path, description = "Page ID")),
    responses(
        (status = 200, description = "Page details", body = Page),
        (status = 403, description = "Not a member", body = ApiError),
        (status = 404, description = "Page not found or hidden", body = ApiError),
    ),
    security(("bearer_auth" = []))
))]
pub async fn get_page(
    State(store): State<SharedStore>,
    AuthExtractor(auth): AuthExtractor,
    PathId(id): PathId<PageId>,
) -> ApiResult<impl IntoResponse> {
    let page = load_page(&*store, id).await?;
    require_page_visible(&*store, auth.user_id, &page).await?;
    Ok(Json(page))
}

/// PATCH /api/pages/{id}/ - Partially update a page
#[cfg_attr(feature = "openapi", utoipa::path(
    patch,
    path = "/api/pages/{id}/",
    tag = "Pages",
    params(("id" = String, Path, description = "Page ID")),
    request_body = UpdatePageRequest,
    responses(
        (status = 200, description = "Page updated", body = Page),
        (status = 400, description = "Invalid or empty update", body = ApiError),
        (status = 403, description = "Caller may not edit pages", body = ApiError),
        (status = 404, description = "Page not found", body = ApiError),
    ),
    security(("bearer_auth" = []))
))]
pub async fn update_page(
    State(store): State<SharedStore>,
    AuthExtractor(auth): AuthExtractor,
    PathId(id): PathId<PageId>,
    ApiJson(req): ApiJson<UpdatePageRequest>,
) -> ApiResult<impl IntoResponse> {
    let page = load_editable_page(&*store, auth.user_id, id).await?;

    let update = PageUpdate::from(req);
    if update.is_empty() {
        return Err(ApiError::validation_failed(
            "At least one of title, content, category or is_public must be provided",
        ));
    }
    let update = update.validated()?;

    let updated = store.page_update(page.page_id, update).await?;
    tracing::info!(page_id = %updated.page_id, user_id = %auth.user_id, "Page updated");

    Ok(Json(updated))
}

/// DELETE /api/pages/{id}/ - Delete a page
#[cfg_attr(feature = "openapi", utoipa::path(
    delete,
    path = "/api/pages/{id}/",
    tag = "Pages",
    params(("id" = String, Path, description = "Page ID")),
    responses(
        (status = 204, description = "Page deleted"),
        (status = 403, description = "Caller may not edit pages", body = ApiError),
        (status = 404, description = "Page not found", body = ApiError),
    ),
    security(("bearer_auth" = []))
))]
pub async fn delete_page(
    State(store): State<SharedStore>,
    AuthExtractor(auth): AuthExtractor,
    PathId(id): PathId<PageId>,
) -> ApiResult<StatusCode> {
    let page = load_editable_page(&*store, auth.user_id, id).await?;
    store.page_delete(page.page_id).await?;

    tracing::info!(page_id = %page.page_id, user_id = %auth.user_id, "Page deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Create the page routes router.
pub fn create_router() -> Router<AppState> {
    Router::new().route("/:id/", get(get_page).patch(update_page).delete(delete_page))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthContext;
    use crate::error::ErrorCode;
    use folio_test_utils::fixtures::seeded_universe;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_empty_patch_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
        let seeded = seeded_universe().await?;
        let store: SharedStore = Arc::new(seeded.store.clone());

        let err = update_page(
            State(store),
            AuthExtractor(AuthContext::new(seeded.gm)),
            PathId(seeded.public_page.page_id),
            ApiJson(UpdatePageRequest::default()),
        )
        .await
        .err()
        .ok_or("empty patch accepted")?;
        assert_eq!(err.code, ErrorCode::ValidationFailed);
        Ok(())
    }

    #[tokio::test]
    async fn test_blank_title_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
        let seeded = seeded_universe().await?;
        let store: SharedStore = Arc::new(seeded.store.clone());

        let err = update_page(
            State(store),
            AuthExtractor(AuthContext::new(seeded.owner)),
            PathId(seeded.public_page.page_id),
            ApiJson(UpdatePageRequest {
                title: Some("   ".to_string()),
                ..Default::default()
            }),
        )
        .await
        .err()
        .ok_or("blank title accepted")?;
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn test_owner_can_publish_gm_page() -> Result<(), Box<dyn std::error::Error>> {
        let seeded = seeded_universe().await?;
        let store: SharedStore = Arc::new(seeded.store.clone());

        let response = update_page(
            State(store.clone()),
            AuthExtractor(AuthContext::new(seeded.owner)),
            PathId(seeded.private_page.page_id),
            ApiJson(UpdatePageRequest {
                is_public: Some(true),
                ..Default::default()
            }),
        )
        .await?
        .into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let stored = store
            .page_get(seeded.private_page.page_id)
            .await?
            .ok_or("page vanished")?;
        assert!(stored.is_public);
        assert_eq!(stored.title, seeded.private_page.title);
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_then_get_is_not_found() -> Result<(), Box<dyn std::error::Error>> {
        let seeded = seeded_universe().await?;
        let store: SharedStore = Arc::new(seeded.store.clone());
        let id = seeded.public_page.page_id;

        let status = delete_page(
            State(store.clone()),
            AuthExtractor(AuthContext::new(seeded.gm)),
            PathId(id),
        )
        .await?;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let err = get_page(
            State(store),
            AuthExtractor(AuthContext::new(seeded.gm)),
            PathId(id),
        )
        .await
        .err()
        .ok_or("deleted page still readable")?;
        assert_eq!(err.code, ErrorCode::PageNotFound);
        Ok(())
    }
}
