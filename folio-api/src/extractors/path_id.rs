//! Typed entity IDs from path parameters.

use axum::{
    async_trait,
    extract::{FromRequestParts, Path},
    http::request::Parts,
};
use folio_core::EntityIdType;
use uuid::Uuid;

use crate::error::ApiError;

/// Extracts a single `/:id` segment as a specific ID newtype.
///
/// ```rust,ignore
/// async fn get_page(PathId(page_id): PathId<PageId>) -> ApiResult<Json<Page>> { .. }
/// ```
///
/// A segment that is not a UUID rejects with `400 INVALID_FORMAT`.
#[derive(Debug, Clone, Copy)]
pub struct PathId<T: EntityIdType>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for PathId<T>
where
    S: Send + Sync,
    T: EntityIdType,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(uuid): Path<Uuid> = Path::from_request_parts(parts, state)
            .await
            .map_err(|e| {
                ApiError::invalid_format(T::ENTITY_NAME, "UUID").with_details(serde_json::json!({
                    "path": parts.uri.path(),
                    "reason": e.body_text(),
                }))
            })?;

        Ok(PathId(T::new(uuid)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use axum::http::Request;
    use axum::{routing::get, Router};
    use folio_core::PageId;
    use tower::ServiceExt;

    async fn echo(PathId(id): PathId<PageId>) -> String {
        id.to_string()
    }

    fn router() -> Router {
        Router::new().route("/pages/:id", get(echo))
    }

    #[tokio::test]
    async fn test_valid_uuid_extracts() -> Result<(), Box<dyn std::error::Error>> {
        let id = PageId::now_v7();
        let response = router()
            .oneshot(Request::get(format!("/pages/{}", id)).body(axum::body::Body::empty())?)
            .await?;
        assert_eq!(response.status(), 200);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        assert_eq!(std::str::from_utf8(&body)?, id.to_string());
        Ok(())
    }

    #[tokio::test]
    async fn test_malformed_uuid_is_bad_request() -> Result<(), Box<dyn std::error::Error>> {
        let response = router()
            .oneshot(Request::get("/pages/not-a-uuid").body(axum::body::Body::empty())?)
            .await?;
        assert_eq!(response.status(), 400);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let error: ApiError = serde_json::from_slice(&body)?;
        assert_eq!(error.code, ErrorCode::InvalidFormat);
        Ok(())
    }
}
