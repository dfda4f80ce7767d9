//! JSON body and query-string extractors with API-shaped rejections.
//!
//! Axum's stock `Json` and `Query` reject with plain-text bodies (and `422`
//! for JSON data errors). These wrappers keep every client-visible failure
//! on the `ApiError` JSON payload with a `400`.

use axum::{
    async_trait,
    extract::{rejection::JsonRejection, FromRequest, FromRequestParts, Query, Request},
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// `Json<T>` that rejects with `400 INVALID_INPUT`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(json_rejection(rejection)),
        }
    }
}

fn json_rejection(rejection: JsonRejection) -> ApiError {
    let message = match &rejection {
        JsonRejection::MissingJsonContentType(_) => {
            "Expected request with `Content-Type: application/json`".to_string()
        }
        _ => format!("Invalid JSON body: {}", rejection.body_text()),
    };
    ApiError::invalid_input(message)
}

/// `Query<T>` that rejects with `400 INVALID_INPUT`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::invalid_input(format!("Invalid query string: {}", e.body_text())))?;
        Ok(ApiQuery(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use axum::body::Body;
    use axum::http::{header, Request as HttpRequest};
    use axum::{routing::post, Router};
    use serde::Deserialize;
    use tower::ServiceExt;

    #[derive(Deserialize)]
    struct Named {
        name: String,
    }

    #[derive(Deserialize)]
    struct Paging {
        limit: Option<usize>,
    }

    async fn create(ApiJson(body): ApiJson<Named>) -> String {
        body.name
    }

    async fn list(ApiQuery(query): ApiQuery<Paging>) -> String {
        query.limit.unwrap_or_default().to_string()
    }

    fn router() -> Router {
        Router::new().route("/", post(create).get(list))
    }

    async fn error_of(response: axum::response::Response) -> Result<ApiError, Box<dyn std::error::Error>> {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    #[tokio::test]
    async fn test_wrong_json_shape_is_bad_request() -> Result<(), Box<dyn std::error::Error>> {
        let response = router()
            .oneshot(
                HttpRequest::post("/")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"title":"x"}"#))?,
            )
            .await?;
        assert_eq!(response.status(), 400);
        assert_eq!(error_of(response).await?.code, ErrorCode::InvalidInput);
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_content_type_is_bad_request() -> Result<(), Box<dyn std::error::Error>> {
        let response = router()
            .oneshot(HttpRequest::post("/").body(Body::from(r#"{"name":"x"}"#))?)
            .await?;
        assert_eq!(response.status(), 400);
        Ok(())
    }

    #[tokio::test]
    async fn test_bad_query_is_bad_request() -> Result<(), Box<dyn std::error::Error>> {
        let response = router()
            .oneshot(HttpRequest::get("/?limit=lots").body(Body::empty())?)
            .await?;
        assert_eq!(response.status(), 400);
        assert_eq!(error_of(response).await?.code, ErrorCode::InvalidInput);
        Ok(())
    }
}
