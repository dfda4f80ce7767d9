//! Development Authentication Endpoint
//!
//! POST /auth/dev/token mints a bearer token for local testing. It is
//! refused with 403 when FOLIO_ENVIRONMENT is "production" or "prod".

use axum::{extract::State, response::IntoResponse, routing::post, Json, Router};
use std::sync::Arc;

use crate::auth::{derive_user_id, generate_jwt_token, AuthConfig};
use crate::config::is_production_environment;
use crate::error::{ApiError, ApiResult};
use crate::extractors::ApiJson;
use crate::state::AppState;
use crate::types::{DevTokenRequest, DevTokenResponse};

const DEFAULT_DEV_NAME: &str = "Dev User";

/// POST /auth/dev/token - Generate a development token
///
/// Uses `user_id` when given, otherwise a stable id derived from `name`.
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/auth/dev/token",
    tag = "Auth",
    request_body = DevTokenRequest,
    responses(
        (status = 200, description = "Token issued", body = DevTokenResponse),
        (status = 403, description = "Disabled in production", body = ApiError),
    ),
))]
pub async fn generate_dev_token(
    State(auth_config): State<Arc<AuthConfig>>,
    ApiJson(request): ApiJson<DevTokenRequest>,
) -> ApiResult<impl IntoResponse> {
    if is_production_environment() {
        return Err(ApiError::forbidden(
            "Dev authentication is disabled in production",
        ));
    }

    let name = request
        .name
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_DEV_NAME.to_string());
    let user_id = request.user_id.unwrap_or_else(|| derive_user_id(&name));

    let token = generate_jwt_token(&auth_config, user_id, Some(name.clone()))?;

    tracing::info!(user_id = %user_id, name = %name, "Generated dev token");

    Ok(Json(DevTokenResponse {
        access_token: token,
        token_type: "Bearer".to_string(),
        expires_in: auth_config.jwt_expiration_secs,
        user_id,
    }))
}

pub fn create_router() -> Router<AppState> {
    if !is_production_environment() {
        tracing::warn!(
            "Dev auth enabled - set FOLIO_ENVIRONMENT=production to disable"
        );
    }
    Router::new().route("/token", post(generate_dev_token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::validate_jwt_token;
    use crate::error::ErrorCode;
    use crate::test_env::{EnvVarGuard, ENV_MUTEX};
    use folio_core::{EntityIdType, UserId};

    async fn mint(
        config: Arc<AuthConfig>,
        request: DevTokenRequest,
    ) -> ApiResult<DevTokenResponse> {
        let response = generate_dev_token(State(config), ApiJson(request))
            .await?
            .into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .map_err(|e| ApiError::internal_error(e.to_string()))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    #[tokio::test]
    async fn test_dev_token_for_explicit_user() -> Result<(), Box<dyn std::error::Error>> {
        let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        let _env = EnvVarGuard::set("FOLIO_ENVIRONMENT", None);
        let config = Arc::new(AuthConfig::default());
        let user = UserId::now_v7();

        let response = mint(
            config.clone(),
            DevTokenRequest {
                user_id: Some(user),
                name: Some("Keeper".to_string()),
            },
        )
        .await?;
        assert_eq!(response.user_id, user);
        assert_eq!(response.token_type, "Bearer");

        let claims = validate_jwt_token(&config, &response.access_token)?;
        assert_eq!(claims.user_id()?, user);
        assert_eq!(claims.name.as_deref(), Some("Keeper"));
        Ok(())
    }

    #[tokio::test]
    async fn test_dev_token_derives_stable_id() -> Result<(), Box<dyn std::error::Error>> {
        let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        let _env = EnvVarGuard::set("FOLIO_ENVIRONMENT", Some("development"));
        let config = Arc::new(AuthConfig::default());

        let first = mint(config.clone(), DevTokenRequest::default()).await?;
        let second = mint(config, DevTokenRequest::default()).await?;
        assert_eq!(first.user_id, second.user_id);
        assert_eq!(first.user_id, derive_user_id(DEFAULT_DEV_NAME));
        Ok(())
    }

    #[tokio::test]
    async fn test_dev_token_refused_in_production() -> Result<(), Box<dyn std::error::Error>> {
        let _lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        let _env = EnvVarGuard::set("FOLIO_ENVIRONMENT", Some("prod"));

        let err = mint(Arc::new(AuthConfig::default()), DevTokenRequest::default())
            .await
            .err()
            .ok_or("token minted in production")?;
        assert_eq!(err.code, ErrorCode::Forbidden);
        Ok(())
    }
}
