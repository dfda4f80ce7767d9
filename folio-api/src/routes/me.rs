//! Current-user route.

use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};

use crate::error::{ApiError, ApiResult};
use crate::middleware::AuthExtractor;
use crate::state::{AppState, SharedStore};
use crate::types::MeResponse;

/// GET /api/me/ - The caller's id and memberships
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/api/me/",
    tag = "Users",
    responses(
        (status = 200, description = "Current user", body = MeResponse),
        (status = 401, description = "Unauthorized", body = ApiError),
    ),
    security(("bearer_auth" = []))
))]
pub async fn get_me(
    State(store): State<SharedStore>,
    AuthExtractor(auth): AuthExtractor,
) -> ApiResult<impl IntoResponse> {
    let memberships = store.memberships_for_user(auth.user_id).await?;
    Ok(Json(MeResponse {
        user_id: auth.user_id,
        display_name: auth.display_name,
        memberships,
    }))
}

pub fn create_router() -> Router<AppState> {
    Router::new().route("/", get(get_me))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthContext;
    use folio_core::{EntityIdType, UserId};
    use folio_test_utils::fixtures::seeded_universe;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_me_lists_memberships() -> Result<(), Box<dyn std::error::Error>> {
        let seeded = seeded_universe().await?;
        let store: SharedStore = Arc::new(seeded.store.clone());

        let response = get_me(
            State(store.clone()),
            AuthExtractor(AuthContext {
                user_id: seeded.gm,
                display_name: Some("Dungeon Master".to_string()),
            }),
        )
        .await?
        .into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let me: MeResponse = serde_json::from_slice(&bytes)?;
        assert_eq!(me.user_id, seeded.gm);
        assert_eq!(me.display_name.as_deref(), Some("Dungeon Master"));
        assert_eq!(me.memberships.len(), 1);
        assert_eq!(me.memberships[0].universe_id, seeded.universe.universe_id);

        let response = get_me(State(store), AuthExtractor(AuthContext::new(UserId::now_v7())))
            .await?
            .into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        let stranger: MeResponse = serde_json::from_slice(&bytes)?;
        assert!(stranger.memberships.is_empty());
        Ok(())
    }
}
