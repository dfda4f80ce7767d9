//! Universe REST API Routes
//!
//! Tenant creation and listing, membership listing and invitations, and the
//! worlds nested under a universe.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use folio_core::{Action, Membership, ParentRef, Role, Universe, UniverseId, World};
use std::collections::HashMap;

use crate::access::{load_universe, require, require_in};
use crate::error::{ApiError, ApiResult};
use crate::extractors::{ApiJson, PathId};
use crate::middleware::AuthExtractor;
use crate::state::{AppState, SharedStore};
use crate::types::{
    CreateUniverseRequest, CreateWorldRequest, InviteMemberRequest, ListMembersResponse,
    ListUniversesResponse, ListWorldsResponse, UniverseResponse,
};

// ============================================================================
// ROUTE HANDLERS
// ============================================================================

/// POST /api/universes/ - Create a universe owned by the caller
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/api/universes/",
    tag = "Universes",
    request_body = CreateUniverseRequest,
    responses(
        (status = 201, description = "Universe created", body = UniverseResponse),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 401, description = "Unauthorized", body = ApiError),
    ),
    security(("bearer_auth" = []))
))]
pub async fn create_universe(
    State(store): State<SharedStore>,
    AuthExtractor(auth): AuthExtractor,
    ApiJson(req): ApiJson<CreateUniverseRequest>,
) -> ApiResult<impl IntoResponse> {
    let universe = Universe::new(req.name, req.description, auth.user_id)?;
    let owner = Membership::new(universe.universe_id, auth.user_id, Role::Owner);
    store.universe_create(&universe, &owner).await?;

    tracing::info!(
        universe_id = %universe.universe_id,
        user_id = %auth.user_id,
        "Universe created"
    );

    Ok((
        StatusCode::CREATED,
        Json(UniverseResponse {
            universe,
            role: Role::Owner,
        }),
    ))
}

/// GET /api/universes/ - List the caller's universes with their roles
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/api/universes/",
    tag = "Universes",
    responses(
        (status = 200, description = "Universes the caller belongs to", body = ListUniversesResponse),
        (status = 401, description = "Unauthorized", body = ApiError),
    ),
    security(("bearer_auth" = []))
))]
pub async fn list_universes(
    State(store): State<SharedStore>,
    AuthExtractor(auth): AuthExtractor,
) -> ApiResult<impl IntoResponse> {
    let roles: HashMap<UniverseId, Role> = store
        .memberships_for_user(auth.user_id)
        .await?
        .into_iter()
        .map(|m| (m.universe_id, m.role))
        .collect();

    let universes = store
        .universe_list_for_user(auth.user_id)
        .await?
        .into_iter()
        .filter_map(|universe| {
            roles
                .get(&universe.universe_id)
                .map(|&role| UniverseResponse { universe, role })
        })
        .collect();

    Ok(Json(ListUniversesResponse { universes }))
}

/// GET /api/universes/{id}/ - Universe detail with the caller's role
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/api/universes/{id}/",
    tag = "Universes",
    params(("id" = String, Path, description = "Universe ID")),
    responses(
        (status = 200, description = "Universe details", body = UniverseResponse),
        (status = 403, description = "Not a member", body = ApiError),
        (status = 404, description = "Universe not found", body = ApiError),
    ),
    security(("bearer_auth" = []))
))]
pub async fn get_universe(
    State(store): State<SharedStore>,
    AuthExtractor(auth): AuthExtractor,
    PathId(id): PathId<UniverseId>,
) -> ApiResult<impl IntoResponse> {
    let universe = load_universe(&*store, id).await?;
    let role = require(&*store, auth.user_id, &universe, Action::View).await?;
    Ok(Json(UniverseResponse { universe, role }))
}

/// GET /api/universes/{id}/members/ - List memberships
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/api/universes/{id}/members/",
    tag = "Universes",
    params(("id" = String, Path, description = "Universe ID")),
    responses(
        (status = 200, description = "Members of the universe", body = ListMembersResponse),
        (status = 403, description = "Not a member", body = ApiError),
        (status = 404, description = "Universe not found", body = ApiError),
    ),
    security(("bearer_auth" = []))
))]
pub async fn list_members(
    State(store): State<SharedStore>,
    AuthExtractor(auth): AuthExtractor,
    PathId(id): PathId<UniverseId>,
) -> ApiResult<impl IntoResponse> {
    let universe = load_universe(&*store, id).await?;
    require(&*store, auth.user_id, &universe, Action::View).await?;

    let members = store.membership_list(universe.universe_id).await?;
    Ok(Json(ListMembersResponse { members }))
}

/// POST /api/universes/{id}/invite/ - Add a member
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/api/universes/{id}/invite/",
    tag = "Universes",
    params(("id" = String, Path, description = "Universe ID")),
    request_body = InviteMemberRequest,
    responses(
        (status = 201, description = "Member added", body = Membership),
        (status = 400, description = "Invalid request", body = ApiError),
        (status = 403, description = "Caller may not invite", body = ApiError),
        (status = 404, description = "Universe not found", body = ApiError),
        (status = 409, description = "User is already a member", body = ApiError),
    ),
    security(("bearer_auth" = []))
))]
pub async fn invite_member(
    State(store): State<SharedStore>,
    AuthExtractor(auth): AuthExtractor,
    PathId(id): PathId<UniverseId>,
    ApiJson(req): ApiJson<InviteMemberRequest>,
) -> ApiResult<impl IntoResponse> {
    let universe = load_universe(&*store, id).await?;
    require(&*store, auth.user_id, &universe, Action::Invite).await?;

    let membership = Membership::new(universe.universe_id, req.user_id, req.role);
    store.membership_add(&membership).await?;

    tracing::info!(
        universe_id = %universe.universe_id,
        invited = %req.user_id,
        role = %req.role,
        "Member invited"
    );

    Ok((StatusCode::CREATED, Json(membership)))
}

/// GET /api/universes/{id}/worlds/ - List worlds
#[cfg_attr(feature = "openapi", utoipa::path(
    get,
    path = "/api/universes/{id}/worlds/",
    tag = "Worlds",
    params(("id" = String, Path, description = "Universe ID")),
    responses(
        (status = 200, description = "Worlds of the universe", body = ListWorldsResponse),
        (status = 403, description = "Not a member", body = ApiError),
        (status = 404, description = "Universe not found", body = ApiError),
    ),
    security(("bearer_auth" = []))
))]
pub async fn list_worlds(
    State(store): State<SharedStore>,
    AuthExtractor(auth): AuthExtractor,
    PathId(id): PathId<UniverseId>,
) -> ApiResult<impl IntoResponse> {
    let universe = load_universe(&*store, id).await?;
    require(&*store, auth.user_id, &universe, Action::View).await?;

    let worlds = store.world_list(universe.universe_id).await?;
    Ok(Json(ListWorldsResponse { worlds }))
}

/// POST /api/universes/{id}/worlds/ - Create a world
#[cfg_attr(feature = "openapi", utoipa::path(
    post,
    path = "/api/universes/{id}/worlds/",
    tag = "Worlds",
    params(("id" = String, Path, description = "Universe ID")),
    request_body = CreateWorldRequest,
    responses(
        (status = 201, description = "World created", body = World),
        (status = 400, description = "Invalid request or primary GM", body = ApiError),
        (status = 403, description = "Caller may not create worlds", body = ApiError),
        (status = 404, description = "Universe not found", body = ApiError),
    ),
    security(("bearer_auth" = []))
))]
pub async fn create_world(
    State(store): State<SharedStore>,
    AuthExtractor(auth): AuthExtractor,
    PathId(id): PathId<UniverseId>,
    ApiJson(req): ApiJson<CreateWorldRequest>,
) -> ApiResult<impl IntoResponse> {
    let universe = load_universe(&*store, id).await?;
    require_in(
        &*store,
        auth.user_id,
        ParentRef::Universe(universe.universe_id),
        Action::CreateWorld,
    )
    .await?;

    if let Some(gm) = req.primary_gm {
        let eligible = store
            .membership_get(universe.universe_id, gm)
            .await?
            .is_some_and(|m| m.role.can_run_games());
        if !eligible {
            return Err(ApiError::validation_failed(format!(
                "primary_gm {} must be an owner or gm of this universe",
                gm
            )));
        }
    }

    let world = World::new(
        universe.universe_id,
        req.name,
        req.description,
        req.ruleset,
        req.primary_gm,
    )?;
    store.world_create(&world).await?;

    tracing::info!(
        world_id = %world.world_id,
        universe_id = %universe.universe_id,
        "World created"
    );

    Ok((StatusCode::CREATED, Json(world)))
}

// ============================================================================
// ROUTER SETUP
// ============================================================================

/// Create the universe routes router.
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_universe).get(list_universes))
        .route("/:id/", get(get_universe))
        .route("/:id/members/", get(list_members))
        .route("/:id/invite/", post(invite_member))
        .route("/:id/worlds/", get(list_worlds).post(create_world))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthContext;
    use crate::error::ErrorCode;
    use axum::response::Response;
    use folio_core::{EntityIdType, UserId};
    use folio_test_utils::fixtures::seeded_universe;
    use std::sync::Arc;

    async fn body_json(response: Response) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    #[tokio::test]
    async fn test_create_universe_makes_caller_owner() -> Result<(), Box<dyn std::error::Error>> {
        let store: SharedStore = Arc::new(folio_storage::InMemoryStore::new());
        let user = UserId::now_v7();

        let response = create_universe(
            State(store.clone()),
            AuthExtractor(AuthContext::new(user)),
            ApiJson(CreateUniverseRequest {
                name: "  Eberron ".to_string(),
                description: None,
            }),
        )
        .await?
        .into_response();

        assert_eq!(response.status(), StatusCode::CREATED);
        let json = body_json(response).await?;
        assert_eq!(json["name"], "Eberron");
        assert_eq!(json["role"], "owner");

        let memberships = store.memberships_for_user(user).await?;
        assert_eq!(memberships.len(), 1);
        assert_eq!(memberships[0].role, Role::Owner);
        Ok(())
    }

    #[tokio::test]
    async fn test_create_world_rejects_viewer_as_primary_gm() -> Result<(), Box<dyn std::error::Error>> {
        let seeded = seeded_universe().await?;
        let store: SharedStore = Arc::new(seeded.store.clone());

        let err = create_world(
            State(store),
            AuthExtractor(AuthContext::new(seeded.owner)),
            PathId(seeded.universe.universe_id),
            ApiJson(CreateWorldRequest {
                name: "Xen'drik".to_string(),
                description: None,
                ruleset: "D&D 5e".to_string(),
                primary_gm: Some(seeded.viewer),
            }),
        )
        .await
        .err()
        .ok_or("viewer accepted as primary gm")?;

        assert_eq!(err.code, ErrorCode::ValidationFailed);
        Ok(())
    }

    #[tokio::test]
    async fn test_gm_cannot_invite() -> Result<(), Box<dyn std::error::Error>> {
        let seeded = seeded_universe().await?;
        let store: SharedStore = Arc::new(seeded.store.clone());

        let err = invite_member(
            State(store),
            AuthExtractor(AuthContext::new(seeded.gm)),
            PathId(seeded.universe.universe_id),
            ApiJson(InviteMemberRequest {
                user_id: UserId::now_v7(),
                role: Role::Viewer,
            }),
        )
        .await
        .err()
        .ok_or("gm was allowed to invite")?;

        assert_eq!(err.code, ErrorCode::Forbidden);
        Ok(())
    }
}
