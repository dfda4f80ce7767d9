//! OpenAPI Specification for the FOLIO API
//!
//! Built by utoipa from the route annotations and schema derives.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::error::{ApiError, ErrorCode};
use crate::routes::{dev_auth, health, import, me, page, universe, world};
use crate::telemetry::metrics;
use crate::types::*;

use folio_core::{Membership, Page, Role, Universe, World};

/// OpenAPI document for the FOLIO API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "FOLIO API",
        version = "0.1.0",
        description = "Multi-tenant campaign wiki: universes, worlds and pages with role-based access"
    ),
    servers(
        (url = "http://localhost:3000", description = "Local Development")
    ),
    tags(
        (name = "Universes", description = "Tenants and their memberships"),
        (name = "Worlds", description = "Campaign settings inside a universe"),
        (name = "Pages", description = "Wiki pages, listing and .docx import"),
        (name = "Users", description = "The authenticated caller"),
        (name = "Auth", description = "Development token minting"),
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Observability", description = "Prometheus metrics"),
    ),
    paths(
        universe::create_universe,
        universe::list_universes,
        universe::get_universe,
        universe::list_members,
        universe::invite_member,
        universe::list_worlds,
        universe::create_world,
        world::get_world,
        world::list_pages,
        world::create_page,
        import::import_docx,
        page::get_page,
        page::update_page,
        page::delete_page,
        me::get_me,
        dev_auth::generate_dev_token,
        health::ping,
        health::liveness,
        health::readiness,
        metrics::metrics_handler,
    ),
    components(schemas(
        ApiError,
        ErrorCode,
        Role,
        Universe,
        Membership,
        World,
        Page,
        CreateUniverseRequest,
        UniverseResponse,
        ListUniversesResponse,
        ListMembersResponse,
        InviteMemberRequest,
        CreateWorldRequest,
        WorldResponse,
        ListWorldsResponse,
        CreatePageRequest,
        UpdatePageRequest,
        ImportDocxForm,
        ListPagesResponse,
        MeResponse,
        DevTokenRequest,
        DevTokenResponse,
        health::HealthResponse,
        health::HealthStatus,
        health::HealthDetails,
        health::ComponentHealth,
    )),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Adds the `bearer_auth` scheme referenced by the protected routes.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("HS256 JWT with the user id in `sub`"))
                        .build(),
                ),
            );
        }
    }
}

impl ApiDoc {
    /// Generate the OpenAPI document as pretty JSON.
    pub fn to_json() -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Self::openapi())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_generation() -> Result<(), String> {
        let openapi = ApiDoc::openapi();
        assert_eq!(openapi.info.title, "FOLIO API");

        let tags = openapi
            .tags
            .as_ref()
            .ok_or_else(|| "OpenAPI tags missing".to_string())?;
        assert_eq!(tags.len(), 7);

        let components = openapi
            .components
            .as_ref()
            .ok_or_else(|| "OpenAPI components missing".to_string())?;
        assert!(components.security_schemes.contains_key("bearer_auth"));
        assert!(components.schemas.contains_key("Page"));
        assert!(components.schemas.contains_key("ApiError"));
        Ok(())
    }

    #[test]
    fn test_openapi_paths_exist() {
        let openapi = ApiDoc::openapi();
        for path in [
            "/api/universes/",
            "/api/universes/{id}/",
            "/api/universes/{id}/members/",
            "/api/universes/{id}/invite/",
            "/api/universes/{id}/worlds/",
            "/api/worlds/{id}/",
            "/api/worlds/{id}/pages/",
            "/api/worlds/{id}/import-docx/",
            "/api/pages/{id}/",
            "/api/me/",
            "/auth/dev/token",
            "/health/ready",
            "/metrics",
        ] {
            assert!(openapi.paths.paths.contains_key(path), "missing {}", path);
        }
    }

    #[test]
    fn test_openapi_json_serialization() -> Result<(), String> {
        let json = ApiDoc::to_json().map_err(|e| format!("Failed to serialize OpenAPI: {}", e))?;
        let value: serde_json::Value =
            serde_json::from_str(&json).map_err(|e| format!("Generated JSON invalid: {}", e))?;
        assert!(value["paths"]["/api/pages/{id}/"]["patch"].is_object());
        assert!(json.contains("\"bearer_auth\""));
        Ok(())
    }
}
