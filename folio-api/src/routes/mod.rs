//! REST API Routes Module
//!
//! Route handlers grouped by resource, plus the builder that assembles
//! them behind authentication, rate limiting, observability and CORS.

pub mod dev_auth;
pub mod health;
pub mod import;
pub mod me;
pub mod page;
pub mod universe;
pub mod world;

use std::time::Duration;

use axum::{
    http::{header, header::HeaderName, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::{is_production_environment, ApiConfig};
use crate::error::ApiResult;
use crate::middleware::{auth_middleware, rate_limit_middleware, AuthMiddlewareState, RateLimitState};
use crate::state::AppState;
use crate::telemetry::{metrics_handler, observability_middleware};

pub use universe::create_router as universe_router;
pub use world::create_router as world_router;
pub use page::create_router as page_router;
pub use me::create_router as me_router;
pub use health::create_router as health_router;
pub use dev_auth::create_router as dev_auth_router;

/// Prefix of every authenticated route.
pub const API_PREFIX: &str = "/api";

// ============================================================================
// OPENAPI ENDPOINT
// ============================================================================

#[cfg(feature = "openapi")]
async fn openapi_json() -> impl axum::response::IntoResponse {
    use utoipa::OpenApi;
    axum::Json(crate::openapi::ApiDoc::openapi())
}

// ============================================================================
// SECURE ROUTER BUILDER
// ============================================================================

/// Builder for the application router with auth and rate limiting on by
/// default.
///
/// Everything under [`API_PREFIX`] passes the auth middleware. Health,
/// metrics, the OpenAPI document and the dev token route are public but
/// still rate limited.
pub struct SecureRouterBuilder {
    state: AppState,
    auth_state: AuthMiddlewareState,
    rate_limit_state: RateLimitState,
}

impl SecureRouterBuilder {
    /// Create a builder over `state`.
    ///
    /// In production this fails when CORS origins or the JWT secret are
    /// not configured properly.
    pub fn new(state: AppState) -> ApiResult<Self> {
        // Refuses weak secrets in production, warns elsewhere.
        state.auth.validate_for_production()?;
        if is_production_environment() {
            state.api_config.validate_for_production()?;
        }

        let auth_state = AuthMiddlewareState::from_shared(state.auth.clone());
        let rate_limit_state = RateLimitState::new(state.api_config.clone());
        rate_limit_state.spawn_pruner();

        Ok(Self {
            state,
            auth_state,
            rate_limit_state,
        })
    }

    /// Authenticated resource routes.
    fn build_api_routes(&self) -> Router<AppState> {
        Router::new()
            .nest("/universes", universe::create_router())
            .nest("/worlds", world::create_router(self.state.api_config.import_max_bytes))
            .nest("/pages", page::create_router())
            .nest("/me", me::create_router())
    }

    /// Build the complete router.
    ///
    /// # Middleware Order (outer to inner)
    /// 1. CORS - answers preflight requests
    /// 2. Trace - tower-http request spans
    /// 3. Observability - metrics and completion logs
    /// 4. Rate limiting
    /// 5. Auth (only under `/api`)
    pub fn build(self) -> ApiResult<Router> {
        let api_routes = self
            .build_api_routes()
            .layer(from_fn_with_state(self.auth_state.clone(), auth_middleware));

        let mut router: Router<AppState> = Router::new()
            .nest(API_PREFIX, api_routes)
            .nest("/health", health::create_router())
            .nest("/auth/dev", dev_auth::create_router())
            .route("/metrics", get(metrics_handler));

        #[cfg(feature = "openapi")]
        {
            router = router.route("/openapi.json", get(openapi_json));
        }

        #[cfg(feature = "swagger-ui")]
        {
            use utoipa::OpenApi;
            use utoipa_swagger_ui::SwaggerUi;
            router = router.merge(
                SwaggerUi::new("/swagger-ui").url("/openapi.json", crate::openapi::ApiDoc::openapi()),
            );
        }

        let cors = build_cors_layer(&self.state.api_config);

        Ok(router
            .with_state(self.state)
            .layer(from_fn_with_state(self.rate_limit_state, rate_limit_middleware))
            .layer(from_fn(observability_middleware))
            .layer(TraceLayer::new_for_http())
            .layer(cors))
    }
}

// ============================================================================
// CORS LAYER
// ============================================================================

/// Build the CORS layer from ApiConfig.
///
/// Empty origins allow any origin (development).
fn build_cors_layer(config: &ApiConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([
            HeaderName::from_static("x-ratelimit-limit"),
            HeaderName::from_static("retry-after"),
        ])
        .max_age(Duration::from_secs(config.cors_max_age_secs));

    if config.cors_origins.is_empty() {
        tracing::info!("CORS: allowing all origins");
        cors.allow_origin(Any).allow_headers(Any).expose_headers(Any)
    } else {
        tracing::info!(origins = ?config.cors_origins, "CORS: restricting origins");
        let allowed = config.clone();
        let origins = AllowOrigin::predicate(move |origin: &HeaderValue, _: &axum::http::request::Parts| {
            origin
                .to_str()
                .map(|origin| allowed.is_origin_allowed(origin))
                .unwrap_or(false)
        });

        if config.cors_allow_credentials {
            cors.allow_origin(origins).allow_credentials(true)
        } else {
            cors.allow_origin(origins)
        }
    }
}

/// Create the complete application router.
///
/// - `/api/*` resource routes (bearer JWT required)
/// - `/health/*`, `/metrics`, `/openapi.json`, `/auth/dev/token` (public)
/// - `/swagger-ui` when the `swagger-ui` feature is enabled
pub fn create_api_router(state: AppState) -> ApiResult<Router> {
    SecureRouterBuilder::new(state).and_then(SecureRouterBuilder::build)
}
