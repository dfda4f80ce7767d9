//! FOLIO API - REST layer for the campaign wiki
//!
//! Axum server exposing universes, worlds and pages over JSON, guarded by
//! bearer JWT authentication and membership-based permissions. Storage is
//! either PostgreSQL (`db`) or the in-memory store from `folio-storage`.

pub mod access;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod importer;
pub mod macros;
pub mod middleware;
#[cfg(feature = "openapi")]
pub mod openapi;
pub mod routes;
pub mod state;
pub mod telemetry;
pub mod types;

pub use auth::{
    authenticate, authenticate_jwt, derive_user_id, generate_jwt_token, validate_jwt_token,
    AuthConfig, AuthContext, Claims,
};
pub use config::{ApiConfig, LogFormat, ServerConfig, StoreBackend};
pub use db::{DbConfig, PgStore};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use importer::{convert_docx, ImportedDocument};
pub use middleware::{auth_middleware, AuthExtractor, AuthMiddlewareState};
#[cfg(feature = "openapi")]
pub use openapi::ApiDoc;
pub use routes::{create_api_router, SecureRouterBuilder};
pub use state::AppState;
pub use types::*;

/// Serialized access to process environment variables in tests.
#[cfg(test)]
pub(crate) mod test_env {
    use std::sync::Mutex;

    pub static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// Sets (or removes) a variable and restores the previous value on drop.
    pub struct EnvVarGuard {
        key: &'static str,
        previous: Option<String>,
    }

    impl EnvVarGuard {
        pub fn set(key: &'static str, value: Option<&str>) -> Self {
            let previous = std::env::var(key).ok();
            match value {
                Some(v) => std::env::set_var(key, v),
                None => std::env::remove_var(key),
            }
            Self { key, previous }
        }
    }

    impl Drop for EnvVarGuard {
        fn drop(&mut self) {
            match &self.previous {
                Some(v) => std::env::set_var(self.key, v),
                None => std::env::remove_var(self.key),
            }
        }
    }
}
