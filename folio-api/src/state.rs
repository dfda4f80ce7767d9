//! Shared application state for Axum routers.

use std::sync::Arc;
use std::time::Instant;

use folio_storage::{InMemoryStore, WikiStore};

use crate::auth::AuthConfig;
use crate::config::ApiConfig;

/// Storage handle shared by every handler.
pub type SharedStore = Arc<dyn WikiStore>;

/// Application-wide state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    pub store: SharedStore,
    pub auth: Arc<AuthConfig>,
    pub api_config: Arc<ApiConfig>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(store: SharedStore, auth: AuthConfig, api_config: ApiConfig) -> Self {
        Self {
            store,
            auth: Arc::new(auth),
            api_config: Arc::new(api_config),
            start_time: Instant::now(),
        }
    }

    /// State over a fresh [`InMemoryStore`] with default configuration.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryStore::new()),
            AuthConfig::default(),
            ApiConfig::default(),
        )
    }
}

crate::impl_from_ref!(SharedStore, store);
crate::impl_from_ref!(Arc<AuthConfig>, auth);
crate::impl_from_ref!(Arc<ApiConfig>, api_config);
crate::impl_from_ref!(Instant, start_time);
