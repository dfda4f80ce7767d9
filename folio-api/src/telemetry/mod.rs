//! FOLIO Telemetry - structured logging and Prometheus metrics.

pub mod metrics;
pub mod middleware;

pub use metrics::{metrics_handler, FolioMetrics, METRICS};
pub use middleware::observability_middleware;

use crate::config::LogFormat;
use crate::error::{ApiError, ApiResult};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "folio_api=debug,tower_http=info,info";

/// Install the global `tracing` subscriber.
///
/// Errors if a subscriber is already installed.
pub fn init_tracing(format: LogFormat) -> ApiResult<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).try_init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init(),
    };

    result.map_err(|e| ApiError::internal_error(format!("Failed to init subscriber: {}", e)))
}
