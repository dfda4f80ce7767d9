//! API Configuration Module
//!
//! CORS, rate limiting, upload limits and server settings. Everything is
//! read from environment variables once at startup, with defaults suited
//! to local development.

use crate::error::{ApiError, ApiResult};
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

/// Default upload limit for `.docx` imports (10 MiB).
pub const DEFAULT_IMPORT_MAX_BYTES: usize = 10 * 1024 * 1024;

/// Check if running in a production environment.
pub fn is_production_environment() -> bool {
    std::env::var("FOLIO_ENVIRONMENT")
        .map(|e| matches!(e.to_lowercase().as_str(), "production" | "prod"))
        .unwrap_or(false)
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

fn env_list(key: &str) -> Vec<String> {
    std::env::var(key)
        .map(|s| {
            s.split(',')
                .map(|item| item.trim().to_string())
                .filter(|item| !item.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

// ============================================================================
// API CONFIGURATION
// ============================================================================

/// Per-request policy: CORS, rate limiting and upload limits.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Allowed CORS origins. Empty means allow all (dev mode).
    pub cors_origins: Vec<String>,

    /// Whether to allow credentials in CORS requests.
    pub cors_allow_credentials: bool,

    /// Max age for CORS preflight cache in seconds.
    pub cors_max_age_secs: u64,

    /// Whether rate limiting is enabled.
    pub rate_limit_enabled: bool,

    /// Requests per minute per client IP.
    pub rate_limit_per_minute: u32,

    /// Burst capacity on top of the steady rate.
    pub rate_limit_burst: u32,

    /// Reverse proxies whose `X-Forwarded-For`/`X-Real-IP` are believed.
    pub trusted_proxies: Vec<IpAddr>,

    /// Maximum accepted `.docx` upload size in bytes.
    pub import_max_bytes: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            cors_origins: Vec::new(),
            cors_allow_credentials: false,
            cors_max_age_secs: 86400,

            rate_limit_enabled: true,
            rate_limit_per_minute: 600,
            rate_limit_burst: 20,
            trusted_proxies: Vec::new(),

            import_max_bytes: DEFAULT_IMPORT_MAX_BYTES,
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// - `FOLIO_CORS_ORIGINS`: Comma-separated allowed origins (empty = allow all)
    /// - `FOLIO_CORS_ALLOW_CREDENTIALS`: "true" or "false" (default: false)
    /// - `FOLIO_CORS_MAX_AGE_SECS`: Preflight cache duration (default: 86400)
    /// - `FOLIO_RATE_LIMIT_ENABLED`: "true" or "false" (default: true)
    /// - `FOLIO_RATE_LIMIT_PER_MINUTE`: Requests per minute per IP (default: 600)
    /// - `FOLIO_RATE_LIMIT_BURST`: Burst capacity (default: 20)
    /// - `FOLIO_TRUSTED_PROXIES`: Comma-separated proxy IPs (default: none)
    /// - `FOLIO_IMPORT_MAX_BYTES`: `.docx` upload limit (default: 10 MiB)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let cors_origins = env_list("FOLIO_CORS_ORIGINS");

        let trusted_proxies = env_list("FOLIO_TRUSTED_PROXIES")
            .into_iter()
            .filter_map(|raw| match raw.parse::<IpAddr>() {
                Ok(ip) => Some(ip),
                Err(_) => {
                    tracing::warn!(value = %raw, "Ignoring unparseable FOLIO_TRUSTED_PROXIES entry");
                    None
                }
            })
            .collect();

        let cors_allow_credentials = std::env::var("FOLIO_CORS_ALLOW_CREDENTIALS")
            .ok()
            .map(|s| s.to_lowercase() == "true")
            .unwrap_or(defaults.cors_allow_credentials);

        let rate_limit_enabled = std::env::var("FOLIO_RATE_LIMIT_ENABLED")
            .ok()
            .map(|s| s.to_lowercase() != "false")
            .unwrap_or(defaults.rate_limit_enabled);

        Self {
            cors_origins,
            cors_allow_credentials,
            cors_max_age_secs: env_parse("FOLIO_CORS_MAX_AGE_SECS")
                .unwrap_or(defaults.cors_max_age_secs),
            rate_limit_enabled,
            rate_limit_per_minute: env_parse("FOLIO_RATE_LIMIT_PER_MINUTE")
                .unwrap_or(defaults.rate_limit_per_minute),
            rate_limit_burst: env_parse("FOLIO_RATE_LIMIT_BURST")
                .unwrap_or(defaults.rate_limit_burst),
            trusted_proxies,
            import_max_bytes: env_parse("FOLIO_IMPORT_MAX_BYTES")
                .unwrap_or(defaults.import_max_bytes),
        }
    }

    /// Production requires an explicit origin allow-list.
    pub fn validate_for_production(&self) -> ApiResult<()> {
        if self.cors_origins.is_empty() {
            return Err(ApiError::invalid_input(
                "CORS origins not configured for production. Set FOLIO_CORS_ORIGINS.",
            ));
        }
        if !self.rate_limit_enabled {
            tracing::warn!(
                "Rate limiting is disabled in production. \
                 Set FOLIO_RATE_LIMIT_ENABLED=true to enable it."
            );
        }
        Ok(())
    }

    /// Check if a given origin is allowed. `*.example.org` entries match
    /// `https://` origins on that domain or any subdomain.
    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        if self.cors_origins.is_empty() {
            return true;
        }

        self.cors_origins.iter().any(|allowed| {
            if allowed == origin {
                return true;
            }
            // Wildcard subdomains: *.folio.example
            if let Some(pattern) = allowed.strip_prefix("*.") {
                if let Some(origin_domain) = origin.strip_prefix("https://") {
                    return origin_domain.ends_with(&format!(".{}", pattern))
                        || origin_domain == pattern;
                }
            }
            false
        })
    }
}

// ============================================================================
// SERVER CONFIGURATION
// ============================================================================

/// Which [`folio_storage::WikiStore`] backs the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreBackend {
    #[default]
    Postgres,
    /// Volatile store, for demos and local runs without a database.
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(StoreBackend::Postgres),
            "memory" | "in-memory" | "mem" => Ok(StoreBackend::Memory),
            other => Err(ApiError::invalid_input(format!(
                "Unknown FOLIO_STORE value '{}', expected postgres or memory",
                other
            ))),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        })
    }
}

/// Process-level settings used by the binary.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_host: String,
    pub port: u16,
    pub environment: String,
    pub store: StoreBackend,
    pub log_format: LogFormat,
}

impl ServerConfig {
    /// Read `FOLIO_API_BIND`, `PORT`/`FOLIO_API_PORT`, `FOLIO_ENVIRONMENT`,
    /// `FOLIO_STORE` and `FOLIO_LOG_FORMAT`.
    pub fn from_env() -> ApiResult<Self> {
        let bind_host = std::env::var("FOLIO_API_BIND").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port_str = std::env::var("PORT")
            .ok()
            .or_else(|| std::env::var("FOLIO_API_PORT").ok())
            .unwrap_or_else(|| "3000".to_string());
        let port = port_str
            .trim()
            .parse::<u16>()
            .map_err(|_| ApiError::invalid_input(format!("Invalid port value: {}", port_str)))?;

        let store = match std::env::var("FOLIO_STORE") {
            Ok(value) => value.parse()?,
            Err(_) => StoreBackend::default(),
        };

        let log_format = std::env::var("FOLIO_LOG_FORMAT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default();

        Ok(Self {
            bind_host,
            port,
            environment: std::env::var("FOLIO_ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
            store,
            log_format,
        })
    }

    /// Resolve the socket address to listen on. IPv6 hosts may be given
    /// bare (`::`) or bracketed (`[::1]`).
    pub fn bind_addr(&self) -> ApiResult<SocketAddr> {
        let host = self.bind_host.trim();
        let host = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host);
        let ip = host.parse::<IpAddr>().map_err(|e| {
            ApiError::invalid_input(format!("Invalid bind address {}: {}", self.bind_host, e))
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_env::{EnvVarGuard, ENV_MUTEX};

    #[test]
    fn test_default_config() {
        let config = ApiConfig::default();
        assert!(config.cors_origins.is_empty());
        assert!(!config.cors_allow_credentials);
        assert_eq!(config.cors_max_age_secs, 86400);
        assert!(config.rate_limit_enabled);
        assert_eq!(config.rate_limit_per_minute, 600);
        assert_eq!(config.rate_limit_burst, 20);
        assert_eq!(config.import_max_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn test_from_env_overrides() {
        let _env_lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        let _origins = EnvVarGuard::set(
            "FOLIO_CORS_ORIGINS",
            Some("https://folio.example, https://app.folio.example,"),
        );
        let _rate = EnvVarGuard::set("FOLIO_RATE_LIMIT_ENABLED", Some("false"));
        let _import = EnvVarGuard::set("FOLIO_IMPORT_MAX_BYTES", Some("2048"));
        let _proxies = EnvVarGuard::set("FOLIO_TRUSTED_PROXIES", None);

        let config = ApiConfig::from_env();
        assert_eq!(config.cors_origins.len(), 2);
        assert!(!config.rate_limit_enabled);
        assert!(config.trusted_proxies.is_empty());
        assert_eq!(config.import_max_bytes, 2048);
    }

    #[test]
    fn test_production_requires_origins() {
        let mut config = ApiConfig::default();
        assert!(config.validate_for_production().is_err());

        config.cors_origins = vec!["https://folio.example".to_string()];
        assert!(config.validate_for_production().is_ok());
    }

    #[test]
    fn test_origin_allowed() {
        let mut config = ApiConfig::default();
        assert!(config.is_origin_allowed("http://localhost:5173"));

        config.cors_origins = vec![
            "https://folio.example".to_string(),
            "*.campaigns.example".to_string(),
        ];
        assert!(config.is_origin_allowed("https://folio.example"));
        assert!(config.is_origin_allowed("https://eberron.campaigns.example"));
        assert!(!config.is_origin_allowed("https://evilcampaigns.example"));
        assert!(!config.is_origin_allowed("https://evil.com"));
    }

    #[test]
    fn test_store_backend_parse() {
        assert!(matches!("memory".parse::<StoreBackend>(), Ok(StoreBackend::Memory)));
        assert!(matches!("Postgres".parse::<StoreBackend>(), Ok(StoreBackend::Postgres)));
        assert!("sqlite".parse::<StoreBackend>().is_err());
    }

    #[test]
    fn test_server_config_from_env() -> ApiResult<()> {
        let _env_lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        let _port = EnvVarGuard::set("PORT", Some("8080"));
        let _bind = EnvVarGuard::set("FOLIO_API_BIND", Some("127.0.0.1"));
        let _store = EnvVarGuard::set("FOLIO_STORE", Some("memory"));
        let _format = EnvVarGuard::set("FOLIO_LOG_FORMAT", Some("json"));

        let config = ServerConfig::from_env()?;
        assert_eq!(config.store, StoreBackend::Memory);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.bind_addr()?.to_string(), "127.0.0.1:8080");
        Ok(())
    }

    #[test]
    fn test_trusted_proxies_from_env() {
        let _env_lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        let _proxies = EnvVarGuard::set(
            "FOLIO_TRUSTED_PROXIES",
            Some("10.0.0.2, fd00::1, not-an-ip,"),
        );

        let config = ApiConfig::from_env();
        let proxies: Vec<String> = config.trusted_proxies.iter().map(|ip| ip.to_string()).collect();
        assert_eq!(proxies, vec!["10.0.0.2", "fd00::1"]);
    }

    #[test]
    fn test_bind_addr_accepts_ipv6() -> ApiResult<()> {
        let config = |host: &str| ServerConfig {
            bind_host: host.to_string(),
            port: 3000,
            environment: "development".to_string(),
            store: StoreBackend::Memory,
            log_format: LogFormat::Pretty,
        };
        assert_eq!(config("::").bind_addr()?.to_string(), "[::]:3000");
        assert_eq!(config("[::1]").bind_addr()?.to_string(), "[::1]:3000");
        assert_eq!(config("0.0.0.0").bind_addr()?.to_string(), "0.0.0.0:3000");
        assert!(config("localhost").bind_addr().is_err());
        Ok(())
    }

    #[test]
    fn test_server_config_rejects_bad_port() {
        let _env_lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        let _port = EnvVarGuard::set("PORT", Some("not-a-port"));
        assert!(ServerConfig::from_env().is_err());
    }

    #[test]
    fn test_is_production_environment() {
        let _env_lock = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        {
            let _env = EnvVarGuard::set("FOLIO_ENVIRONMENT", Some("PROD"));
            assert!(is_production_environment());
        }
        let _env = EnvVarGuard::set("FOLIO_ENVIRONMENT", Some("staging"));
        assert!(!is_production_environment());
    }
}
