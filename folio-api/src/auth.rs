//! Authentication Module
//!
//! Bearer JWT authentication for the FOLIO API. The token subject is the
//! caller's user id; there is no user table, so a valid signature over a
//! UUID subject is the whole identity. What the caller may do inside a
//! universe is decided later by their membership row.

use crate::config::is_production_environment;
use crate::error::{ApiError, ApiResult};
use folio_core::{ConfigError, EntityIdType, FolioError, UserId};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// Signing algorithm for every token this service mints or accepts.
const ALGORITHM: Algorithm = Algorithm::HS256;

/// Used when FOLIO_JWT_SECRET is unset. Refused in production.
const DEV_FALLBACK_SECRET: &str = "folio-dev-secret-do-not-deploy";

/// Shortest secret accepted in production.
const MIN_PRODUCTION_SECRET_LEN: usize = 32;

// ============================================================================
// CLOCK
// ============================================================================

/// Source of "now" for token expiry.
///
/// Expiry is checked here rather than inside `jsonwebtoken` so tests can
/// freeze time and a pre-1970 system clock is reported as a server error.
pub trait Clock: Send + Sync {
    fn unix_now(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WallClock;

impl Clock for WallClock {
    fn unix_now(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Clock pinned to a fixed instant.
#[derive(Debug, Clone, Copy)]
pub struct FrozenClock(pub i64);

impl Clock for FrozenClock {
    fn unix_now(&self) -> i64 {
        self.0
    }
}

// ============================================================================
// SIGNING SECRET
// ============================================================================

/// HMAC signing key. `Debug` prints only its length.
#[derive(Clone)]
pub struct JwtSecret(SecretString);

impl JwtSecret {
    /// Wrap a secret, rejecting the empty string.
    pub fn new(secret: String) -> Result<Self, FolioError> {
        if secret.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "jwt_secret".to_string(),
            }
            .into());
        }
        Ok(Self(SecretString::from(secret)))
    }

    fn dev_fallback() -> Self {
        Self(SecretString::from(DEV_FALLBACK_SECRET.to_string()))
    }

    fn bytes(&self) -> &[u8] {
        self.0.expose_secret().as_bytes()
    }

    pub fn len(&self) -> usize {
        self.bytes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes().is_empty()
    }

    /// True for the built-in development secret.
    pub fn is_dev_fallback(&self) -> bool {
        self.0.expose_secret() == DEV_FALLBACK_SECRET
    }

    /// Why this secret is unfit for production, if it is.
    fn weakness(&self) -> Option<String> {
        if self.is_dev_fallback() {
            Some("FOLIO_JWT_SECRET is not set".to_string())
        } else if self.len() < MIN_PRODUCTION_SECRET_LEN {
            Some(format!(
                "FOLIO_JWT_SECRET has {} characters, at least {} are required",
                self.len(),
                MIN_PRODUCTION_SECRET_LEN
            ))
        } else {
            None
        }
    }
}

impl std::fmt::Debug for JwtSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "JwtSecret(<{} bytes hidden>)", self.len())
    }
}

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Token signing and verification settings.
#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: JwtSecret,
    /// Lifetime of minted tokens, in seconds.
    pub jwt_expiration_secs: i64,
    /// Grace period past `exp`, in seconds.
    pub leeway_secs: i64,
    pub clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &self.jwt_secret)
            .field("jwt_expiration_secs", &self.jwt_expiration_secs)
            .field("leeway_secs", &self.leeway_secs)
            .finish_non_exhaustive()
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: JwtSecret::dev_fallback(),
            jwt_expiration_secs: 3600,
            leeway_secs: 60,
            clock: Arc::new(WallClock),
        }
    }
}

fn env_secs(key: &str, default: i64) -> i64 {
    std::env::var(key)
        .ok()
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(default)
}

impl AuthConfig {
    /// Read `FOLIO_JWT_SECRET`, `FOLIO_JWT_EXPIRATION_SECS` (3600) and
    /// `FOLIO_JWT_CLOCK_SKEW_SECS` (60).
    ///
    /// A blank or missing secret falls back to the development secret.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let jwt_secret = std::env::var("FOLIO_JWT_SECRET")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .and_then(|s| JwtSecret::new(s).ok())
            .unwrap_or(defaults.jwt_secret);

        Self {
            jwt_secret,
            jwt_expiration_secs: env_secs("FOLIO_JWT_EXPIRATION_SECS", defaults.jwt_expiration_secs),
            leeway_secs: env_secs("FOLIO_JWT_CLOCK_SKEW_SECS", defaults.leeway_secs),
            clock: defaults.clock,
        }
    }

    /// Fail in production on a weak secret; only warn elsewhere.
    pub fn validate_for_production(&self) -> ApiResult<()> {
        let Some(reason) = self.jwt_secret.weakness() else {
            return Ok(());
        };
        if is_production_environment() {
            return Err(ApiError::invalid_input(format!(
                "Refusing to start in production: {}",
                reason
            )));
        }
        tracing::warn!(%reason, "Weak JWT secret; acceptable only outside production");
        Ok(())
    }
}

// ============================================================================
// CLAIMS
// ============================================================================

/// JWT payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// User id as a UUID string.
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Claims {
    fn issue(user_id: UserId, name: Option<String>, now: i64, lifetime_secs: i64) -> Self {
        Self {
            sub: user_id.to_string(),
            iat: now,
            exp: now.saturating_add(lifetime_secs),
            name,
        }
    }

    /// Parse the subject as a user id.
    pub fn user_id(&self) -> ApiResult<UserId> {
        self.sub
            .parse::<UserId>()
            .map_err(|_| ApiError::invalid_token("Token subject must be a UUID"))
    }
}

// ============================================================================
// AUTHENTICATION CONTEXT
// ============================================================================

/// Authenticated caller, injected into request extensions by the auth
/// middleware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: UserId,
    pub display_name: Option<String>,
}

impl AuthContext {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            display_name: None,
        }
    }
}

// ============================================================================
// TOKENS
// ============================================================================

fn decode_error(err: jsonwebtoken::errors::Error) -> ApiError {
    match err.kind() {
        ErrorKind::InvalidSignature => ApiError::invalid_token("Token signature does not verify"),
        ErrorKind::InvalidToken => ApiError::invalid_token("Token is not a well-formed JWT"),
        ErrorKind::MissingRequiredClaim(claim) => {
            ApiError::invalid_token(format!("Token is missing the `{}` claim", claim))
        }
        _ => ApiError::invalid_token(format!("Token rejected: {}", err)),
    }
}

/// Verify the signature and expiry of `token` and return its claims.
pub fn validate_jwt_token(config: &AuthConfig, token: &str) -> ApiResult<Claims> {
    let mut validation = Validation::new(ALGORITHM);
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.required_spec_claims = HashSet::from(["exp".to_string()]);

    let claims = decode::<Claims>(token, &DecodingKey::from_secret(config.jwt_secret.bytes()), &validation)
        .map_err(decode_error)?
        .claims;

    let now = config.clock.unix_now();
    if now < 0 {
        tracing::error!(now, "System clock is before the Unix epoch");
        return Err(ApiError::internal_error("Server clock is misconfigured"));
    }
    if claims.exp.saturating_add(config.leeway_secs) < now {
        return Err(ApiError::token_expired());
    }

    Ok(claims)
}

/// Mint a token for `user_id` that expires after the configured lifetime.
pub fn generate_jwt_token(
    config: &AuthConfig,
    user_id: UserId,
    display_name: Option<String>,
) -> ApiResult<String> {
    let claims = Claims::issue(
        user_id,
        display_name,
        config.clock.unix_now(),
        config.jwt_expiration_secs,
    );
    encode(
        &Header::new(ALGORITHM),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.bytes()),
    )
    .map_err(|e| ApiError::internal_error(format!("Could not sign token: {}", e)))
}

/// Turn a raw bearer token into the caller's identity.
pub fn authenticate_jwt(config: &AuthConfig, token: &str) -> ApiResult<AuthContext> {
    let claims = validate_jwt_token(config, token)?;
    Ok(AuthContext {
        user_id: claims.user_id()?,
        display_name: claims.name,
    })
}

/// Authenticate from the `Authorization` header value, if any.
pub fn authenticate(config: &AuthConfig, auth_header: Option<&str>) -> ApiResult<AuthContext> {
    let header = auth_header.ok_or_else(|| {
        ApiError::unauthorized("Authentication required: send Authorization: Bearer <token>")
    })?;
    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::invalid_token("Authorization header must use the Bearer scheme"))?;
    authenticate_jwt(config, token.trim())
}

/// Stable user id for a free-form name (dev tokens only).
pub fn derive_user_id(name: &str) -> UserId {
    UserId::new(uuid::Uuid::new_v5(&uuid::Uuid::NAMESPACE_OID, name.as_bytes()))
}
