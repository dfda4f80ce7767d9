//! API error type
//!
//! Every failure leaves a handler as an [`ApiError`]: a stable
//! machine-readable [`ErrorCode`], a message and optional details,
//! rendered as JSON with the status the code implies.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use folio_core::{AccessError, EntityKind, FolioError, StorageError, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

/// Machine-readable error category, serialized in SCREAMING_SNAKE_CASE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // 401
    Unauthorized,
    InvalidToken,
    TokenExpired,

    /// 403: not a member of the universe, or the role is too low.
    Forbidden,

    // 400
    ValidationFailed,
    InvalidInput,
    MissingField,
    InvalidFormat,
    /// Uploaded document exceeds the configured limit.
    PayloadTooLarge,

    // 404
    EntityNotFound,
    UniverseNotFound,
    WorldNotFound,
    PageNotFound,

    /// 409: duplicate id or (universe, user) membership pair.
    EntityAlreadyExists,

    TooManyRequests,

    // 5xx
    InternalError,
    DatabaseError,
    ServiceUnavailable,
}

impl ErrorCode {
    /// HTTP status and fallback message for this code.
    fn meta(self) -> (StatusCode, &'static str) {
        use ErrorCode::*;
        match self {
            Unauthorized => (StatusCode::UNAUTHORIZED, "Authentication required"),
            InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid authentication token"),
            TokenExpired => (StatusCode::UNAUTHORIZED, "Authentication token has expired"),
            Forbidden => (StatusCode::FORBIDDEN, "Access forbidden"),
            ValidationFailed => (StatusCode::BAD_REQUEST, "Request validation failed"),
            InvalidInput => (StatusCode::BAD_REQUEST, "Invalid input data"),
            MissingField => (StatusCode::BAD_REQUEST, "Required field is missing"),
            InvalidFormat => (StatusCode::BAD_REQUEST, "Invalid format"),
            PayloadTooLarge => (StatusCode::BAD_REQUEST, "Uploaded file is too large"),
            EntityNotFound => (StatusCode::NOT_FOUND, "Entity not found"),
            UniverseNotFound => (StatusCode::NOT_FOUND, "Universe not found"),
            WorldNotFound => (StatusCode::NOT_FOUND, "World not found"),
            PageNotFound => (StatusCode::NOT_FOUND, "Page not found"),
            EntityAlreadyExists => (StatusCode::CONFLICT, "Entity already exists"),
            TooManyRequests => (StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded"),
            InternalError => (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error"),
            DatabaseError => (StatusCode::INTERNAL_SERVER_ERROR, "Database operation failed"),
            ServiceUnavailable => (StatusCode::SERVICE_UNAVAILABLE, "Service temporarily unavailable"),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        self.meta().0
    }

    pub fn default_message(&self) -> &'static str {
        self.meta().1
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ============================================================================
// API ERROR STRUCT
// ============================================================================

/// JSON error body: `{"code": ..., "message": ..., "details"?: ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Error carrying the code's fallback message.
    pub fn from_code(code: ErrorCode) -> Self {
        Self::new(code, code.default_message())
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidToken, message)
    }

    pub fn token_expired() -> Self {
        Self::from_code(ErrorCode::TokenExpired)
    }

    pub fn validation_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationFailed, message)
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    pub fn missing_field(field: &str) -> Self {
        Self::new(ErrorCode::MissingField, format!("Field '{}' is required", field))
    }

    pub fn invalid_format(field: &str, expected: &str) -> Self {
        Self::new(
            ErrorCode::InvalidFormat,
            format!("Field '{}' must be {}", field, expected),
        )
    }

    pub fn payload_too_large(limit_bytes: usize) -> Self {
        Self::new(
            ErrorCode::PayloadTooLarge,
            format!("Uploaded file exceeds the {} byte limit", limit_bytes),
        )
    }

    pub fn universe_not_found(id: impl fmt::Display) -> Self {
        Self::new(ErrorCode::UniverseNotFound, format!("Universe {} not found", id))
    }

    pub fn world_not_found(id: impl fmt::Display) -> Self {
        Self::new(ErrorCode::WorldNotFound, format!("World {} not found", id))
    }

    pub fn page_not_found(id: impl fmt::Display) -> Self {
        Self::new(ErrorCode::PageNotFound, format!("Page {} not found", id))
    }

    fn not_found(entity: EntityKind, id: impl fmt::Display) -> Self {
        match entity {
            EntityKind::Universe => Self::universe_not_found(id),
            EntityKind::World => Self::world_not_found(id),
            EntityKind::Page => Self::page_not_found(id),
            other => Self::new(ErrorCode::EntityNotFound, format!("{} {} not found", other, id)),
        }
    }

    pub fn entity_already_exists(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::EntityAlreadyExists, message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    pub fn database_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ServiceUnavailable, message)
    }

    /// 429, optionally naming the wait in the message.
    pub fn too_many_requests(retry_after_secs: Option<u64>) -> Self {
        match retry_after_secs {
            Some(secs) => Self::new(
                ErrorCode::TooManyRequests,
                format!("Rate limit exceeded, retry in {}s", secs),
            ),
            None => Self::from_code(ErrorCode::TooManyRequests),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// ============================================================================
// AXUM INTEGRATION
// ============================================================================

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self)).into_response()
    }
}

impl From<FolioError> for ApiError {
    fn from(err: FolioError) -> Self {
        match err {
            FolioError::Storage(StorageError::NotFound { entity, id }) => Self::not_found(entity, id),
            FolioError::Storage(StorageError::AlreadyExists { reason, .. }) => {
                Self::entity_already_exists(reason)
            }
            FolioError::Storage(StorageError::Unavailable { reason }) => {
                tracing::error!(%reason, "Storage backend unavailable");
                Self::service_unavailable("Storage backend unavailable")
            }
            // Backend detail stays in the log.
            FolioError::Storage(other) => {
                tracing::error!(error = %other, "Storage error");
                Self::from_code(ErrorCode::DatabaseError)
            }
            FolioError::Validation(ValidationError::RequiredFieldMissing { field }) => {
                Self::missing_field(&field)
            }
            FolioError::Validation(other) => Self::validation_failed(other.to_string()),
            FolioError::Access(AccessError::NotAMember { universe_id, .. }) => {
                Self::forbidden(format!("Not a member of universe {}", universe_id))
            }
            FolioError::Access(denied) => Self::forbidden(denied.to_string()),
            FolioError::Config(other) => {
                tracing::error!(error = %other, "Configuration error");
                Self::internal_error("Server misconfigured")
            }
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::invalid_input(format!("Invalid JSON: {}", err))
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
