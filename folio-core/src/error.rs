//! Error types for FOLIO operations

use crate::identity::EntityKind;
use thiserror::Error;
use uuid::Uuid;

/// Storage layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Entity not found: {entity:?} with id {id}")]
    NotFound { entity: EntityKind, id: Uuid },

    #[error("{entity:?} already exists: {reason}")]
    AlreadyExists { entity: EntityKind, reason: String },

    #[error("Storage backend failure: {reason}")]
    Backend { reason: String },

    #[error("Storage backend unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Field {field} is too long ({len} > {max})")]
    TooLong { field: String, len: usize, max: usize },
}

/// Authorization errors from the membership check.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AccessError {
    #[error("User {user_id} is not a member of universe {universe_id}")]
    NotAMember { user_id: Uuid, universe_id: Uuid },

    #[error("Role {role} may not {action} in universe {universe_id}")]
    Denied {
        role: String,
        action: String,
        universe_id: Uuid,
    },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all FOLIO errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FolioError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Access error: {0}")]
    Access(#[from] AccessError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl FolioError {
    /// Shorthand for a storage not-found error.
    pub fn not_found(entity: EntityKind, id: impl Into<Uuid>) -> Self {
        FolioError::Storage(StorageError::NotFound {
            entity,
            id: id.into(),
        })
    }
}

/// Result type alias for FOLIO operations.
pub type FolioResult<T> = Result<T, FolioError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_display_not_found() {
        let err = StorageError::NotFound {
            entity: EntityKind::Page,
            id: Uuid::nil(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("Entity not found"));
        assert!(msg.contains("Page"));
        assert!(msg.contains("00000000-0000-0000-0000-000000000000"));
    }

    #[test]
    fn test_validation_error_display_too_long() {
        let err = ValidationError::TooLong {
            field: "title".to_string(),
            len: 301,
            max: 300,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("title"));
        assert!(msg.contains("301"));
    }

    #[test]
    fn test_access_error_display_denied() {
        let err = AccessError::Denied {
            role: "viewer".to_string(),
            action: "edit pages".to_string(),
            universe_id: Uuid::nil(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("viewer"));
        assert!(msg.contains("edit pages"));
    }

    #[test]
    fn test_folio_error_from_variants() {
        let storage = FolioError::from(StorageError::LockPoisoned);
        assert!(matches!(storage, FolioError::Storage(_)));

        let validation = FolioError::from(ValidationError::RequiredFieldMissing {
            field: "name".to_string(),
        });
        assert!(matches!(validation, FolioError::Validation(_)));

        let access = FolioError::from(AccessError::NotAMember {
            user_id: Uuid::nil(),
            universe_id: Uuid::nil(),
        });
        assert!(matches!(access, FolioError::Access(_)));

        let config = FolioError::from(ConfigError::MissingRequired {
            field: "jwt_secret".to_string(),
        });
        assert!(matches!(config, FolioError::Config(_)));
    }

    #[test]
    fn test_not_found_shorthand() {
        let err = FolioError::not_found(EntityKind::World, Uuid::nil());
        assert!(matches!(
            err,
            FolioError::Storage(StorageError::NotFound {
                entity: EntityKind::World,
                ..
            })
        ));
    }
}
