//! FOLIO Core - Entity Types
//!
//! Pure data structures shared by every other crate: typed identifiers,
//! the Universe/World/Page entities, roles and the ownership walk used by
//! permission checks. No I/O lives here.

pub mod access;
pub mod entities;
pub mod error;
pub mod identity;

pub use access::{resolve_universe, Action, Owned, ParentRef, Role};
pub use entities::{
    validate_category, validate_content, validate_title, Membership, Page, Universe, World,
    DEFAULT_PAGE_CATEGORY, MAX_CATEGORY_LEN, MAX_CONTENT_BYTES, MAX_NAME_LEN, MAX_RULESET_LEN,
    MAX_TITLE_LEN,
};
pub use error::{
    AccessError, ConfigError, FolioError, FolioResult, StorageError, ValidationError,
};
pub use identity::{
    EntityId, EntityIdType, EntityKind, MembershipId, PageId, Timestamp,
    UniverseId, UserId, WorldId,
};
