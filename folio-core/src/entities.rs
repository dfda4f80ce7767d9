//! Core entity structures

use crate::{
    FolioResult, MembershipId, PageId, Role, Timestamp, UniverseId, UserId, ValidationError,
    WorldId,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Maximum length (in characters) of universe and world names.
pub const MAX_NAME_LEN: usize = 200;

/// Maximum length (in characters) of a world's ruleset label.
pub const MAX_RULESET_LEN: usize = 100;

/// Maximum length (in characters) of a page title.
pub const MAX_TITLE_LEN: usize = 300;

/// Maximum length (in characters) of a page category.
pub const MAX_CATEGORY_LEN: usize = 100;

/// Maximum size of page content in bytes.
pub const MAX_CONTENT_BYTES: usize = 1024 * 1024;

/// Category assigned to pages created without one.
pub const DEFAULT_PAGE_CATEGORY: &str = "general";

/// Universe - the tenant boundary.
/// Every World and Page belongs to exactly one Universe, and all access is
/// decided by the caller's membership in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Universe {
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub universe_id: UniverseId,
    pub name: String,
    pub description: String,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub created_by: UserId,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_at: Timestamp,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub updated_at: Timestamp,
}

impl Universe {
    /// Build a new universe after validating its fields.
    pub fn new(
        name: impl Into<String>,
        description: Option<String>,
        created_by: UserId,
    ) -> FolioResult<Self> {
        let name = require_text("name", name.into(), MAX_NAME_LEN)?;
        let now = Utc::now();
        Ok(Self {
            universe_id: crate::EntityIdType::now_v7(),
            name,
            description: description.unwrap_or_default(),
            created_by,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Membership of a user in a universe.
/// At most one row exists per (universe, user) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Membership {
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub membership_id: MembershipId,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub universe_id: UniverseId,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub user_id: UserId,
    pub role: Role,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_at: Timestamp,
}

impl Membership {
    pub fn new(universe_id: UniverseId, user_id: UserId, role: Role) -> Self {
        Self {
            membership_id: crate::EntityIdType::now_v7(),
            universe_id,
            user_id,
            role,
            created_at: Utc::now(),
        }
    }
}

/// World - a campaign setting inside a universe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct World {
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub world_id: WorldId,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub universe_id: UniverseId,
    pub name: String,
    pub description: String,
    /// Free-form game system label, e.g. "D&D 5e".
    pub ruleset: String,
    #[cfg_attr(feature = "openapi", schema(value_type = Option<String>, format = "uuid"))]
    pub primary_gm: Option<UserId>,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_at: Timestamp,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub updated_at: Timestamp,
}

impl World {
    /// Build a new world after validating its fields.
    ///
    /// Whether `primary_gm` holds a GM-capable membership is a storage
    /// question and is checked by the caller.
    pub fn new(
        universe_id: UniverseId,
        name: impl Into<String>,
        description: Option<String>,
        ruleset: impl Into<String>,
        primary_gm: Option<UserId>,
    ) -> FolioResult<Self> {
        let name = require_text("name", name.into(), MAX_NAME_LEN)?;
        let ruleset = require_text("ruleset", ruleset.into(), MAX_RULESET_LEN)?;
        let now = Utc::now();
        Ok(Self {
            world_id: crate::EntityIdType::now_v7(),
            universe_id,
            name,
            description: description.unwrap_or_default(),
            ruleset,
            primary_gm,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Page - a single wiki document inside a world.
/// `content` holds sanitized rich text (HTML).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct Page {
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub page_id: PageId,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub world_id: WorldId,
    pub title: String,
    pub content: String,
    pub category: String,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "uuid"))]
    pub author_id: UserId,
    pub is_public: bool,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub created_at: Timestamp,
    #[cfg_attr(feature = "openapi", schema(value_type = String, format = "date-time"))]
    pub updated_at: Timestamp,
}

impl Page {
    /// Build a new page after validating its fields.
    pub fn new(
        world_id: WorldId,
        title: impl Into<String>,
        content: Option<String>,
        category: Option<String>,
        author_id: UserId,
        is_public: bool,
    ) -> FolioResult<Self> {
        let title = validate_title(title.into())?;
        let content = validate_content(content.unwrap_or_default())?;
        let category = validate_category(category)?;
        let now = Utc::now();
        Ok(Self {
            page_id: crate::EntityIdType::now_v7(),
            world_id,
            title,
            content,
            category,
            author_id,
            is_public,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Trim and bound a required text field.
fn require_text(field: &str, value: String, max: usize) -> FolioResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::RequiredFieldMissing {
            field: field.to_string(),
        }
        .into());
    }
    let len = trimmed.chars().count();
    if len > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            len,
            max,
        }
        .into());
    }
    Ok(trimmed.to_string())
}

/// Validate a page title: required, at most [`MAX_TITLE_LEN`] characters.
pub fn validate_title(title: String) -> FolioResult<String> {
    require_text("title", title, MAX_TITLE_LEN)
}

/// Validate page content size.
pub fn validate_content(content: String) -> FolioResult<String> {
    if content.len() > MAX_CONTENT_BYTES {
        return Err(ValidationError::TooLong {
            field: "content".to_string(),
            len: content.len(),
            max: MAX_CONTENT_BYTES,
        }
        .into());
    }
    Ok(content)
}

/// Normalize a page category; blank or missing becomes [`DEFAULT_PAGE_CATEGORY`].
pub fn validate_category(category: Option<String>) -> FolioResult<String> {
    match category.as_deref().map(str::trim) {
        None | Some("") => Ok(DEFAULT_PAGE_CATEGORY.to_string()),
        Some(value) => {
            let len = value.chars().count();
            if len > MAX_CATEGORY_LEN {
                return Err(ValidationError::TooLong {
                    field: "category".to_string(),
                    len,
                    max: MAX_CATEGORY_LEN,
                }
                .into());
            }
            Ok(value.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EntityIdType, FolioError};

    #[test]
    fn test_universe_new_trims_name() -> FolioResult<()> {
        let owner = UserId::now_v7();
        let universe = Universe::new("  Forgotten Realms  ", None, owner)?;
        assert_eq!(universe.name, "Forgotten Realms");
        assert_eq!(universe.description, "");
        assert_eq!(universe.created_by, owner);
        assert_eq!(universe.created_at, universe.updated_at);
        Ok(())
    }

    #[test]
    fn test_universe_new_rejects_blank_name() {
        let result = Universe::new("   ", None, UserId::now_v7());
        assert!(matches!(
            result,
            Err(FolioError::Validation(ValidationError::RequiredFieldMissing { .. }))
        ));
    }

    #[test]
    fn test_universe_name_length_limit() {
        let long = "x".repeat(MAX_NAME_LEN + 1);
        let result = Universe::new(long, None, UserId::now_v7());
        assert!(matches!(
            result,
            Err(FolioError::Validation(ValidationError::TooLong { max: MAX_NAME_LEN, .. }))
        ));
        assert!(Universe::new("x".repeat(MAX_NAME_LEN), None, UserId::now_v7()).is_ok());
    }

    #[test]
    fn test_world_requires_ruleset() {
        let result = World::new(UniverseId::now_v7(), "Barovia", None, "", None);
        assert!(matches!(
            result,
            Err(FolioError::Validation(ValidationError::RequiredFieldMissing { ref field }))
                if field == "ruleset"
        ));
    }

    #[test]
    fn test_page_defaults() -> FolioResult<()> {
        let page = Page::new(WorldId::now_v7(), "Strahd", None, None, UserId::now_v7(), false)?;
        assert_eq!(page.category, DEFAULT_PAGE_CATEGORY);
        assert_eq!(page.content, "");
        assert!(!page.is_public);
        Ok(())
    }

    #[test]
    fn test_blank_category_falls_back_to_default() -> FolioResult<()> {
        assert_eq!(validate_category(Some("  ".into()))?, DEFAULT_PAGE_CATEGORY);
        assert_eq!(validate_category(Some(" npc ".into()))?, "npc");
        Ok(())
    }

    #[test]
    fn test_content_size_limit() {
        let big = "a".repeat(MAX_CONTENT_BYTES + 1);
        assert!(validate_content(big).is_err());
        assert!(validate_content("a".repeat(MAX_CONTENT_BYTES)).is_ok());
    }

    #[test]
    fn test_title_limit_counts_characters() {
        // Multi-byte characters count once each.
        let title = "é".repeat(MAX_TITLE_LEN);
        assert!(validate_title(title).is_ok());
    }

    #[test]
    fn test_membership_new() {
        let universe = UniverseId::now_v7();
        let user = UserId::now_v7();
        let membership = Membership::new(universe, user, Role::Gm);
        assert_eq!(membership.universe_id, universe);
        assert_eq!(membership.user_id, user);
        assert_eq!(membership.role, Role::Gm);
    }
}
