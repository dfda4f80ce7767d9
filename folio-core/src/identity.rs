//! Identity types for FOLIO entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Entity identifier using UUIDv7 for timestamp-sortable IDs.
pub type EntityId = Uuid;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// Entity type discriminator, used in error messages and path extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum EntityKind {
    Universe,
    Membership,
    World,
    Page,
    User,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Universe => "Universe",
            EntityKind::Membership => "Membership",
            EntityKind::World => "World",
            EntityKind::Page => "Page",
            EntityKind::User => "User",
        };
        f.write_str(name)
    }
}

/// Shared behavior of the strongly-typed ID newtypes.
///
/// Mixing a `WorldId` into a slot that expects a `PageId` is a compile
/// error; the raw UUID is only reachable through `as_uuid`.
pub trait EntityIdType:
    Copy + Eq + std::hash::Hash + fmt::Debug + fmt::Display + Send + Sync + 'static
{
    /// Human-readable entity name for error messages.
    const ENTITY_NAME: &'static str;

    /// Discriminator for the entity this ID points at.
    const KIND: EntityKind;

    /// Wrap a raw UUID.
    fn new(uuid: Uuid) -> Self;

    /// Unwrap the raw UUID.
    fn as_uuid(&self) -> Uuid;

    /// Generate a fresh timestamp-sortable ID.
    fn now_v7() -> Self {
        Self::new(Uuid::now_v7())
    }

    /// The nil ID, useful as a placeholder in tests.
    fn nil() -> Self {
        Self::new(Uuid::nil())
    }
}

macro_rules! define_entity_id {
    ($(#[$meta:meta])* $name:ident, $entity:literal, $kind:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        #[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
        pub struct $name(Uuid);

        impl EntityIdType for $name {
            const ENTITY_NAME: &'static str = $entity;
            const KIND: EntityKind = $kind;

            fn new(uuid: Uuid) -> Self {
                Self(uuid)
            }

            fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s.trim()).map(Self)
            }
        }

        impl From<Uuid> for $name {
            fn from(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_entity_id!(
    /// Identifier of a Universe (the tenant boundary).
    UniverseId,
    "universe",
    EntityKind::Universe
);
define_entity_id!(
    /// Identifier of a membership row.
    MembershipId,
    "membership",
    EntityKind::Membership
);
define_entity_id!(
    /// Identifier of a World inside a Universe.
    WorldId,
    "world",
    EntityKind::World
);
define_entity_id!(
    /// Identifier of a wiki Page inside a World.
    PageId,
    "page",
    EntityKind::Page
);
define_entity_id!(
    /// Identifier of an external user (the JWT subject).
    UserId,
    "user",
    EntityKind::User
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_id_roundtrips_through_string() -> Result<(), uuid::Error> {
        let id = PageId::now_v7();
        let parsed: PageId = id.to_string().parse()?;
        assert_eq!(parsed, id);
        Ok(())
    }

    #[test]
    fn test_typed_id_serializes_as_bare_uuid() -> Result<(), serde_json::Error> {
        let uuid = Uuid::now_v7();
        let id = WorldId::new(uuid);
        let json = serde_json::to_string(&id)?;
        assert_eq!(json, format!("\"{}\"", uuid));
        Ok(())
    }

    #[test]
    fn test_invalid_id_is_rejected() {
        assert!("not-a-uuid".parse::<UniverseId>().is_err());
    }

    #[test]
    fn test_v7_ids_sort_by_creation() {
        let first = UniverseId::now_v7();
        let second = UniverseId::now_v7();
        assert!(first <= second);
    }

    #[test]
    fn test_entity_names() {
        assert_eq!(UniverseId::ENTITY_NAME, "universe");
        assert_eq!(PageId::KIND, EntityKind::Page);
        assert_eq!(EntityKind::World.to_string(), "World");
    }
}
