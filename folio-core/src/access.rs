//! Roles, actions and the tenant ownership walk.
//!
//! Every permission decision reduces to: find the universe that owns the
//! object, find the caller's membership in it, and check the membership's
//! role against [`Role::allows`]. This module holds the pure parts of that
//! decision; the lookups are supplied by the storage layer.

use crate::{
    EntityIdType, FolioError, FolioResult, Membership, Page, Universe, UniverseId,
    ValidationError, World, WorldId,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::str::FromStr;

/// Role of a user inside one universe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Gm,
    Viewer,
}

impl Role {
    /// All roles, in descending order of privilege.
    pub const ALL: [Role; 3] = [Role::Owner, Role::Gm, Role::Viewer];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Gm => "gm",
            Role::Viewer => "viewer",
        }
    }

    /// Capability matrix.
    pub fn allows(&self, action: Action) -> bool {
        match action {
            Action::View => true,
            Action::ViewPrivatePages | Action::CreateWorld | Action::EditPages => {
                matches!(self, Role::Owner | Role::Gm)
            }
            Action::Invite => matches!(self, Role::Owner),
        }
    }

    /// Whether this role may be named as a world's primary GM.
    pub fn can_run_games(&self) -> bool {
        matches!(self, Role::Owner | Role::Gm)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "owner" => Ok(Role::Owner),
            "gm" => Ok(Role::Gm),
            "viewer" => Ok(Role::Viewer),
            other => Err(ValidationError::InvalidValue {
                field: "role".to_string(),
                reason: format!("unknown role '{}', expected owner, gm or viewer", other),
            }),
        }
    }
}

/// Something a member may try to do inside a universe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// Read the universe, its members, worlds and public pages.
    View,
    ViewPrivatePages,
    Invite,
    CreateWorld,
    /// Create, edit, delete or import pages.
    EditPages,
}

impl Action {
    pub const ALL: [Action; 5] = [
        Action::View,
        Action::ViewPrivatePages,
        Action::Invite,
        Action::CreateWorld,
        Action::EditPages,
    ];
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::View => "view",
            Action::ViewPrivatePages => "view private pages",
            Action::Invite => "invite members",
            Action::CreateWorld => "create worlds",
            Action::EditPages => "edit pages",
        };
        f.write_str(name)
    }
}

/// Direct parent of a tenant-scoped object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParentRef {
    Universe(UniverseId),
    World(WorldId),
}

/// Implemented by every entity that lives inside a universe.
pub trait Owned {
    fn parent(&self) -> ParentRef;
}

impl Owned for Universe {
    fn parent(&self) -> ParentRef {
        ParentRef::Universe(self.universe_id)
    }
}

impl Owned for Membership {
    fn parent(&self) -> ParentRef {
        ParentRef::Universe(self.universe_id)
    }
}

impl Owned for World {
    fn parent(&self) -> ParentRef {
        ParentRef::Universe(self.universe_id)
    }
}

impl Owned for Page {
    fn parent(&self) -> ParentRef {
        ParentRef::World(self.world_id)
    }
}

/// Resolve the universe that owns `parent`.
///
/// A universe parent resolves to itself. A world parent is looked up with
/// `world_universe`, which returns the world's universe or `None` when the
/// world does not exist. Ownership chains are at most one hop long.
pub async fn resolve_universe<F, Fut>(parent: ParentRef, world_universe: F) -> FolioResult<UniverseId>
where
    F: FnOnce(WorldId) -> Fut,
    Fut: Future<Output = FolioResult<Option<UniverseId>>>,
{
    match parent {
        ParentRef::Universe(id) => Ok(id),
        ParentRef::World(world_id) => world_universe(world_id)
            .await?
            .ok_or_else(|| FolioError::not_found(WorldId::KIND, world_id.as_uuid())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{StorageError, UserId};
    use proptest::prelude::*;

    #[test]
    fn test_role_matrix() {
        assert!(Role::Owner.allows(Action::Invite));
        assert!(!Role::Gm.allows(Action::Invite));
        assert!(!Role::Viewer.allows(Action::Invite));

        assert!(Role::Gm.allows(Action::CreateWorld));
        assert!(Role::Gm.allows(Action::EditPages));
        assert!(Role::Gm.allows(Action::ViewPrivatePages));

        assert!(Role::Viewer.allows(Action::View));
        assert!(!Role::Viewer.allows(Action::EditPages));
        assert!(!Role::Viewer.allows(Action::ViewPrivatePages));
        assert!(!Role::Viewer.allows(Action::CreateWorld));
    }

    #[test]
    fn test_role_parse_and_display() -> Result<(), ValidationError> {
        assert_eq!("owner".parse::<Role>()?, Role::Owner);
        assert_eq!(" GM ".parse::<Role>()?, Role::Gm);
        assert_eq!(Role::Viewer.to_string(), "viewer");
        assert!("admin".parse::<Role>().is_err());
        Ok(())
    }

    #[test]
    fn test_role_serializes_lowercase() -> Result<(), serde_json::Error> {
        assert_eq!(serde_json::to_string(&Role::Gm)?, "\"gm\"");
        let role: Role = serde_json::from_str("\"owner\"")?;
        assert_eq!(role, Role::Owner);
        Ok(())
    }

    #[test]
    fn test_page_parent_is_world() -> FolioResult<()> {
        let world_id = WorldId::now_v7();
        let page = Page::new(world_id, "Harbor", None, None, UserId::now_v7(), true)?;
        assert_eq!(page.parent(), ParentRef::World(world_id));
        Ok(())
    }

    #[tokio::test]
    async fn test_resolve_universe_direct() -> FolioResult<()> {
        let universe_id = UniverseId::now_v7();
        // A lookup that would resolve elsewhere proves it is never consulted.
        let resolved = resolve_universe(ParentRef::Universe(universe_id), |_| async {
            Ok(Some(UniverseId::nil()))
        })
        .await?;
        assert_eq!(resolved, universe_id);
        Ok(())
    }

    #[tokio::test]
    async fn test_resolve_universe_through_world() -> FolioResult<()> {
        let universe_id = UniverseId::now_v7();
        let world_id = WorldId::now_v7();
        let resolved = resolve_universe(ParentRef::World(world_id), |id| async move {
            assert_eq!(id, world_id);
            Ok(Some(universe_id))
        })
        .await?;
        assert_eq!(resolved, universe_id);
        Ok(())
    }

    #[tokio::test]
    async fn test_resolve_universe_missing_world() {
        let result =
            resolve_universe(ParentRef::World(WorldId::now_v7()), |_| async { Ok(None) }).await;
        assert!(matches!(
            result,
            Err(FolioError::Storage(StorageError::NotFound { .. }))
        ));
    }

    fn arb_role() -> impl Strategy<Value = Role> {
        prop::sample::select(Role::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn prop_every_member_can_view(role in arb_role()) {
            prop_assert!(role.allows(Action::View));
        }

        #[test]
        fn prop_invite_implies_every_other_action(role in arb_role()) {
            if role.allows(Action::Invite) {
                for action in Action::ALL {
                    prop_assert!(role.allows(action));
                }
            }
        }

        #[test]
        fn prop_editors_can_see_private_pages(role in arb_role()) {
            prop_assert_eq!(
                role.allows(Action::EditPages),
                role.allows(Action::ViewPrivatePages)
            );
        }
    }
}
