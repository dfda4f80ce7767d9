//! Membership-based permission check.

use crate::WikiStore;
use folio_core::{
    resolve_universe, AccessError, Action, EntityIdType, FolioResult, Owned, ParentRef, Role,
    UserId,
};

/// Decide whether `user` may perform `action` on `object`.
///
/// Returns the caller's role in the owning universe on success.
pub async fn authorize<S, O>(store: &S, user: UserId, object: &O, action: Action) -> FolioResult<Role>
where
    S: WikiStore + ?Sized,
    O: Owned + ?Sized,
{
    authorize_parent(store, user, object.parent(), action).await
}

/// Same as [`authorize`], starting from a parent reference instead of a
/// loaded entity. Used when creating children of a universe or world.
pub async fn authorize_parent<S>(
    store: &S,
    user: UserId,
    parent: ParentRef,
    action: Action,
) -> FolioResult<Role>
where
    S: WikiStore + ?Sized,
{
    let universe_id = resolve_universe(parent, |world_id| async move {
        Ok(store.world_get(world_id).await?.map(|w| w.universe_id))
    })
    .await?;

    let membership = store
        .membership_get(universe_id, user)
        .await?
        .ok_or(AccessError::NotAMember {
            user_id: user.as_uuid(),
            universe_id: universe_id.as_uuid(),
        })?;

    if !membership.role.allows(action) {
        return Err(AccessError::Denied {
            role: membership.role.to_string(),
            action: action.to_string(),
            universe_id: universe_id.as_uuid(),
        }
        .into());
    }

    Ok(membership.role)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryStore;
    use folio_core::{FolioError, Membership, Page, StorageError, Universe, World, WorldId};

    struct Fixture {
        store: InMemoryStore,
        owner: UserId,
        gm: UserId,
        viewer: UserId,
        world: World,
        page: Page,
    }

    async fn fixture() -> FolioResult<Fixture> {
        let store = InMemoryStore::new();
        let owner = UserId::now_v7();
        let gm = UserId::now_v7();
        let viewer = UserId::now_v7();

        let universe = Universe::new("Eberron", None, owner)?;
        store
            .universe_create(&universe, &Membership::new(universe.universe_id, owner, Role::Owner))
            .await?;
        store
            .membership_add(&Membership::new(universe.universe_id, gm, Role::Gm))
            .await?;
        store
            .membership_add(&Membership::new(universe.universe_id, viewer, Role::Viewer))
            .await?;

        let world = World::new(universe.universe_id, "Khorvaire", None, "D&D 5e", Some(gm))?;
        store.world_create(&world).await?;
        let page = Page::new(world.world_id, "Sharn", None, None, gm, false)?;
        store.page_create(&page).await?;

        Ok(Fixture {
            store,
            owner,
            gm,
            viewer,
            world,
            page,
        })
    }

    #[tokio::test]
    async fn test_page_resolves_through_world() -> FolioResult<()> {
        let f = fixture().await?;
        assert_eq!(authorize(&f.store, f.gm, &f.page, Action::EditPages).await?, Role::Gm);
        assert_eq!(authorize(&f.store, f.owner, &f.page, Action::View).await?, Role::Owner);
        Ok(())
    }

    #[tokio::test]
    async fn test_viewer_denied_edit() -> FolioResult<()> {
        let f = fixture().await?;
        let result = authorize(&f.store, f.viewer, &f.page, Action::EditPages).await;
        assert!(matches!(
            result,
            Err(FolioError::Access(AccessError::Denied { .. }))
        ));
        assert_eq!(authorize(&f.store, f.viewer, &f.world, Action::View).await?, Role::Viewer);
        Ok(())
    }

    #[tokio::test]
    async fn test_non_member_rejected() -> FolioResult<()> {
        let f = fixture().await?;
        let stranger = UserId::now_v7();
        let result = authorize(&f.store, stranger, &f.world, Action::View).await;
        assert!(matches!(
            result,
            Err(FolioError::Access(AccessError::NotAMember { .. }))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_world_is_not_found() -> FolioResult<()> {
        let f = fixture().await?;
        let result = authorize_parent(
            &f.store,
            f.owner,
            ParentRef::World(WorldId::now_v7()),
            Action::View,
        )
        .await;
        assert!(matches!(
            result,
            Err(FolioError::Storage(StorageError::NotFound { .. }))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_works_through_trait_object() -> FolioResult<()> {
        let f = fixture().await?;
        let store: &dyn WikiStore = &f.store;
        assert_eq!(authorize(store, f.gm, &f.world, Action::CreateWorld).await?, Role::Gm);
        Ok(())
    }
}
