//! Loading and permission helpers shared by the route handlers.
//!
//! Handlers load the target first (unknown id -> 404), then authorize the
//! caller against it (no membership or insufficient role -> 403). Private
//! pages are the exception: to callers who may not see them they read as
//! 404 so their existence is not revealed.

use folio_core::{Action, Owned, Page, PageId, ParentRef, Role, Universe, UniverseId, UserId, World, WorldId};
use folio_storage::{authorize, authorize_parent, WikiStore};

use crate::error::{ApiError, ApiResult};

pub async fn load_universe(store: &dyn WikiStore, id: UniverseId) -> ApiResult<Universe> {
    store
        .universe_get(id)
        .await?
        .ok_or_else(|| ApiError::universe_not_found(id))
}

pub async fn load_world(store: &dyn WikiStore, id: WorldId) -> ApiResult<World> {
    store
        .world_get(id)
        .await?
        .ok_or_else(|| ApiError::world_not_found(id))
}

pub async fn load_page(store: &dyn WikiStore, id: PageId) -> ApiResult<Page> {
    store
        .page_get(id)
        .await?
        .ok_or_else(|| ApiError::page_not_found(id))
}

/// Authorize `action` on a loaded entity, returning the caller's role.
pub async fn require<O: Owned + ?Sized>(
    store: &dyn WikiStore,
    user: UserId,
    object: &O,
    action: Action,
) -> ApiResult<Role> {
    Ok(authorize(store, user, object, action).await?)
}

/// Authorize `action` inside a universe or world given only its id.
pub async fn require_in(
    store: &dyn WikiStore,
    user: UserId,
    parent: ParentRef,
    action: Action,
) -> ApiResult<Role> {
    Ok(authorize_parent(store, user, parent, action).await?)
}

/// Authorize reading a page: membership is required, and private pages
/// are reported missing to roles without `ViewPrivatePages`.
pub async fn require_page_visible(
    store: &dyn WikiStore,
    user: UserId,
    page: &Page,
) -> ApiResult<Role> {
    let role = require(store, user, page, Action::View).await?;
    if !page.is_public && !role.allows(Action::ViewPrivatePages) {
        return Err(ApiError::page_not_found(page.page_id));
    }
    Ok(role)
}

/// Load a page the caller may edit. Hidden pages still read as 404.
pub async fn load_editable_page(
    store: &dyn WikiStore,
    user: UserId,
    id: PageId,
) -> ApiResult<Page> {
    let page = load_page(store, id).await?;
    let role = require_page_visible(store, user, &page).await?;
    if !role.allows(Action::EditPages) {
        return Err(ApiError::forbidden(format!(
            "Role '{}' may not {}",
            role,
            Action::EditPages
        )));
    }
    Ok(page)
}
