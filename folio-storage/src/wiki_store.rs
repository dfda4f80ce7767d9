//! Async storage trait for the wiki entities.
//!
//! Both the Postgres store and [`crate::InMemoryStore`] implement this
//! trait; the API holds it as `Arc<dyn WikiStore>`.

use crate::{PageFilter, PageUpdate};
use async_trait::async_trait;
use folio_core::{
    FolioResult, Membership, Page, PageId, Universe, UniverseId, UserId, World, WorldId,
};

/// Async storage trait for FOLIO entities.
///
/// Lookups return `Ok(None)` for missing rows; mutations of missing rows
/// return `StorageError::NotFound`.
#[async_trait]
pub trait WikiStore: Send + Sync {
    // ========================================================================
    // UNIVERSE OPERATIONS
    // ========================================================================

    /// Insert a universe together with its creator's owner membership.
    /// Either both rows are written or neither is.
    async fn universe_create(&self, universe: &Universe, owner: &Membership) -> FolioResult<()>;

    /// Get a universe by ID.
    async fn universe_get(&self, id: UniverseId) -> FolioResult<Option<Universe>>;

    /// Universes the user is a member of, ordered by name.
    async fn universe_list_for_user(&self, user: UserId) -> FolioResult<Vec<Universe>>;

    // ========================================================================
    // MEMBERSHIP OPERATIONS
    // ========================================================================

    /// Add a member. Fails with `AlreadyExists` if the user already belongs
    /// to the universe.
    async fn membership_add(&self, membership: &Membership) -> FolioResult<()>;

    /// The user's membership in a universe, if any.
    async fn membership_get(
        &self,
        universe: UniverseId,
        user: UserId,
    ) -> FolioResult<Option<Membership>>;

    /// All memberships of a universe, oldest first.
    async fn membership_list(&self, universe: UniverseId) -> FolioResult<Vec<Membership>>;

    /// All memberships held by a user.
    async fn memberships_for_user(&self, user: UserId) -> FolioResult<Vec<Membership>>;

    // ========================================================================
    // WORLD OPERATIONS
    // ========================================================================

    async fn world_create(&self, world: &World) -> FolioResult<()>;

    async fn world_get(&self, id: WorldId) -> FolioResult<Option<World>>;

    /// Worlds of a universe, ordered by name.
    async fn world_list(&self, universe: UniverseId) -> FolioResult<Vec<World>>;

    // ========================================================================
    // PAGE OPERATIONS
    // ========================================================================

    async fn page_create(&self, page: &Page) -> FolioResult<()>;

    async fn page_get(&self, id: PageId) -> FolioResult<Option<Page>>;

    /// Pages of a world matching `filter`, ordered by title then id, plus
    /// the total number of matches before pagination.
    async fn page_list(&self, world: WorldId, filter: &PageFilter) -> FolioResult<(Vec<Page>, u64)>;

    /// Apply a partial update and return the stored page.
    async fn page_update(&self, id: PageId, update: PageUpdate) -> FolioResult<Page>;

    async fn page_delete(&self, id: PageId) -> FolioResult<()>;

    // ========================================================================
    // HEALTH
    // ========================================================================

    /// Check that the backend is reachable.
    async fn health_check(&self) -> FolioResult<bool>;
}
