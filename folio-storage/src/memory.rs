//! In-memory store.
//!
//! Used by the test suites and by the API when `FOLIO_STORE=memory`. All
//! tables sit behind one lock so multi-row writes are atomic.

use crate::{PageFilter, PageUpdate, WikiStore};
use async_trait::async_trait;
use chrono::Utc;
use folio_core::{
    EntityIdType, EntityKind, FolioError, FolioResult, Membership, MembershipId, Page, PageId,
    StorageError, Universe, UniverseId, UserId, World, WorldId,
};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
struct Tables {
    universes: HashMap<UniverseId, Universe>,
    memberships: HashMap<MembershipId, Membership>,
    worlds: HashMap<WorldId, World>,
    pages: HashMap<PageId, Page>,
}

impl Tables {
    fn has_member(&self, universe: UniverseId, user: UserId) -> bool {
        self.memberships
            .values()
            .any(|m| m.universe_id == universe && m.user_id == user)
    }
}

/// `RwLock`-guarded in-memory implementation of [`WikiStore`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> FolioResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| FolioError::Storage(StorageError::LockPoisoned))
    }

    fn write(&self) -> FolioResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| FolioError::Storage(StorageError::LockPoisoned))
    }

    /// Get count of stored pages.
    pub fn page_count(&self) -> FolioResult<usize> {
        Ok(self.read()?.pages.len())
    }
}

fn already_exists(entity: EntityKind, reason: impl Into<String>) -> FolioError {
    FolioError::Storage(StorageError::AlreadyExists {
        entity,
        reason: reason.into(),
    })
}

#[async_trait]
impl WikiStore for InMemoryStore {
    // === Universe Operations ===

    async fn universe_create(&self, universe: &Universe, owner: &Membership) -> FolioResult<()> {
        let mut tables = self.write()?;
        if tables.universes.contains_key(&universe.universe_id) {
            return Err(already_exists(EntityKind::Universe, "duplicate id"));
        }
        if owner.universe_id != universe.universe_id {
            return Err(FolioError::Storage(StorageError::Backend {
                reason: "owner membership belongs to a different universe".to_string(),
            }));
        }
        tables
            .universes
            .insert(universe.universe_id, universe.clone());
        tables.memberships.insert(owner.membership_id, owner.clone());
        Ok(())
    }

    async fn universe_get(&self, id: UniverseId) -> FolioResult<Option<Universe>> {
        Ok(self.read()?.universes.get(&id).cloned())
    }

    async fn universe_list_for_user(&self, user: UserId) -> FolioResult<Vec<Universe>> {
        let tables = self.read()?;
        let mut universes: Vec<Universe> = tables
            .memberships
            .values()
            .filter(|m| m.user_id == user)
            .filter_map(|m| tables.universes.get(&m.universe_id).cloned())
            .collect();
        universes.sort_by(|a, b| a.name.cmp(&b.name).then(a.universe_id.cmp(&b.universe_id)));
        Ok(universes)
    }

    // === Membership Operations ===

    async fn membership_add(&self, membership: &Membership) -> FolioResult<()> {
        let mut tables = self.write()?;
        if !tables.universes.contains_key(&membership.universe_id) {
            return Err(FolioError::not_found(
                EntityKind::Universe,
                membership.universe_id.as_uuid(),
            ));
        }
        if tables.has_member(membership.universe_id, membership.user_id) {
            return Err(already_exists(
                EntityKind::Membership,
                format!(
                    "user {} is already a member of universe {}",
                    membership.user_id, membership.universe_id
                ),
            ));
        }
        tables
            .memberships
            .insert(membership.membership_id, membership.clone());
        Ok(())
    }

    async fn membership_get(
        &self,
        universe: UniverseId,
        user: UserId,
    ) -> FolioResult<Option<Membership>> {
        Ok(self
            .read()?
            .memberships
            .values()
            .find(|m| m.universe_id == universe && m.user_id == user)
            .cloned())
    }

    async fn membership_list(&self, universe: UniverseId) -> FolioResult<Vec<Membership>> {
        let mut members: Vec<Membership> = self
            .read()?
            .memberships
            .values()
            .filter(|m| m.universe_id == universe)
            .cloned()
            .collect();
        members.sort_by_key(|m| (m.created_at, m.membership_id));
        Ok(members)
    }

    async fn memberships_for_user(&self, user: UserId) -> FolioResult<Vec<Membership>> {
        let mut members: Vec<Membership> = self
            .read()?
            .memberships
            .values()
            .filter(|m| m.user_id == user)
            .cloned()
            .collect();
        members.sort_by_key(|m| (m.created_at, m.membership_id));
        Ok(members)
    }

    // === World Operations ===

    async fn world_create(&self, world: &World) -> FolioResult<()> {
        let mut tables = self.write()?;
        if !tables.universes.contains_key(&world.universe_id) {
            return Err(FolioError::not_found(
                EntityKind::Universe,
                world.universe_id.as_uuid(),
            ));
        }
        if tables.worlds.contains_key(&world.world_id) {
            return Err(already_exists(EntityKind::World, "duplicate id"));
        }
        tables.worlds.insert(world.world_id, world.clone());
        Ok(())
    }

    async fn world_get(&self, id: WorldId) -> FolioResult<Option<World>> {
        Ok(self.read()?.worlds.get(&id).cloned())
    }

    async fn world_list(&self, universe: UniverseId) -> FolioResult<Vec<World>> {
        let mut worlds: Vec<World> = self
            .read()?
            .worlds
            .values()
            .filter(|w| w.universe_id == universe)
            .cloned()
            .collect();
        worlds.sort_by(|a, b| a.name.cmp(&b.name).then(a.world_id.cmp(&b.world_id)));
        Ok(worlds)
    }

    // === Page Operations ===

    async fn page_create(&self, page: &Page) -> FolioResult<()> {
        let mut tables = self.write()?;
        if !tables.worlds.contains_key(&page.world_id) {
            return Err(FolioError::not_found(EntityKind::World, page.world_id.as_uuid()));
        }
        if tables.pages.contains_key(&page.page_id) {
            return Err(already_exists(EntityKind::Page, "duplicate id"));
        }
        tables.pages.insert(page.page_id, page.clone());
        Ok(())
    }

    async fn page_get(&self, id: PageId) -> FolioResult<Option<Page>> {
        Ok(self.read()?.pages.get(&id).cloned())
    }

    async fn page_list(&self, world: WorldId, filter: &PageFilter) -> FolioResult<(Vec<Page>, u64)> {
        let tables = self.read()?;
        let mut pages: Vec<&Page> = tables
            .pages
            .values()
            .filter(|p| p.world_id == world && filter.matches(p))
            .collect();
        pages.sort_by(|a, b| a.title.cmp(&b.title).then(a.page_id.cmp(&b.page_id)));

        let total = pages.len() as u64;
        let window = pages
            .into_iter()
            .skip(filter.offset)
            .take(filter.limit)
            .cloned()
            .collect();
        Ok((window, total))
    }

    async fn page_update(&self, id: PageId, update: PageUpdate) -> FolioResult<Page> {
        let mut tables = self.write()?;
        let page = tables
            .pages
            .get_mut(&id)
            .ok_or_else(|| FolioError::not_found(EntityKind::Page, id.as_uuid()))?;

        if let Some(title) = update.title {
            page.title = title;
        }
        if let Some(content) = update.content {
            page.content = content;
        }
        if let Some(category) = update.category {
            page.category = category;
        }
        if let Some(is_public) = update.is_public {
            page.is_public = is_public;
        }
        page.updated_at = Utc::now();

        Ok(page.clone())
    }

    async fn page_delete(&self, id: PageId) -> FolioResult<()> {
        self.write()?
            .pages
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| FolioError::not_found(EntityKind::Page, id.as_uuid()))
    }

    async fn health_check(&self) -> FolioResult<bool> {
        drop(self.read()?);
        Ok(true)
    }
}
