//! PostgreSQL storage backend
//!
//! `PgStore` implements [`WikiStore`] over a `deadpool-postgres` pool with
//! plain SQL. The schema in `sql/schema.sql` is embedded and applied with
//! [`PgStore::ensure_schema`] at startup.

use std::time::Duration;

use async_trait::async_trait;
use deadpool_postgres::{Config, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime};
use folio_core::{
    EntityIdType, EntityKind, FolioError, FolioResult, Membership, MembershipId, Page, PageId,
    StorageError, Universe, UniverseId, UserId, World, WorldId,
};
use folio_storage::{PageFilter, PageUpdate, WikiStore};
use tokio_postgres::error::SqlState;
use tokio_postgres::types::ToSql;
use tokio_postgres::{NoTls, Row};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};

/// Embedded schema, applied idempotently.
pub const SCHEMA_SQL: &str = include_str!("../sql/schema.sql");

const UNIVERSE_COLUMNS: &str = "universe_id, name, description, created_by, created_at, updated_at";
const MEMBERSHIP_COLUMNS: &str = "membership_id, universe_id, user_id, role, created_at";
const WORLD_COLUMNS: &str =
    "world_id, universe_id, name, description, ruleset, primary_gm, created_at, updated_at";
const PAGE_COLUMNS: &str =
    "page_id, world_id, title, content, category, author_id, is_public, created_at, updated_at";

// ============================================================================
// CONFIGURATION
// ============================================================================

/// Database connection configuration.
#[derive(Clone)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: String,
    /// Maximum pool size
    pub max_size: usize,
    /// How long to wait for a pooled connection
    pub timeout: Duration,
}

impl std::fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DbConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("dbname", &self.dbname)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("max_size", &self.max_size)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            dbname: "folio".to_string(),
            user: "postgres".to_string(),
            password: String::new(),
            max_size: 16,
            timeout: Duration::from_secs(30),
        }
    }
}

impl DbConfig {
    /// Read `FOLIO_DB_HOST`, `FOLIO_DB_PORT`, `FOLIO_DB_NAME`, `FOLIO_DB_USER`,
    /// `FOLIO_DB_PASSWORD`, `FOLIO_DB_POOL_SIZE` and `FOLIO_DB_TIMEOUT` (seconds).
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("FOLIO_DB_HOST").unwrap_or(defaults.host),
            port: std::env::var("FOLIO_DB_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.port),
            dbname: std::env::var("FOLIO_DB_NAME").unwrap_or(defaults.dbname),
            user: std::env::var("FOLIO_DB_USER").unwrap_or(defaults.user),
            password: std::env::var("FOLIO_DB_PASSWORD").unwrap_or_default(),
            max_size: std::env::var("FOLIO_DB_POOL_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_size),
            timeout: std::env::var("FOLIO_DB_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        }
    }

    /// Create a connection pool from this configuration.
    pub fn create_pool(&self) -> ApiResult<Pool> {
        let mut cfg = Config::new();
        cfg.host = Some(self.host.clone());
        cfg.port = Some(self.port);
        cfg.dbname = Some(self.dbname.clone());
        cfg.user = Some(self.user.clone());
        cfg.password = Some(self.password.clone());
        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });

        let mut pool_cfg = PoolConfig::new(self.max_size);
        pool_cfg.timeouts.wait = Some(self.timeout);
        pool_cfg.timeouts.create = Some(self.timeout);
        cfg.pool = Some(pool_cfg);

        cfg.create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| ApiError::database_error(format!("Failed to create pool: {}", e)))
    }
}

// ============================================================================
// ERROR MAPPING
// ============================================================================

fn pool_error(err: deadpool_postgres::PoolError) -> FolioError {
    tracing::error!(error = %err, "Failed to get database connection");
    StorageError::Unavailable {
        reason: err.to_string(),
    }
    .into()
}

fn backend_error(err: tokio_postgres::Error) -> FolioError {
    tracing::error!(error = %err, "Database query failed");
    StorageError::Backend {
        reason: err.to_string(),
    }
    .into()
}

/// Map an insert failure: unique violations become `AlreadyExists`, foreign
/// key violations become `NotFound` on the parent.
fn write_error(err: tokio_postgres::Error, entity: EntityKind, parent: (EntityKind, Uuid)) -> FolioError {
    match err.code() {
        Some(code) if *code == SqlState::UNIQUE_VIOLATION => StorageError::AlreadyExists {
            entity,
            reason: err
                .as_db_error()
                .and_then(|db| db.constraint().map(str::to_string))
                .unwrap_or_else(|| "unique constraint violated".to_string()),
        }
        .into(),
        Some(code) if *code == SqlState::FOREIGN_KEY_VIOLATION => {
            FolioError::not_found(parent.0, parent.1)
        }
        _ => backend_error(err),
    }
}

fn column_error(err: tokio_postgres::Error) -> FolioError {
    StorageError::Backend {
        reason: format!("Unexpected row shape: {}", err),
    }
    .into()
}

// ============================================================================
// ROW DECODING
// ============================================================================

fn universe_from_row(row: &Row) -> FolioResult<Universe> {
    Ok(Universe {
        universe_id: UniverseId::new(row.try_get("universe_id").map_err(column_error)?),
        name: row.try_get("name").map_err(column_error)?,
        description: row.try_get("description").map_err(column_error)?,
        created_by: UserId::new(row.try_get("created_by").map_err(column_error)?),
        created_at: row.try_get("created_at").map_err(column_error)?,
        updated_at: row.try_get("updated_at").map_err(column_error)?,
    })
}

fn membership_from_row(row: &Row) -> FolioResult<Membership> {
    let role: String = row.try_get("role").map_err(column_error)?;
    Ok(Membership {
        membership_id: MembershipId::new(row.try_get("membership_id").map_err(column_error)?),
        universe_id: UniverseId::new(row.try_get("universe_id").map_err(column_error)?),
        user_id: UserId::new(row.try_get("user_id").map_err(column_error)?),
        role: role.parse().map_err(|_| StorageError::Backend {
            reason: format!("Unknown role '{}' in folio_membership", role),
        })?,
        created_at: row.try_get("created_at").map_err(column_error)?,
    })
}

fn world_from_row(row: &Row) -> FolioResult<World> {
    let primary_gm: Option<Uuid> = row.try_get("primary_gm").map_err(column_error)?;
    Ok(World {
        world_id: WorldId::new(row.try_get("world_id").map_err(column_error)?),
        universe_id: UniverseId::new(row.try_get("universe_id").map_err(column_error)?),
        name: row.try_get("name").map_err(column_error)?,
        description: row.try_get("description").map_err(column_error)?,
        ruleset: row.try_get("ruleset").map_err(column_error)?,
        primary_gm: primary_gm.map(UserId::new),
        created_at: row.try_get("created_at").map_err(column_error)?,
        updated_at: row.try_get("updated_at").map_err(column_error)?,
    })
}

fn page_from_row(row: &Row) -> FolioResult<Page> {
    Ok(Page {
        page_id: PageId::new(row.try_get("page_id").map_err(column_error)?),
        world_id: WorldId::new(row.try_get("world_id").map_err(column_error)?),
        title: row.try_get("title").map_err(column_error)?,
        content: row.try_get("content").map_err(column_error)?,
        category: row.try_get("category").map_err(column_error)?,
        author_id: UserId::new(row.try_get("author_id").map_err(column_error)?),
        is_public: row.try_get("is_public").map_err(column_error)?,
        created_at: row.try_get("created_at").map_err(column_error)?,
        updated_at: row.try_get("updated_at").map_err(column_error)?,
    })
}

/// Escape `LIKE` wildcards so user input matches literally.
/// BIGINT for LIMIT/OFFSET. Values past `i64::MAX` saturate so an
/// oversized offset yields an empty page instead of a query error.
fn sql_bigint(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

// ============================================================================
// STORE
// ============================================================================

/// PostgreSQL-backed [`WikiStore`].
#[derive(Clone)]
pub struct PgStore {
    pool: Pool,
}

impl PgStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub fn from_config(config: &DbConfig) -> ApiResult<Self> {
        Ok(Self::new(config.create_pool()?))
    }

    pub fn pool_size(&self) -> usize {
        self.pool.status().size
    }

    /// Create tables and indexes that do not exist yet.
    pub async fn ensure_schema(&self) -> FolioResult<()> {
        let client = self.pool.get().await.map_err(pool_error)?;
        client.batch_execute(SCHEMA_SQL).await.map_err(backend_error)?;
        tracing::info!("Database schema ensured");
        Ok(())
    }

    async fn client(&self) -> FolioResult<deadpool_postgres::Object> {
        self.pool.get().await.map_err(pool_error)
    }
}

#[async_trait]
impl WikiStore for PgStore {
    // === Universe Operations ===

    async fn universe_create(&self, universe: &Universe, owner: &Membership) -> FolioResult<()> {
        let mut client = self.client().await?;
        let tx = client.transaction().await.map_err(backend_error)?;
        let parent = (EntityKind::Universe, universe.universe_id.as_uuid());

        tx.execute(
            "INSERT INTO folio_universe (universe_id, name, description, created_by, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
            &[
                &universe.universe_id.as_uuid(),
                &universe.name,
                &universe.description,
                &universe.created_by.as_uuid(),
                &universe.created_at,
                &universe.updated_at,
            ],
        )
        .await
        .map_err(|e| write_error(e, EntityKind::Universe, parent))?;

        tx.execute(
            "INSERT INTO folio_membership (membership_id, universe_id, user_id, role, created_at) \
             VALUES ($1, $2, $3, $4, $5)",
            &[
                &owner.membership_id.as_uuid(),
                &owner.universe_id.as_uuid(),
                &owner.user_id.as_uuid(),
                &owner.role.as_str(),
                &owner.created_at,
            ],
        )
        .await
        .map_err(|e| write_error(e, EntityKind::Membership, parent))?;

        tx.commit().await.map_err(backend_error)
    }

    async fn universe_get(&self, id: UniverseId) -> FolioResult<Option<Universe>> {
        let client = self.client().await?;
        let row = client
            .query_opt(
                &format!("SELECT {} FROM folio_universe WHERE universe_id = $1", UNIVERSE_COLUMNS),
                &[&id.as_uuid()],
            )
            .await
            .map_err(backend_error)?;
        row.as_ref().map(universe_from_row).transpose()
    }

    async fn universe_list_for_user(&self, user: UserId) -> FolioResult<Vec<Universe>> {
        let client = self.client().await?;
        let rows = client
            .query(
                "SELECT u.universe_id, u.name, u.description, u.created_by, u.created_at, u.updated_at \
                 FROM folio_universe u \
                 JOIN folio_membership m ON m.universe_id = u.universe_id \
                 WHERE m.user_id = $1 \
                 ORDER BY u.name COLLATE \"C\", u.universe_id",
                &[&user.as_uuid()],
            )
            .await
            .map_err(backend_error)?;
        rows.iter().map(universe_from_row).collect()
    }

    // === Membership Operations ===

    async fn membership_add(&self, membership: &Membership) -> FolioResult<()> {
        let client = self.client().await?;
        client
            .execute(
                "INSERT INTO folio_membership (membership_id, universe_id, user_id, role, created_at) \
                 VALUES ($1, $2, $3, $4, $5)",
                &[
                    &membership.membership_id.as_uuid(),
                    &membership.universe_id.as_uuid(),
                    &membership.user_id.as_uuid(),
                    &membership.role.as_str(),
                    &membership.created_at,
                ],
            )
            .await
            .map_err(|e| {
                write_error(
                    e,
                    EntityKind::Membership,
                    (EntityKind::Universe, membership.universe_id.as_uuid()),
                )
            })?;
        Ok(())
    }

    async fn membership_get(
        &self,
        universe: UniverseId,
        user: UserId,
    ) -> FolioResult<Option<Membership>> {
        let client = self.client().await?;
        let row = client
            .query_opt(
                &format!(
                    "SELECT {} FROM folio_membership WHERE universe_id = $1 AND user_id = $2",
                    MEMBERSHIP_COLUMNS
                ),
                &[&universe.as_uuid(), &user.as_uuid()],
            )
            .await
            .map_err(backend_error)?;
        row.as_ref().map(membership_from_row).transpose()
    }

    async fn membership_list(&self, universe: UniverseId) -> FolioResult<Vec<Membership>> {
        let client = self.client().await?;
        let rows = client
            .query(
                &format!(
                    "SELECT {} FROM folio_membership WHERE universe_id = $1 \
                     ORDER BY created_at, membership_id",
                    MEMBERSHIP_COLUMNS
                ),
                &[&universe.as_uuid()],
            )
            .await
            .map_err(backend_error)?;
        rows.iter().map(membership_from_row).collect()
    }

    async fn memberships_for_user(&self, user: UserId) -> FolioResult<Vec<Membership>> {
        let client = self.client().await?;
        let rows = client
            .query(
                &format!(
                    "SELECT {} FROM folio_membership WHERE user_id = $1 \
                     ORDER BY created_at, membership_id",
                    MEMBERSHIP_COLUMNS
                ),
                &[&user.as_uuid()],
            )
            .await
            .map_err(backend_error)?;
        rows.iter().map(membership_from_row).collect()
    }

    // === World Operations ===

    async fn world_create(&self, world: &World) -> FolioResult<()> {
        let client = self.client().await?;
        let primary_gm = world.primary_gm.map(|id| id.as_uuid());
        client
            .execute(
                "INSERT INTO folio_world \
                 (world_id, universe_id, name, description, ruleset, primary_gm, created_at, updated_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
                &[
                    &world.world_id.as_uuid(),
                    &world.universe_id.as_uuid(),
                    &world.name,
                    &world.description,
                    &world.ruleset,
                    &primary_gm,
                    &world.created_at,
                    &world.updated_at,
                ],
            )
            .await
            .map_err(|e| {
                write_error(
                    e,
                    EntityKind::World,
                    (EntityKind::Universe, world.universe_id.as_uuid()),
                )
            })?;
        Ok(())
    }

    async fn world_get(&self, id: WorldId) -> FolioResult<Option<World>> {
        let client = self.client().await?;
        let row = client
            .query_opt(
                &format!("SELECT {} FROM folio_world WHERE world_id = $1", WORLD_COLUMNS),
                &[&id.as_uuid()],
            )
            .await
            .map_err(backend_error)?;
        row.as_ref().map(world_from_row).transpose()
    }

    async fn world_list(&self, universe: UniverseId) -> FolioResult<Vec<World>> {
        let client = self.client().await?;
        let rows = client
            .query(
                &format!(
                    "SELECT {} FROM folio_world WHERE universe_id = $1 \
                     ORDER BY name COLLATE \"C\", world_id",
                    WORLD_COLUMNS
                ),
                &[&universe.as_uuid()],
            )
            .await
            .map_err(backend_error)?;
        rows.iter().map(world_from_row).collect()
    }

    // === Page Operations ===

    async fn page_create(&self, page: &Page) -> FolioResult<()> {
        let client = self.client().await?;
        client
            .execute(
                "INSERT INTO folio_page \
                 (page_id, world_id, title, content, category, author_id, is_public, created_at, updated_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
                &[
                    &page.page_id.as_uuid(),
                    &page.world_id.as_uuid(),
                    &page.title,
                    &page.content,
                    &page.category,
                    &page.author_id.as_uuid(),
                    &page.is_public,
                    &page.created_at,
                    &page.updated_at,
                ],
            )
            .await
            .map_err(|e| {
                write_error(
                    e,
                    EntityKind::Page,
                    (EntityKind::World, page.world_id.as_uuid()),
                )
            })?;
        Ok(())
    }

    async fn page_get(&self, id: PageId) -> FolioResult<Option<Page>> {
        let client = self.client().await?;
        let row = client
            .query_opt(
                &format!("SELECT {} FROM folio_page WHERE page_id = $1", PAGE_COLUMNS),
                &[&id.as_uuid()],
            )
            .await
            .map_err(backend_error)?;
        row.as_ref().map(page_from_row).transpose()
    }

    async fn page_list(&self, world: WorldId, filter: &PageFilter) -> FolioResult<(Vec<Page>, u64)> {
        let world_uuid = world.as_uuid();
        let pattern = filter
            .title_contains
            .as_ref()
            .map(|needle| format!("%{}%", escape_like(needle)));
        let limit = sql_bigint(filter.limit);
        let offset = sql_bigint(filter.offset);

        let mut clauses = vec!["world_id = $1".to_string()];
        let mut params: Vec<&(dyn ToSql + Sync)> = vec![&world_uuid];
        if !filter.include_private {
            clauses.push("is_public".to_string());
        }
        if let Some(category) = &filter.category {
            params.push(category);
            clauses.push(format!("category = ${}", params.len()));
        }
        if let Some(pattern) = &pattern {
            params.push(pattern);
            clauses.push(format!("title ILIKE ${}", params.len()));
        }
        let where_clause = clauses.join(" AND ");

        let client = self.client().await?;
        let total: i64 = client
            .query_one(
                &format!("SELECT COUNT(*) FROM folio_page WHERE {}", where_clause),
                &params,
            )
            .await
            .map_err(backend_error)?
            .try_get(0)
            .map_err(column_error)?;

        let mut window_params = params.clone();
        window_params.push(&limit);
        window_params.push(&offset);
        let rows = client
            .query(
                &format!(
                    "SELECT {} FROM folio_page WHERE {} \
                     ORDER BY title COLLATE \"C\", page_id LIMIT ${} OFFSET ${}",
                    PAGE_COLUMNS,
                    where_clause,
                    window_params.len() - 1,
                    window_params.len()
                ),
                &window_params,
            )
            .await
            .map_err(backend_error)?;

        let pages = rows.iter().map(page_from_row).collect::<FolioResult<Vec<_>>>()?;
        Ok((pages, total.max(0) as u64))
    }

    async fn page_update(&self, id: PageId, update: PageUpdate) -> FolioResult<Page> {
        let client = self.client().await?;
        let row = client
            .query_opt(
                &format!(
                    "UPDATE folio_page SET \
                     title = COALESCE($2, title), \
                     content = COALESCE($3, content), \
                     category = COALESCE($4, category), \
                     is_public = COALESCE($5, is_public), \
                     updated_at = now() \
                     WHERE page_id = $1 RETURNING {}",
                    PAGE_COLUMNS
                ),
                &[
                    &id.as_uuid(),
                    &update.title,
                    &update.content,
                    &update.category,
                    &update.is_public,
                ],
            )
            .await
            .map_err(backend_error)?;

        match row {
            Some(row) => page_from_row(&row),
            None => Err(FolioError::not_found(EntityKind::Page, id.as_uuid())),
        }
    }

    async fn page_delete(&self, id: PageId) -> FolioResult<()> {
        let client = self.client().await?;
        let deleted = client
            .execute("DELETE FROM folio_page WHERE page_id = $1", &[&id.as_uuid()])
            .await
            .map_err(backend_error)?;
        if deleted == 0 {
            return Err(FolioError::not_found(EntityKind::Page, id.as_uuid()));
        }
        Ok(())
    }

    async fn health_check(&self) -> FolioResult<bool> {
        let client = self.client().await?;
        client.simple_query("SELECT 1").await.map_err(backend_error)?;
        Ok(true)
    }
}
